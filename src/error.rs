//! Error taxonomy for the request pipeline.
//!
//! # Categories
//! - Configuration errors live in `config::loader::ConfigError` and fail at build time
//! - Protocol violations (`NextCalledMultipleTimes`) surface as a rejected continuation
//! - Handler failures (`Http`, `Handler`, `Panicked`) propagate unmodified to the dispatcher
//! - `Opaque` is a failure with no diagnostic value; the error reporter refuses it

use std::any::Any;
use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed error type accepted from user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used throughout the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while running a request through the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler invoked its continuation a second time.
    #[error("next() called multiple times")]
    NextCalledMultipleTimes,

    /// A handler-authored HTTP failure (see `Context::throw`).
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A response was already written for this request.
    #[error("response headers already sent")]
    HeadersSent,

    /// The outbound connection went away before the response was written.
    #[error("connection closed before the response was written")]
    ConnectionClosed,

    /// Structured body could not be encoded.
    #[error("failed to encode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O failure inside a handler.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A handler panicked with a message.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// A handler panicked with a payload that carries no message.
    #[error("handler failed with a non-error value")]
    Opaque,

    /// Any other failure returned by user code.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Wrap an arbitrary error returned by a handler.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Handler(err.into())
    }

    /// Convert a caught panic payload into a pipeline failure.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            return Error::Panicked((*msg).to_string());
        }
        match payload.downcast::<String>() {
            Ok(msg) => Error::Panicked(*msg),
            Err(_) => Error::Opaque,
        }
    }

    /// HTTP status carried by this failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Whether the failure message is safe to show to the client.
    pub fn expose(&self) -> bool {
        match self {
            Error::Http(e) => e.expose(),
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NextCalledMultipleTimes => "next_called_multiple_times",
            Error::Http(_) => "http",
            Error::HeadersSent => "headers_sent",
            Error::ConnectionClosed => "connection_closed",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
            Error::Panicked(_) => "panicked",
            Error::Opaque => "opaque",
            Error::Handler(_) => "handler",
        }
    }

    /// Render the error followed by its `source()` chain.
    pub fn trace(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n    caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

/// An HTTP failure raised deliberately by a handler.
///
/// `expose` marks the message as user-facing; it defaults to true for 4xx.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    expose: bool,
    source: Option<BoxError>,
}

impl HttpError {
    /// Create a failure with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            expose: status.is_client_error(),
            source: None,
        }
    }

    /// Create a failure using the status' canonical reason as the message.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Unknown Status"))
    }

    /// Override the `expose` flag.
    pub fn with_expose(mut self, expose: bool) -> Self {
        self.expose = expose;
        self
    }

    /// Attach an underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expose(&self) -> bool {
        self.expose
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Raised by the error reporter when handed a value with no error semantics.
#[derive(Debug, Error)]
#[error("TypeError: {0}")]
pub struct NotAnError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_conversion() {
        let err = Error::from_panic(Box::new("boom"));
        assert!(matches!(err, Error::Panicked(ref m) if m == "boom"));

        let err = Error::from_panic(Box::new(String::from("formatted boom")));
        assert!(matches!(err, Error::Panicked(ref m) if m == "formatted boom"));

        let err = Error::from_panic(Box::new(42u32));
        assert!(matches!(err, Error::Opaque));
    }

    #[test]
    fn test_http_error_expose_defaults() {
        let err = HttpError::new(StatusCode::BAD_REQUEST, "bad input");
        assert!(err.expose());

        let err = HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "db down");
        assert!(!err.expose());

        let err = HttpError::from_status(StatusCode::INTERNAL_SERVER_ERROR).with_expose(true);
        assert!(err.expose());
        assert_eq!(err.message(), "Internal Server Error");
    }

    #[test]
    fn test_error_display() {
        let err = Error::from(HttpError::new(StatusCode::NOT_FOUND, "no such user"));
        assert_eq!(err.to_string(), "404 no such user");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        assert_eq!(
            Error::NextCalledMultipleTimes.to_string(),
            "next() called multiple times"
        );
    }

    #[test]
    fn test_trace_includes_sources() {
        let io = std::io::Error::other("disk full");
        let err = Error::from(
            HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "write failed").with_source(io),
        );
        let trace = err.trace();
        assert!(trace.starts_with("500 write failed"));
        assert!(trace.contains("caused by: disk full"));
    }
}
