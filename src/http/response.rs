//! Outbound response state and the single-shot sink it is written to.
//!
//! # Responsibilities
//! - Hold status, message, headers and body while handlers run
//! - Apply Koa-style assignment rules (implicit 200/204, inferred content type)
//! - Write exactly one `http::Response` to the serving layer
//!
//! # Design Decisions
//! - Status is a raw `u16` so a malformed value reaches the finalizer intact
//! - The sink is a oneshot sender; "writable" means the receiver is still alive

use std::fmt;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::http::body::Body;

/// Wire response handed to the serving layer.
pub type WireResponse = axum::http::Response<axum::body::Body>;

/// Callback run against the response state right before it is written.
pub type SendHook = Box<dyn FnOnce(&mut Response) + Send>;

#[derive(Default)]
struct SendHooks(Vec<SendHook>);

impl fmt::Debug for SendHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SendHooks({})", self.0.len())
    }
}

/// Mutable response state owned by one context.
#[derive(Debug)]
pub struct Response {
    pub(crate) status: u16,
    explicit_status: bool,
    pub(crate) message: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
    pub(crate) explicit_null_body: bool,
    hooks: SendHooks,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::NOT_FOUND.as_u16(),
            explicit_status: false,
            message: None,
            headers: HeaderMap::new(),
            body: Body::Empty,
            explicit_null_body: false,
            hooks: SendHooks::default(),
        }
    }
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the status as a handler decision.
    ///
    /// Statuses that forbid a body (204, 205, 304) clear it.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
        self.explicit_status = true;
        if is_empty_status(status) {
            self.body = Body::Empty;
            self.explicit_null_body = true;
            self.headers.remove(header::CONTENT_TYPE);
            self.headers.remove(header::CONTENT_LENGTH);
            self.headers.remove(header::TRANSFER_ENCODING);
        }
    }

    /// Reset the status without marking it as handler-chosen.
    pub(crate) fn reset_status(&mut self, status: StatusCode) {
        self.status = status.as_u16();
        self.explicit_status = false;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Assign the body.
    ///
    /// An empty body marks the response as intentionally empty (204 unless a
    /// status was set). A non-empty body implies 200 unless a status was set,
    /// and infers content type and length when they are known.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        let body = body.into();
        if body.is_empty() {
            self.explicit_null_body = true;
            if !self.explicit_status {
                self.status = StatusCode::NO_CONTENT.as_u16();
            }
            self.body = Body::Empty;
            return;
        }

        self.explicit_null_body = false;
        if !self.explicit_status {
            self.status = StatusCode::OK.as_u16();
        }

        if !self.headers.contains_key(header::CONTENT_TYPE) {
            let kind = match &body {
                Body::Text(s) if s.trim_start().starts_with('<') => "html",
                Body::Text(_) => "text",
                Body::Json(_) => "json",
                _ => "bin",
            };
            self.set_type(kind);
        }
        // JSON length is only known once the finalizer encodes it.
        let len = match &body {
            Body::Bytes(_) | Body::Text(_) => body.known_length(),
            _ => None,
        };
        match len {
            Some(len) => self.set_length(len),
            None => {
                self.headers.remove(header::CONTENT_LENGTH);
            }
        }
        self.body = body;
    }

    /// Take the body out, leaving `Body::Empty` without touching flags.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Content length: explicit header first, otherwise the body's known length.
    pub fn length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .or_else(|| self.body.known_length())
    }

    pub fn set_length(&mut self, len: u64) {
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Set the content type from a short name (`text`, `html`, `json`, `bin`)
    /// or a full MIME type.
    pub fn set_type(&mut self, kind: &str) {
        let mime = match kind {
            "text" | "txt" => "text/plain; charset=utf-8",
            "html" => "text/html; charset=utf-8",
            "json" => "application/json; charset=utf-8",
            "bin" => "application/octet-stream",
            other => other,
        };
        match HeaderValue::from_str(mime) {
            Ok(value) => {
                self.headers.insert(header::CONTENT_TYPE, value);
            }
            Err(_) => {
                tracing::warn!(content_type = %kind, "Ignoring invalid content type");
            }
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: HeaderName) {
        self.headers.remove(name);
    }

    pub fn has_header(&self, name: HeaderName) -> bool {
        self.headers.contains_key(name)
    }

    pub fn is_explicit_null_body(&self) -> bool {
        self.explicit_null_body
    }

    /// Register a hook that runs when the finalizer writes this response.
    ///
    /// Hooks run last-registered first, so the outermost middleware sees
    /// the final word. They never run for `Context::send_raw`.
    pub fn on_send<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Response) + Send + 'static,
    {
        self.hooks.0.push(Box::new(hook));
    }

    pub(crate) fn run_send_hooks(&mut self) {
        let hooks = std::mem::take(&mut self.hooks.0);
        for hook in hooks.into_iter().rev() {
            hook(self);
        }
    }
}

/// Statuses whose responses never carry a body.
pub fn is_empty_status(status: u16) -> bool {
    matches!(status, 204 | 205 | 304)
}

/// Whether `status` is an assigned HTTP status code.
pub fn is_assigned_status(status: u16) -> bool {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .is_some()
}

/// Single-shot sink for the outbound response.
#[derive(Debug)]
pub struct Outbound {
    tx: Option<oneshot::Sender<WireResponse>>,
    sent: bool,
}

impl Outbound {
    /// Create a sink and the receiver the serving layer waits on.
    pub fn channel() -> (Self, oneshot::Receiver<WireResponse>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx), sent: false }, rx)
    }

    /// A sink with no connection behind it; never writable.
    pub fn detached() -> Self {
        Self { tx: None, sent: false }
    }

    /// Whether a response can still be delivered.
    pub fn is_writable(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Whether a response was already written.
    pub fn headers_sent(&self) -> bool {
        self.sent
    }

    /// Write the response. Fails if one was already written.
    pub fn send(&mut self, response: WireResponse) -> Result<()> {
        if self.sent {
            return Err(Error::HeadersSent);
        }
        let tx = self.tx.take().ok_or(Error::ConnectionClosed)?;
        self.sent = true;
        tx.send(response).map_err(|_| Error::ConnectionClosed)
    }
}
