//! Reporting of failures that reached the dispatcher.
//!
//! # Policy
//! ```text
//! Error::Opaque                 → Err(NotAnError), nothing emitted
//! status 404 or expose == true  → suppressed
//! anything else                 → sink.emit(error, trace)
//! ```
//!
//! Reporting never alters the response; by the time it runs the response was
//! already written or abandoned.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::error::{Error, NotAnError};

/// Destination for diagnostic traces.
pub trait ReportSink: Send + Sync {
    fn emit(&self, error: &Error, trace: &str);
}

/// Writes reports as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, error: &Error, trace: &str) {
        tracing::error!(kind = error.kind(), "{trace}");
    }
}

/// Applies the reporting policy and forwards to a sink.
#[derive(Clone)]
pub struct ErrorReporter {
    sink: Arc<dyn ReportSink>,
}

impl ErrorReporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self { sink }
    }

    /// Report an unhandled failure.
    ///
    /// Returns `Err` only for failures with no error semantics, which are a
    /// defect in the calling code and must not be swallowed.
    pub fn report(&self, err: &Error) -> Result<(), NotAnError> {
        if matches!(err, Error::Opaque) {
            return Err(NotAnError(format!("non-error thrown: {err}")));
        }
        if err.status() == Some(StatusCode::NOT_FOUND) || err.expose() {
            tracing::debug!(error = %err, "Suppressed report");
            return Ok(());
        }
        self.sink.emit(err, &err.trace());
        Ok(())
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::HttpError;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ReportSink for Recording {
        fn emit(&self, _error: &Error, trace: &str) {
            self.0.lock().unwrap().push(trace.to_string());
        }
    }

    fn reporter() -> (ErrorReporter, Arc<Recording>) {
        let sink = Arc::new(Recording::default());
        (ErrorReporter::new(sink.clone()), sink)
    }

    #[test]
    fn test_not_found_is_suppressed() {
        let (reporter, sink) = reporter();
        let err = Error::from(HttpError::from_status(StatusCode::NOT_FOUND).with_expose(false));
        reporter.report(&err).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exposed_is_suppressed() {
        let (reporter, sink) = reporter();
        let err = Error::from(
            HttpError::new(StatusCode::SERVICE_UNAVAILABLE, "maintenance").with_expose(true),
        );
        reporter.report(&err).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_internal_failure_is_emitted_with_trace() {
        let (reporter, sink) = reporter();
        let err = Error::from(
            HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "query failed")
                .with_source(std::io::Error::other("connection reset")),
        );
        reporter.report(&err).unwrap();

        let emitted = sink.0.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].contains("500 query failed"));
        assert!(emitted[0].contains("caused by: connection reset"));
    }

    #[test]
    fn test_panics_and_protocol_violations_are_emitted() {
        let (reporter, sink) = reporter();
        reporter.report(&Error::Panicked("boom".into())).unwrap();
        reporter.report(&Error::NextCalledMultipleTimes).unwrap();
        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_opaque_is_a_type_error() {
        let (reporter, sink) = reporter();
        let err = reporter.report(&Error::Opaque).unwrap_err();
        assert!(err.to_string().starts_with("TypeError"));
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
