//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / middleware produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters, latency histogram, handler errors)
//!     → reporter.rs (unhandled failures → ReportSink)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through logs via the request-id layer and middleware
//! - Metrics are cheap; recording without an installed exporter is a no-op

pub mod logging;
pub mod metrics;
pub mod reporter;

pub use reporter::{ErrorReporter, ReportSink, TracingSink};
