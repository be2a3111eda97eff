//! Metrics collection and exposition.
//!
//! # Metrics
//! - `strata_requests_total` (counter): requests by method, status
//! - `strata_request_duration_seconds` (histogram): dispatch latency by method
//! - `strata_handler_errors_total` (counter): failures caught by the dispatcher, by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("strata_requests_total", "Requests dispatched through the pipeline");
    describe_histogram!(
        "strata_request_duration_seconds",
        Unit::Seconds,
        "Time from dispatch to pipeline completion"
    );
    describe_counter!(
        "strata_handler_errors_total",
        "Failures caught at the dispatcher boundary"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed dispatch.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "strata_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("strata_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failure that reached the dispatcher.
pub fn record_handler_error(kind: &'static str) {
    counter!("strata_handler_errors_total", "kind" => kind).increment(1);
}
