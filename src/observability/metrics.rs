//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): audited requests by method, status
//! - `http_request_duration_seconds` (histogram): latency by method
//! - `cors_rejections_total` (counter): requests refused by the origin policy
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, latency: Duration) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(latency.as_secs_f64());
}

/// Record a request refused by the origin policy.
pub fn record_origin_rejected() {
    metrics::counter!("cors_rejections_total").increment(1);
}
