//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hmac_proxy_requests_total` (counter): relayed requests by method, status
//! - `hmac_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `hmac_proxy_relay_failures_total` (counter): 500s by failing stage
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::relay::RelayStage;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed request, successful or not.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    counter!(
        "hmac_proxy_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("hmac_proxy_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that ended in a relay failure.
pub fn record_failure(stage: RelayStage) {
    counter!("hmac_proxy_relay_failures_total", "stage" => stage.as_str()).increment(1);
}
