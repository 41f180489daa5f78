//! Metrics collection and exposition.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!(address = %addr, "metrics endpoint listening");
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];

    counter!("waypoint_requests_total", &labels).increment(1);
    histogram!("waypoint_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Record a request that never reached a backend.
pub fn record_rejected_request(reason: &'static str) {
    counter!("waypoint_rejected_requests_total", "reason" => reason).increment(1);
}

/// Update the per-backend health gauge.
pub fn record_backend_health(backend: &str, healthy: bool) {
    let value = if healthy { 1.0 } else { 0.0 };
    gauge!("waypoint_backend_healthy", "backend" => backend.to_string()).set(value);
}
