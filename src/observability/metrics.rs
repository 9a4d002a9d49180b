//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_invocations_total` (counter): invocations by response status
//! - `gateway_stage_duration_seconds` (histogram): fetch / transform latency
//! - `gateway_origin_bytes_total` (counter): origin bytes staged to scratch
//! - `gateway_transform_failures_total` (counter): tool failures by kind
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_invocation(status: u16) {
    ::metrics::counter!("gateway_invocations_total", "status" => status.to_string()).increment(1);
}

pub fn record_stage(stage: &'static str, started: Instant) {
    ::metrics::histogram!("gateway_stage_duration_seconds", "stage" => stage)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_origin_bytes(bytes: u64) {
    ::metrics::counter!("gateway_origin_bytes_total").increment(bytes);
}

pub fn record_transform_failure(kind: &'static str) {
    ::metrics::counter!("gateway_transform_failures_total", "kind" => kind).increment(1);
}
