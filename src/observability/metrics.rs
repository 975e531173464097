//! Metrics collection and exposition.
//!
//! # Metrics
//! - `boot_ready_tasks_total` (counter): gated tasks finished, by phase and outcome
//! - `boot_gate_resolutions_total` (counter): gate resolutions, by phase and outcome
//! - `boot_hook_errors_total` (counter): fan-out and teardown failures, by phase
//! - `boot_timing_duration_seconds` (histogram): recorded timing intervals, by name
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_ready_task(phase: &str, outcome: &'static str) {
    metrics::counter!(
        "boot_ready_tasks_total",
        "phase" => phase.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_gate_resolution(phase: &str, outcome: &'static str) {
    metrics::counter!(
        "boot_gate_resolutions_total",
        "phase" => phase.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_hook_error(phase: &'static str) {
    metrics::counter!("boot_hook_errors_total", "phase" => phase).increment(1);
}

pub fn record_timing(name: &str, elapsed: Duration) {
    metrics::histogram!("boot_timing_duration_seconds", "name" => name.to_string())
        .record(elapsed.as_secs_f64());
}
