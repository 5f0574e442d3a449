//! Metrics collection and exposition.
//!
//! # Metrics
//! - `luca3_actions_total` (counter): orchestrated actions by action, outcome
//! - `luca3_registration_stage_total` (counter): registration stage entries
//! - `luca3_name_resolutions_total` (counter): lookups by outcome
//! - `luca3_rpc_failures_total` (counter): failed RPC calls by method
//! - `luca3_active_sessions` (gauge): sessions currently tracked

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the terminal outcome of an orchestrated action.
pub fn record_action(action: &'static str, outcome: &'static str) {
    counter!("luca3_actions_total", "action" => action, "outcome" => outcome).increment(1);
}

/// Record entry into a registration stage.
pub fn record_registration_stage(stage: &'static str) {
    counter!("luca3_registration_stage_total", "stage" => stage).increment(1);
}

/// Record a name lookup outcome ("resolved", "fallback", "literal").
pub fn record_resolution(outcome: &'static str) {
    counter!("luca3_name_resolutions_total", "outcome" => outcome).increment(1);
}

/// Record an RPC call that failed on every provider.
pub fn record_rpc_failure(method: &'static str) {
    counter!("luca3_rpc_failures_total", "method" => method).increment(1);
}

/// Record the number of tracked sessions.
pub fn record_active_sessions(count: usize) {
    gauge!("luca3_active_sessions").set(count as f64);
}
