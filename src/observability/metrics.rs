//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_total` (counter): sessions that reached OPEN
//! - `relay_sessions_active` (gauge): sessions currently holding a slot
//! - `relay_rejections_total` (counter): refused upgrades by `reason`
//! - `relay_bytes_total` (counter): relayed payload bytes by `direction`
//! - `relay_session_duration_seconds` (histogram): OPEN to CLOSED, by `reason`
//! - `relay_connect_duration_seconds` (histogram): upstream connect latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of globals
//! - Prometheus exporter serves its own listener, separate from the relay

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::relay::latch::CloseReason;
use crate::relay::stats::Direction;

/// Install the Prometheus recorder and start its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    metrics::counter!("relay_sessions_total").increment(1);
}

pub fn record_session_closed(reason: CloseReason, duration: Duration) {
    metrics::histogram!("relay_session_duration_seconds", "reason" => reason.as_str())
        .record(duration.as_secs_f64());
}

/// Current number of admitted sessions.
pub fn set_active_sessions(count: usize) {
    metrics::gauge!("relay_sessions_active").set(count as f64);
}

pub fn record_rejection(reason: &'static str) {
    metrics::counter!("relay_rejections_total", "reason" => reason).increment(1);
}

pub fn record_bytes(direction: Direction, n: u64) {
    metrics::counter!("relay_bytes_total", "direction" => direction.as_str()).increment(n);
}

pub fn record_connect(latency: Duration) {
    metrics::histogram!("relay_connect_duration_seconds").record(latency.as_secs_f64());
}
