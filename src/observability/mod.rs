//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay sessions and the HTTP layer produce:
//!     → logging.rs (structured log events, per-session spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layer into the session span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
