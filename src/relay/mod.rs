//! WebSocket ⇄ TCP relay core.
//!
//! # Data Flow
//! ```text
//! upgrade request
//!     → target.rs (upgrade check, host:port validation, target policy)
//!     → upstream.rs (TCP connect with timeout)
//!     → session.rs (owns both ends, runs the pumps, single teardown)
//!         → pump.rs   client_to_upstream / upstream_to_client
//!         → latch.rs  first pump to finish fires it, the other is interrupted
//!         → stats.rs  bytes per direction, state, connect latency
//! ```
//!
//! # Design Decisions
//! - Target validation is synchronous and never opens a socket
//! - Pumps borrow, the session owns; only teardown closes anything
//! - Mid-stream errors end the session and are logged, never retried

pub mod error;
pub mod latch;
pub mod pump;
pub mod session;
pub mod stats;
pub mod target;
pub mod upstream;

pub use error::{PumpError, RelayError};
pub use latch::{CloseReason, ShutdownLatch};
pub use session::{RelaySession, SessionSummary};
pub use target::{RelayTarget, TargetResolver};
