//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → tls.rs (optional TLS handshake)
//!     → Hand off to HTTP layer
//!     → connection.rs (session admission, lifecycle tracking)
//!
//! Session States:
//!     Init → Open → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - Admission is bounded by a semaphore; a full relay answers 503
//! - Each session tracked for graceful shutdown and the admin API
//! - TLS is optional and handled transparently

pub mod connection;
pub mod listener;
pub mod tls;
