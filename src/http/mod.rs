//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → websocket.rs (relay upgrade, index)
//!     → response.rs (rejection → status code)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
