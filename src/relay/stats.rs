//! Per-session state and traffic counters.
//!
//! Shared between the running session (writer) and the session registry /
//! admin API (readers). All fields are atomics; no locks on the hot path.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::observability::metrics;

/// Lifecycle state of a relay session.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Init = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for SessionState {
    fn from(val: u8) -> Self {
        match val {
            1 => SessionState::Open,
            2 => SessionState::Closing,
            3 => SessionState::Closed,
            _ => SessionState::Init,
        }
    }
}

/// Direction of a pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → upstream.
    Inbound,
    /// Upstream → client.
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "client_to_upstream",
            Direction::Outbound => "upstream_to_client",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct SessionStats {
    state: AtomicU8,
    bytes_up: AtomicU64,
    bytes_down: AtomicU64,
    connect_latency_us: AtomicU64,
    started: Instant,
    opened: OnceLock<Instant>,
    started_unix_secs: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        let started_unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            state: AtomicU8::new(SessionState::Init as u8),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
            connect_latency_us: AtomicU64::new(0),
            started: Instant::now(),
            opened: OnceLock::new(),
            started_unix_secs,
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SessionState) {
        if state == SessionState::Open {
            let _ = self.opened.set(Instant::now());
        }
        self.state.store(state as u8, Ordering::Release);
    }

    /// Count bytes moved in one direction.
    pub fn record(&self, direction: Direction, n: usize) {
        let n = n as u64;
        match direction {
            Direction::Inbound => self.bytes_up.fetch_add(n, Ordering::Relaxed),
            Direction::Outbound => self.bytes_down.fetch_add(n, Ordering::Relaxed),
        };
        metrics::record_bytes(direction, n);
    }

    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.connect_latency_us.store(micros, Ordering::Relaxed);
    }

    pub fn connect_latency(&self) -> Duration {
        Duration::from_micros(self.connect_latency_us.load(Ordering::Relaxed))
    }

    /// Time since admission, including the upstream connect and handshake.
    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time spent relaying since the session went OPEN. Zero if it never did.
    pub fn open_duration(&self) -> Duration {
        self.opened.get().map(Instant::elapsed).unwrap_or_default()
    }

    pub fn started_unix_secs(&self) -> u64 {
        self.started_unix_secs
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
