//! Single-trigger shutdown latch shared by the two pumps of a session.
//!
//! # Design Decisions
//! - The first `trigger` wins and records why the session is closing
//! - Later triggers are no-ops and report `false`
//! - Waiters are woken through a watch channel, so a waiter that subscribes
//!   after the trigger still observes it immediately

use std::sync::OnceLock;

use tokio::sync::watch;

/// Why a session entered CLOSING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame or its stream ended.
    ClientClosed,
    /// Upstream reached EOF.
    UpstreamClosed,
    /// Reading from or writing to the client failed.
    ClientError,
    /// Reading from or writing to the upstream socket failed.
    UpstreamError,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ClientClosed => "client_closed",
            CloseReason::UpstreamClosed => "upstream_closed",
            CloseReason::ClientError => "client_error",
            CloseReason::UpstreamError => "upstream_error",
        }
    }

    /// WebSocket close code sent to the client during teardown.
    pub fn close_code(&self) -> u16 {
        match self {
            CloseReason::ClientClosed | CloseReason::UpstreamClosed => 1000,
            CloseReason::ClientError => 1011,
            // 1014: bad gateway
            CloseReason::UpstreamError => 1014,
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fires exactly once per session.
#[derive(Debug)]
pub struct ShutdownLatch {
    reason: OnceLock<CloseReason>,
    fired_tx: watch::Sender<bool>,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        let (fired_tx, _) = watch::channel(false);
        Self {
            reason: OnceLock::new(),
            fired_tx,
        }
    }

    /// Fire the latch. Returns `true` only for the call that actually fired it.
    pub fn trigger(&self, reason: CloseReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.fired_tx.send_replace(true);
        true
    }

    pub fn is_fired(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The reason recorded by the winning trigger.
    pub fn reason(&self) -> Option<CloseReason> {
        self.reason.get().copied()
    }

    /// Resolves once the latch has fired.
    pub async fn fired(&self) {
        let mut rx = self.fired_tx.subscribe();
        // The sender lives as long as `self`, so this only returns on fire.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}
