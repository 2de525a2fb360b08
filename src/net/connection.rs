//! Relay session admission and lifecycle tracking.
//!
//! # Responsibilities
//! - Bound the number of concurrent relay sessions
//! - Generate unique session IDs for tracing
//! - Keep a registry of live sessions for the admin API
//! - Let shutdown wait until every session has drained

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;
use crate::relay::stats::{SessionState, SessionStats};
use crate::relay::target::RelayTarget;

/// Relaxed ordering is enough, IDs only need to be unique.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

#[derive(Debug)]
struct SessionEntry {
    peer: SocketAddr,
    target: RelayTarget,
    stats: Arc<SessionStats>,
}

/// Point-in-time view of one session, as served by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub peer: String,
    pub target: String,
    pub state: SessionState,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub connect_latency_ms: f64,
    pub age_secs: u64,
    pub started_unix_secs: u64,
}

/// Admits relay sessions up to a fixed limit and tracks the live ones.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    slots: Arc<Semaphore>,
    max_sessions: usize,
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    active_tx: Arc<watch::Sender<usize>>,
}

impl SessionTracker {
    pub fn new(max_sessions: usize) -> Self {
        let (active_tx, _) = watch::channel(0);
        Self {
            slots: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
            sessions: Arc::new(DashMap::new()),
            active_tx: Arc::new(active_tx),
        }
    }

    /// Reserve a session slot. Returns `None` when the relay is full.
    ///
    /// The slot is held until the returned guard is dropped.
    pub fn try_admit(&self, peer: SocketAddr, target: &RelayTarget) -> Option<SessionGuard> {
        let permit = Arc::clone(&self.slots).try_acquire_owned().ok()?;
        let id = SessionId::new();
        let stats = Arc::new(SessionStats::new());

        self.sessions.insert(
            id,
            SessionEntry {
                peer,
                target: target.clone(),
                stats: Arc::clone(&stats),
            },
        );
        self.publish_count();
        tracing::trace!(session_id = %id, peer = %peer, "Session admitted");

        Some(SessionGuard {
            id,
            stats,
            tracker: self.clone(),
            _permit: permit,
        })
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Snapshot of every live session, oldest first.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut entries: Vec<(SessionId, SessionInfo)> = self
            .sessions
            .iter()
            .map(|entry| {
                let stats = &entry.stats;
                let info = SessionInfo {
                    id: entry.key().to_string(),
                    peer: entry.peer.to_string(),
                    target: entry.target.to_string(),
                    state: stats.state(),
                    bytes_up: stats.bytes_up(),
                    bytes_down: stats.bytes_down(),
                    connect_latency_ms: stats.connect_latency().as_secs_f64() * 1000.0,
                    age_secs: stats.age().as_secs(),
                    started_unix_secs: stats.started_unix_secs(),
                };
                (*entry.key(), info)
            })
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, info)| info).collect()
    }

    /// Wait until no session is live. Returns `false` on timeout.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.active_tx.subscribe();
        let idle = tokio::time::timeout(timeout, rx.wait_for(|count| *count == 0))
            .await
            .is_ok_and(|res| res.is_ok());
        idle
    }

    fn publish_count(&self) {
        let count = self.sessions.len();
        self.active_tx.send_replace(count);
        metrics::set_active_sessions(count);
    }
}

/// Holds one session slot and its registry entry for the session's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    id: SessionId,
    stats: Arc<SessionStats>,
    tracker: SessionTracker,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.tracker.sessions.remove(&self.id);
        self.tracker.publish_count();
        tracing::trace!(session_id = %self.id, "Session released");
    }
}
