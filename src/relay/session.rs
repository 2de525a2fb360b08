//! Relay session: owns both ends of one bridge and drives its lifecycle.
//!
//! # State Machine
//! ```text
//! INIT ──(upgrade + upstream connected)──▶ OPEN
//! OPEN ──(first pump ends: EOF, error, close)──▶ CLOSING   latch fires once
//! CLOSING ──(both pumps returned, handles released)──▶ CLOSED
//! ```
//!
//! # Design Decisions
//! - Both pumps are polled concurrently from one task; each suspends only on
//!   its own source and destination, so back-pressure stays per direction
//! - The latch interrupts whichever pump is still blocked
//! - Teardown consumes the handles, so each is released exactly once

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::relay::latch::{CloseReason, ShutdownLatch};
use crate::relay::pump;
use crate::relay::stats::{Direction, SessionState, SessionStats};
use crate::relay::target::RelayTarget;

/// Upper bound for delivering the close frame and shutting down upstream.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub reason: CloseReason,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub duration: Duration,
}

pub struct RelaySession {
    target: RelayTarget,
    buffer_size: usize,
    stats: Arc<SessionStats>,
    latch: ShutdownLatch,
}

impl RelaySession {
    pub fn new(target: RelayTarget, buffer_size: usize, stats: Arc<SessionStats>) -> Self {
        Self {
            target,
            buffer_size,
            stats,
            latch: ShutdownLatch::new(),
        }
    }

    pub fn target(&self) -> &RelayTarget {
        &self.target
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Relay between `client` and `upstream` until either side ends, then
    /// tear both down.
    pub async fn run<C, U>(self, client: C, upstream: U) -> SessionSummary
    where
        C: Stream<Item = Result<Message, axum::Error>> + Sink<Message, Error = axum::Error> + Unpin,
        U: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut client_tx, mut client_rx) = client.split();
        let (mut upstream_rx, mut upstream_tx) = tokio::io::split(upstream);

        self.stats.set_state(SessionState::Open);
        metrics::record_session_opened();
        tracing::info!(target = %self.target, "Relay session open");

        let latch = &self.latch;
        let stats = self.stats.as_ref();
        let buffer_size = self.buffer_size;

        let inbound = async {
            tokio::select! {
                result = pump::client_to_upstream(&mut client_rx, &mut upstream_tx, stats) => {
                    latch.trigger(pump::close_reason(Direction::Inbound, &result));
                    Some(result)
                }
                _ = latch.fired() => None,
            }
        };
        let outbound = async {
            tokio::select! {
                result = pump::upstream_to_client(&mut upstream_rx, &mut client_tx, buffer_size, stats) => {
                    latch.trigger(pump::close_reason(Direction::Outbound, &result));
                    Some(result)
                }
                _ = latch.fired() => None,
            }
        };

        let (inbound, outbound) = tokio::join!(inbound, outbound);
        for (direction, result) in [(Direction::Inbound, inbound), (Direction::Outbound, outbound)] {
            match result {
                Some(Err(e)) => tracing::warn!(direction = %direction, error = %e, "Relay error"),
                Some(Ok(())) => tracing::debug!(direction = %direction, "Pump reached end of stream"),
                None => tracing::debug!(direction = %direction, "Pump interrupted by session shutdown"),
            }
        }

        self.stats.set_state(SessionState::Closing);
        let reason = self.latch.reason().unwrap_or(CloseReason::ClientClosed);
        teardown(reason, client_tx, client_rx, upstream_tx, upstream_rx).await;
        self.stats.set_state(SessionState::Closed);

        let summary = SessionSummary {
            reason,
            bytes_up: self.stats.bytes_up(),
            bytes_down: self.stats.bytes_down(),
            duration: self.stats.open_duration(),
        };
        metrics::record_session_closed(reason, summary.duration);
        tracing::info!(
            target = %self.target,
            reason = %reason,
            bytes_up = summary.bytes_up,
            bytes_down = summary.bytes_down,
            duration_ms = summary.duration.as_millis() as u64,
            "Relay session closed"
        );
        summary
    }
}

/// Release the client sink, the client stream and the upstream socket.
async fn teardown<K, S, W, R>(reason: CloseReason, mut client_tx: K, client_rx: S, mut upstream_tx: W, upstream_rx: R)
where
    K: Sink<Message, Error = axum::Error> + Unpin,
    W: AsyncWrite + Unpin,
{
    let frame = CloseFrame {
        code: reason.close_code(),
        reason: reason.as_str().into(),
    };
    let close_client = async {
        if let Err(e) = client_tx.send(Message::Close(Some(frame))).await {
            tracing::debug!(error = %e, "Close frame not delivered");
        }
        if let Err(e) = client_tx.close().await {
            tracing::debug!(error = %e, "Client sink close failed");
        }
    };
    if tokio::time::timeout(TEARDOWN_TIMEOUT, close_client).await.is_err() {
        tracing::debug!("Client close timed out");
    }
    drop(client_rx);

    match tokio::time::timeout(TEARDOWN_TIMEOUT, upstream_tx.shutdown()).await {
        Ok(Err(e)) => tracing::debug!(error = %e, "Upstream shutdown failed"),
        Err(_) => tracing::debug!("Upstream shutdown timed out"),
        Ok(Ok(())) => {}
    }
    drop(upstream_rx);
    drop(upstream_tx);
}
