//! WebSocket relay endpoint.
//!
//! # Data Flow
//! ```text
//! GET {relay.path}?remote_addr=host:port
//!     → TargetResolver (upgrade check, target policy)   4xx on failure
//!     → SessionTracker::try_admit                         503 when full
//!     → connect_upstream                                  502 / 504
//!     → 101 Switching Protocols
//!     → RelaySession::run (spawned by the upgrade)
//! ```
//!
//! # Design Decisions
//! - Every rejection is decided before the switch response, while a plain
//!   HTTP status can still be returned
//! - The session slot and the upstream socket move into the upgrade
//!   callback; if the upgrade never completes both are dropped with it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::http::request::RequestIdExt;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::session::RelaySession;
use crate::relay::target::TargetResolver;
use crate::relay::upstream::connect_upstream;

/// Upgrade handler for the relay path.
pub async fn relay_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let config = state.config.load_full();
    let request_id = headers.request_id().unwrap_or("unknown").to_string();

    let target = match TargetResolver::new(&config.relay).resolve(&headers, &uri) {
        Ok(target) => target,
        Err(e) => return reject(&request_id, peer, e),
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            metrics::record_rejection("bad_handshake");
            tracing::info!(
                request_id = %request_id,
                peer = %peer,
                error = %rejection,
                "Malformed WebSocket handshake"
            );
            return rejection.into_response();
        }
    };

    let Some(guard) = state.sessions.try_admit(peer, &target) else {
        return reject(&request_id, peer, RelayError::AtCapacity);
    };

    let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
    let (upstream, latency) = match connect_upstream(&target, connect_timeout).await {
        Ok(connected) => connected,
        Err(e) => return reject(&request_id, peer, e),
    };
    guard.stats().set_connect_latency(latency);

    let span = tracing::info_span!(
        "relay_session",
        session_id = %guard.id(),
        target = %target,
        peer = %peer,
        request_id = %request_id,
    );
    let failure_span = span.clone();
    let session = RelaySession::new(target, config.relay.buffer_size, Arc::clone(guard.stats()));

    upgrade
        .on_failed_upgrade(move |error| {
            failure_span.in_scope(|| {
                tracing::warn!(error = %error, "WebSocket upgrade failed, closing upstream");
            });
        })
        .on_upgrade(move |socket| {
            async move {
                let _guard = guard;
                session.run(socket, upstream).await;
            }
            .instrument(span)
        })
}

/// Index route: echoes the caller's address.
pub async fn index_handler(ConnectInfo(peer): ConnectInfo<SocketAddr>) -> String {
    format!("access from {peer}")
}

fn reject(request_id: &str, peer: SocketAddr, error: RelayError) -> Response {
    if error.is_precondition() {
        tracing::info!(
            request_id = %request_id,
            peer = %peer,
            reason = error.reason(),
            error = %error,
            "Relay request rejected"
        );
    } else {
        tracing::warn!(
            request_id = %request_id,
            peer = %peer,
            reason = error.reason(),
            error = %error,
            "Upstream connect failed"
        );
    }
    error.into_response()
}
