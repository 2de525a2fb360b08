use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::net::connection::SessionInfo;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub relay_path: String,
    pub remote: Option<String>,
    pub allow_client_target: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let config = state.config.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        active_sessions: state.sessions.active_count(),
        max_sessions: state.sessions.max_sessions(),
        relay_path: config.relay.path.clone(),
        remote: config.relay.remote.clone(),
        allow_client_target: config.relay.allow_client_target,
    })
}

/// Live relay sessions, oldest first.
pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    Json(state.sessions.snapshot())
}
