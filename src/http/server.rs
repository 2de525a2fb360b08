//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay, index and admin routes
//! - Wire up middleware (tracing, request ID, timeouts)
//! - Serve plain HTTP or TLS on the bound listener
//! - Apply hot-reloaded configuration to new sessions
//! - Stop accepting on shutdown and drain live sessions

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::schema::TlsConfig;
use crate::config::RelayConfig;
use crate::http::request::MakeRequestUuidV4;
use crate::http::websocket::{index_handler, relay_handler};
use crate::net::connection::SessionTracker;
use crate::net::tls::load_tls_config;

/// How long a stopped server waits for live sessions before returning.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub sessions: SessionTracker,
}

/// HTTP server for the WebSocket relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
    tls: Option<TlsConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
            sessions: SessionTracker::new(config.listener.max_sessions),
        };
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            tls: config.listener.tls.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout wraps plain HTTP routes only; upgraded sessions
    /// outlive the request that created them.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let mut plain = Router::new().route("/", get(index_handler));
        if config.admin.enabled {
            plain = plain.merge(setup_admin_router(state.clone()));
        }
        let plain = plain.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route(&config.relay.path, get(relay_handler))
            .with_state(state)
            .merge(plain)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Live session tracker, shared with the handlers.
    pub fn sessions(&self) -> &SessionTracker {
        &self.state.sessions
    }

    /// The configuration currently applied to new sessions.
    pub fn config(&self) -> Arc<RelayConfig> {
        self.state.config.load_full()
    }

    /// Router with state applied, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then wait for live sessions.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            "HTTP server starting"
        );

        tokio::spawn(apply_config_updates(Arc::clone(&self.state.config), config_updates));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        match &self.tls {
            None => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(wait_for_shutdown(shutdown))
                    .await?;
            }
            Some(tls) => {
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
                let handle = axum_server::Handle::new();
                {
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        wait_for_shutdown(shutdown).await;
                        handle.graceful_shutdown(None);
                    });
                }
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!(
            active_sessions = self.state.sessions.active_count(),
            "HTTP server stopped accepting, draining sessions"
        );
        if !self.state.sessions.wait_for_idle(DRAIN_TIMEOUT).await {
            tracing::warn!(
                active_sessions = self.state.sessions.active_count(),
                "Sessions still open after drain timeout"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in each validated configuration received from the watcher.
///
/// Listener settings are fixed at startup; a change there is only logged.
async fn apply_config_updates(
    current: Arc<ArcSwap<RelayConfig>>,
    mut updates: mpsc::UnboundedReceiver<RelayConfig>,
) {
    while let Some(next) = updates.recv().await {
        if needs_restart(&current.load(), &next) {
            tracing::warn!("Listener, TLS, relay path or admin toggle changed; restart required to apply");
        }
        current.store(Arc::new(next));
        tracing::info!("Configuration reloaded");
    }
}

/// Settings baked into the listener and router at startup.
fn needs_restart(previous: &RelayConfig, next: &RelayConfig) -> bool {
    previous.listener.bind_address != next.listener.bind_address
        || previous.listener.max_sessions != next.listener.max_sessions
        || previous.listener.tls != next.listener.tls
        || previous.relay.path != next.relay.path
        || previous.admin.enabled != next.admin.enabled
}

async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    // A closed channel also means shutdown.
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}
