//! Startup orchestration.
//!
//! # Order
//! ```text
//! load config (file or defaults) → validate
//!     → logging → metrics exporter → config watcher
//!     → bind listener → serve until SIGINT/SIGTERM
//! ```
//!
//! Any startup error is fatal; the listener binds last so traffic only
//! arrives once everything else is up.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::validation::validate_config;
use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, ConfigError, RelayConfig};
use crate::http::HttpServer;
use crate::lifecycle::signals::wait_for_termination;
use crate::lifecycle::Shutdown;
use crate::net::listener::{self, ListenerError};
use crate::observability::{logging, metrics};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Resolve the configuration to start with.
pub fn initial_config(path: Option<&std::path::Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = RelayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Run the relay until a termination signal arrives.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), StartupError> {
    let config = initial_config(config_path.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ws-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_sessions = config.listener.max_sessions,
        relay_path = %config.relay.path,
        remote = ?config.relay.remote,
        allow_client_target = config.relay.allow_client_target,
        connect_timeout_secs = config.timeouts.connect_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for as long as the server runs.
    let (_watcher, config_updates) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match wait_for_termination().await {
                Ok(signal) => tracing::info!(signal = %signal, "Termination signal received"),
                Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
            }
            shutdown.trigger();
        });
    }

    let server = HttpServer::new(config);
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
