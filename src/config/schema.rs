//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder admin key shipped in the defaults. Validation refuses it
/// whenever the admin API is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS, session limit).
    pub listener: ListenerConfig,

    /// Relay target policy and pump tuning.
    pub relay: RelayPolicyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When set the relay serves `wss://`.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent relay sessions (backpressure).
    pub max_sessions: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_sessions: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Where sessions may relay to, and how.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayPolicyConfig {
    /// HTTP path that accepts the WebSocket upgrade.
    pub path: String,

    /// Fixed upstream (`host:port`) used when the caller supplies none.
    /// An empty string disables it.
    pub remote: Option<String>,

    /// Honour the `remote_addr` query parameter.
    pub allow_client_target: bool,

    /// Entries of the form `host` or `host:port` that caller-supplied
    /// targets must match. Empty means any syntactically valid target.
    pub allowed_targets: Vec<String>,

    /// Upstream read chunk size in bytes.
    pub buffer_size: usize,
}

impl Default for RelayPolicyConfig {
    fn default() -> Self {
        Self {
            path: "/handshake".to_string(),
            remote: Some("127.0.0.1:5201".to_string()),
            allow_client_target: false,
            allowed_targets: Vec::new(),
            buffer_size: 16 * 1024,
        }
    }
}

impl RelayPolicyConfig {
    /// The fixed remote, if one is configured.
    pub fn fixed_remote(&self) -> Option<&str> {
        self.remote.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Timeout for plain (non-upgrade) HTTP requests in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/*` on the relay listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.relay.path, "/handshake");
        assert_eq!(config.relay.remote.as_deref(), Some("127.0.0.1:5201"));
        assert!(!config.relay.allow_client_target);
        assert_eq!(config.timeouts.connect_secs, 5);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [relay]
            allow_client_target = true
            allowed_targets = ["echo.internal", "10.0.0.7:22"]

            [timeouts]
            connect_secs = 2
            "#,
        )
        .unwrap();

        assert!(config.relay.allow_client_target);
        assert_eq!(config.relay.allowed_targets.len(), 2);
        assert_eq!(config.relay.buffer_size, 16 * 1024);
        assert_eq!(config.timeouts.connect_secs, 2);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn empty_remote_disables_fixed_target() {
        let config: RelayConfig = toml::from_str("[relay]\nremote = \"\"\n").unwrap();
        assert_eq!(config.relay.fixed_remote(), None);
        assert_eq!(RelayPolicyConfig::default().fixed_remote(), Some("127.0.0.1:5201"));
    }
}
