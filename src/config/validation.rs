//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every configured target parses as `host:port`
//! - Validate value ranges (timeouts > 0, buffer size > 0)
//! - Refuse configurations that cannot relay anywhere
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{RelayConfig, PLACEHOLDER_ADMIN_KEY};
use crate::relay::target::RelayTarget;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_sessions must be between 1 and {}", tokio::sync::Semaphore::MAX_PERMITS)]
    MaxSessions,

    #[error("relay.path `{0}` must be a literal path starting with '/' other than `/` or `/admin`")]
    RelayPath(String),

    #[error("relay.remote `{value}` is invalid: {reason}")]
    Remote { value: String, reason: String },

    #[error("relay.allowed_targets entry `{value}` is invalid: {reason}")]
    AllowedTarget { value: String, reason: String },

    #[error("relay has no fixed remote and client targets are disabled")]
    NoTarget,

    #[error("relay.buffer_size must be greater than zero")]
    BufferSize,

    #[error("timeouts.{0} must be greater than zero")]
    Timeout(&'static str),

    #[error("admin.api_key must be changed when the admin API is enabled")]
    AdminKey,
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_sessions == 0 || config.listener.max_sessions > tokio::sync::Semaphore::MAX_PERMITS {
        errors.push(ValidationError::MaxSessions);
    }

    let relay = &config.relay;
    if !relay.path.starts_with('/')
        || relay.path == "/"
        || relay.path.starts_with("/admin")
        || relay.path.contains(['{', '}', '*'])
    {
        errors.push(ValidationError::RelayPath(relay.path.clone()));
    }
    if let Some(remote) = relay.fixed_remote() {
        if let Err(e) = remote.parse::<RelayTarget>() {
            errors.push(ValidationError::Remote {
                value: remote.to_string(),
                reason: e.to_string(),
            });
        }
    }
    for entry in &relay.allowed_targets {
        if let Err(reason) = validate_allow_entry(entry) {
            errors.push(ValidationError::AllowedTarget {
                value: entry.clone(),
                reason,
            });
        }
    }
    if relay.fixed_remote().is_none() && !relay.allow_client_target {
        errors.push(ValidationError::NoTarget);
    }
    if relay.buffer_size == 0 {
        errors.push(ValidationError::BufferSize);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Timeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Timeout("request_secs"));
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
        errors.push(ValidationError::AdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Allow-list entries are either a bare host or a full `host:port`.
fn validate_allow_entry(entry: &str) -> Result<(), String> {
    if entry.parse::<RelayTarget>().is_ok() {
        return Ok(());
    }
    RelayTarget::validate_host(entry).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "not-an-addr".into();
        config.relay.path = "handshake".into();
        config.relay.remote = None;
        config.relay.buffer_size = 0;
        config.timeouts.connect_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("not-an-addr".into())));
        assert!(errors.contains(&ValidationError::RelayPath("handshake".into())));
        assert!(errors.contains(&ValidationError::NoTarget));
        assert!(errors.contains(&ValidationError::BufferSize));
        assert!(errors.contains(&ValidationError::Timeout("connect_secs")));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn rejects_malformed_remote_and_allow_entries() {
        let mut config = RelayConfig::default();
        config.relay.remote = Some("bad_host:not_a_port".into());
        config.relay.allow_client_target = true;
        config.relay.allowed_targets = vec!["ok.example".into(), "has space".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::Remote { .. }));
        assert!(matches!(&errors[1], ValidationError::AllowedTarget { value, .. } if value == "has space"));
    }

    #[test]
    fn client_targets_without_fixed_remote_is_valid() {
        let mut config = RelayConfig::default();
        config.relay.remote = None;
        config.relay.allow_client_target = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn admin_requires_real_key() {
        let mut config = RelayConfig::default();
        config.admin.enabled = true;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::AdminKey]);

        config.admin.api_key = "s3cret".into();
        assert!(validate_config(&config).is_ok());
    }
}
