//! Relay error types.
//!
//! Two families with different lifetimes:
//! - [`RelayError`]: request-time rejections, raised before the switch
//!   response is sent and mapped to an HTTP status by the HTTP layer.
//! - [`PumpError`]: mid-stream failures of one direction. These never reach
//!   a caller; they end the session and are logged.

use std::time::Duration;

use axum::http::StatusCode;

use crate::relay::target::{RelayTarget, TargetParseError};

/// Why an upgrade request was refused.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Expected Upgrade: websocket")]
    UpgradeRequired,

    #[error("malformed query string: {0}")]
    BadQuery(String),

    #[error("no relay target configured and none supplied")]
    MissingTarget,

    #[error("invalid relay target `{input}`: {source}")]
    InvalidTarget {
        input: String,
        #[source]
        source: TargetParseError,
    },

    #[error("client-supplied relay targets are disabled")]
    ClientTargetDisabled,

    #[error("relay target {0} is not permitted")]
    TargetNotAllowed(RelayTarget),

    #[error("relay is at session capacity")]
    AtCapacity,

    #[error("upstream {target} unreachable: {source}")]
    UpstreamUnreachable {
        target: RelayTarget,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream {target} did not accept within {after:?}")]
    UpstreamTimeout { target: RelayTarget, after: Duration },
}

impl RelayError {
    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            RelayError::BadQuery(_)
            | RelayError::MissingTarget
            | RelayError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
            RelayError::ClientTargetDisabled | RelayError::TargetNotAllowed(_) => {
                StatusCode::FORBIDDEN
            }
            RelayError::AtCapacity => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::UpgradeRequired => "upgrade_required",
            RelayError::BadQuery(_) => "bad_query",
            RelayError::MissingTarget => "missing_target",
            RelayError::InvalidTarget { .. } => "invalid_target",
            RelayError::ClientTargetDisabled => "client_target_disabled",
            RelayError::TargetNotAllowed(_) => "target_not_allowed",
            RelayError::AtCapacity => "at_capacity",
            RelayError::UpstreamUnreachable { .. } => "upstream_unreachable",
            RelayError::UpstreamTimeout { .. } => "upstream_timeout",
        }
    }

    /// Whether the request failed before any socket was opened.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            RelayError::UpstreamUnreachable { .. } | RelayError::UpstreamTimeout { .. }
        )
    }
}

/// Failure of a single pump direction.
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("client transport: {0}")]
    Client(#[from] axum::Error),

    #[error("upstream socket: {0}")]
    Upstream(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(RelayError::UpgradeRequired.status(), StatusCode::UPGRADE_REQUIRED);
        assert_eq!(RelayError::MissingTarget.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::ClientTargetDisabled.status(), StatusCode::FORBIDDEN);
        assert_eq!(RelayError::AtCapacity.status(), StatusCode::SERVICE_UNAVAILABLE);

        let target: RelayTarget = "127.0.0.1:9".parse().unwrap();
        let unreachable = RelayError::UpstreamUnreachable {
            target: target.clone(),
            source: std::io::ErrorKind::ConnectionRefused.into(),
        };
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert!(!unreachable.is_precondition());

        let timeout = RelayError::UpstreamTimeout { target, after: Duration::from_secs(1) };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.reason(), "upstream_timeout");
    }

    #[test]
    fn upgrade_required_message_matches_wire_body() {
        assert_eq!(RelayError::UpgradeRequired.to_string(), "Expected Upgrade: websocket");
    }
}
