//! Relay target resolution.
//!
//! # Responsibilities
//! - Check that the request asks for a WebSocket upgrade
//! - Pick the destination: caller-supplied `remote_addr` or the fixed remote
//! - Parse and syntactically validate `host:port`
//! - Enforce the client-target policy and allow-list
//!
//! # Design Decisions
//! - Pure and synchronous: no DNS, no sockets, no side effects
//! - Upgrade check runs first so a plain HTTP request never reaches target parsing
//! - Hostnames are validated by character set only; resolution happens at connect

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use axum::extract::Query;
use axum::http::{header, HeaderMap, Uri};
use serde::Deserialize;

use crate::config::RelayPolicyConfig;
use crate::relay::error::RelayError;

const MAX_HOST_LEN: usize = 253;

/// A validated upstream destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayTarget {
    host: String,
    port: u16,
}

/// Why a `host:port` string was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetParseError {
    #[error("target is empty")]
    Empty,

    #[error("missing `:port` suffix")]
    MissingPort,

    #[error("host is empty")]
    EmptyHost,

    #[error("host `{0}` is not a valid hostname or address")]
    InvalidHost(String),

    #[error("port `{0}` is not a number in 1-65535")]
    InvalidPort(String),
}

impl RelayTarget {
    /// Build a target from parts, applying the same checks as parsing.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, TargetParseError> {
        let host = host.into();
        Self::validate_host(&host)?;
        if port == 0 {
            return Err(TargetParseError::InvalidPort(port.to_string()));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accepts DNS-style names, IPv4 literals and bare IPv6 literals.
    pub fn validate_host(host: &str) -> Result<(), TargetParseError> {
        if host.is_empty() {
            return Err(TargetParseError::EmptyHost);
        }
        if host.contains(':') {
            return host
                .parse::<Ipv6Addr>()
                .map(|_| ())
                .map_err(|_| TargetParseError::InvalidHost(host.to_string()));
        }
        let well_formed = host.len() <= MAX_HOST_LEN
            && !host.starts_with('.')
            && !host.starts_with('-')
            && host
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));
        if well_formed {
            Ok(())
        } else {
            Err(TargetParseError::InvalidHost(host.to_string()))
        }
    }

    /// Match against an allow-list entry: a bare host (any port) or `host:port`.
    pub fn matches_allow_entry(&self, entry: &str) -> bool {
        match entry.parse::<RelayTarget>() {
            Ok(allowed) => allowed.host.eq_ignore_ascii_case(&self.host) && allowed.port == self.port,
            Err(_) => entry.trim_matches(|c| c == '[' || c == ']').eq_ignore_ascii_case(&self.host),
        }
    }
}

impl FromStr for RelayTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| TargetParseError::InvalidHost(s.to_string()))?;
            let port = tail.strip_prefix(':').ok_or(TargetParseError::MissingPort)?;
            if host.parse::<Ipv6Addr>().is_err() {
                return Err(TargetParseError::InvalidHost(host.to_string()));
            }
            (host, port)
        } else {
            let (host, port) = s.rsplit_once(':').ok_or(TargetParseError::MissingPort)?;
            // Unbracketed IPv6 would make the port ambiguous.
            if host.contains(':') {
                return Err(TargetParseError::InvalidHost(host.to_string()));
            }
            Self::validate_host(host)?;
            (host, port)
        };

        let port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => return Err(TargetParseError::InvalidPort(port.to_string())),
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for RelayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Query parameters understood on the relay path.
#[derive(Debug, Default, Deserialize)]
pub struct RelayParams {
    #[serde(default)]
    pub remote_addr: Option<String>,
}

/// True when the `Upgrade` header names the websocket protocol.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::UPGRADE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
}

/// Resolves the destination of one upgrade request against a relay policy.
#[derive(Debug, Clone, Copy)]
pub struct TargetResolver<'a> {
    policy: &'a RelayPolicyConfig,
}

impl<'a> TargetResolver<'a> {
    pub fn new(policy: &'a RelayPolicyConfig) -> Self {
        Self { policy }
    }

    /// Validate the request and produce its target. Never touches the network.
    pub fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Result<RelayTarget, RelayError> {
        if !is_websocket_upgrade(headers) {
            return Err(RelayError::UpgradeRequired);
        }

        let Query(params) = Query::<RelayParams>::try_from_uri(uri)
            .map_err(|e| RelayError::BadQuery(e.body_text()))?;

        match params.remote_addr.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => self.resolve_client_target(raw),
            _ => self.resolve_fixed_target(),
        }
    }

    fn resolve_client_target(&self, raw: &str) -> Result<RelayTarget, RelayError> {
        if !self.policy.allow_client_target {
            return Err(RelayError::ClientTargetDisabled);
        }

        let target: RelayTarget = raw.parse().map_err(|source| RelayError::InvalidTarget {
            input: raw.to_string(),
            source,
        })?;

        let allowed = self.policy.allowed_targets.is_empty()
            || self
                .policy
                .allowed_targets
                .iter()
                .any(|entry| target.matches_allow_entry(entry));
        if !allowed {
            return Err(RelayError::TargetNotAllowed(target));
        }
        Ok(target)
    }

    fn resolve_fixed_target(&self) -> Result<RelayTarget, RelayError> {
        let raw = self.policy.fixed_remote().ok_or(RelayError::MissingTarget)?;
        raw.parse().map_err(|source| RelayError::InvalidTarget {
            input: raw.to_string(),
            source,
        })
    }
}
