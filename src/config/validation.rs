//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds > 0)
//! - Check the reverse proxy upstream and mount point
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("auth.basic_auth_user must not be empty")]
    EmptyBasicAuthUser,

    #[error("reverse_proxy.mount must start with '/' and not be '/': {0}")]
    InvalidMount(String),

    #[error("reverse_proxy.upstream_url is not a valid http URL: {0}")]
    InvalidUpstream(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    let ranges = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("monitor.liveness_interval_ms", config.monitor.liveness_interval_ms),
        ("monitor.liveness_timeout_ms", config.monitor.liveness_timeout_ms),
        ("monitor.readiness_interval_ms", config.monitor.readiness_interval_ms),
        ("monitor.datastore_interval_ms", config.monitor.datastore_interval_ms),
        ("monitor.liveness_failure_threshold", u64::from(config.monitor.liveness_failure_threshold)),
        ("datastore.max_connections", u64::from(config.datastore.max_connections)),
        ("datastore.ping_timeout_ms", config.datastore.ping_timeout_ms),
    ];
    for (field, value) in ranges {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    if config.auth.basic_auth_user.is_empty() {
        errors.push(ValidationError::EmptyBasicAuthUser);
    }

    let mount = &config.reverse_proxy.mount;
    if !mount.starts_with('/') || mount == "/" || mount.contains('{') {
        errors.push(ValidationError::InvalidMount(mount.clone()));
    }

    if let Some(raw) = &config.reverse_proxy.upstream_url {
        let valid = Url::parse(raw)
            .map(|url| url.scheme() == "http" && url.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidUpstream(raw.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
