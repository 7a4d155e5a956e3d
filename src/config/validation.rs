//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject the wildcard origin before any policy is built
//! - Validate value ranges (grace period > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;
use crate::security::origin_policy::WILDCARD_ORIGIN;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a host:port pair")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be > 0")]
    ZeroMaxConnections,

    #[error("cors.allowed_origins must not contain the wildcard \"*\"")]
    WildcardOrigin,

    #[error("cors.allowed_origins entry {0:?} is not a scheme://host[:port] origin")]
    MalformedOrigin(String),

    #[error("cors.allowed_origins entry {0:?} is listed more than once")]
    DuplicateOrigin(String),

    #[error("shutdown.grace_period_secs must be > 0")]
    ZeroGracePeriod,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let mut seen = HashSet::new();
    for origin in &config.cors.allowed_origins {
        if origin.trim() == WILDCARD_ORIGIN {
            errors.push(ValidationError::WildcardOrigin);
            continue;
        }
        if !is_origin(origin) {
            errors.push(ValidationError::MalformedOrigin(origin.clone()));
            continue;
        }
        if !seen.insert(origin.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateOrigin(origin.clone()));
        }
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroGracePeriod);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric port. Hostnames are allowed.
fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// An origin as a browser sends it: scheme and authority only, default port omitted.
fn is_origin(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    url.origin()
        .ascii_serialization()
        .eq_ignore_ascii_case(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origins(origins: &[&str]) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.cors.allowed_origins = origins.iter().map(|o| o.to_string()).collect();
        config
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn accepts_well_formed_origins() {
        let config = config_with_origins(&[
            "https://app.example.com",
            "http://localhost:3000",
            "http://[::1]:8080",
        ]);
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn rejects_wildcard_origin() {
        let config = config_with_origins(&["https://app.example.com", "*"]);
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::WildcardOrigin])
        );
    }

    #[test]
    fn rejects_origins_with_paths_or_foreign_schemes() {
        let config = config_with_origins(&[
            "https://app.example.com/",
            "https://app.example.com/login",
            "ftp://files.example.com",
            "app.example.com",
        ]);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::MalformedOrigin(_))));
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let config = config_with_origins(&["https://app.example.com", "https://APP.example.com"]);
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::DuplicateOrigin(
                "https://APP.example.com".into()
            )])
        );
    }

    #[test]
    fn collects_every_error() {
        let mut config = config_with_origins(&["*"]);
        config.listener.bind_address = "nonsense".into();
        config.listener.max_connections = 0;
        config.shutdown.grace_period_secs = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nope".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::WildcardOrigin));
        assert!(errors.contains(&ValidationError::ZeroGracePeriod));
    }

    #[test]
    fn bind_address_accepts_hostnames_and_ipv6() {
        assert!(is_host_port("localhost:8080"));
        assert!(is_host_port("[::1]:8080"));
        assert!(!is_host_port(":8080"));
        assert!(!is_host_port("localhost"));
        assert!(!is_host_port("localhost:http"));
    }
}
