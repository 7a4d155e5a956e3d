//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A problem found while loading that does not stop startup.
///
/// Loading happens before the log subscriber exists, so warnings are
/// returned to the caller instead of being logged here.
#[derive(Debug, Error)]
pub enum ConfigWarning {
    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    #[error("ignoring unparseable {variable}={value:?}")]
    UnparseableOverride { variable: &'static str, value: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
///
/// A `.env` file in the working directory is loaded first when present.
/// Non-fatal problems come back alongside the config for the caller to log.
pub fn load(path: Option<&Path>) -> Result<(ServerConfig, Vec<ConfigWarning>), ConfigError> {
    let mut warnings = Vec::new();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warnings.push(ConfigWarning::DotEnv(e));
        }
    }

    let config = match path {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };
    let (config, override_warnings) = apply_env_overrides(config);
    warnings.extend(override_warnings);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, warnings))
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply overrides from process environment variables.
pub fn apply_env_overrides(config: ServerConfig) -> (ServerConfig, Vec<ConfigWarning>) {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Recognised variables: `DOMAIN`, `SERVER_PORT`, `RELEASE_MODE`,
/// `CORS_ALLOWED_ORIGINS` (comma separated) and `LOG_LEVEL`.
/// Unparseable values leave the current setting in place and are reported
/// as warnings.
pub fn apply_overrides<F>(mut config: ServerConfig, lookup: F) -> (ServerConfig, Vec<ConfigWarning>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    let domain = lookup("DOMAIN").filter(|v| !v.trim().is_empty());
    let port = lookup("SERVER_PORT").filter(|v| !v.trim().is_empty());
    if domain.is_some() || port.is_some() {
        let (current_host, current_port) = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| ("0.0.0.0".to_string(), "8080".to_string()));
        let host = domain.map(|d| d.trim().to_string()).unwrap_or(current_host);
        let port = port.map(|p| p.trim().to_string()).unwrap_or(current_port);
        config.listener.bind_address = format!("{host}:{port}");
    }

    if let Some(raw) = lookup("RELEASE_MODE") {
        match parse_bool(&raw) {
            Some(release) => config.observability.release_mode = release,
            None => warnings.push(ConfigWarning::UnparseableOverride {
                variable: "RELEASE_MODE",
                value: raw,
            }),
        }
    }

    if let Some(raw) = lookup("CORS_ALLOWED_ORIGINS") {
        config.cors.allowed_origins = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        config.observability.log_level = level.trim().to_string();
    }

    (config, warnings)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" => Some(true),
        "0" | "f" | "false" | "no" => Some(false),
        _ => None,
    }
}
