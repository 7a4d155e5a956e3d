//! Structured logging.
//!
//! # Responsibilities
//! - Install the process-wide `tracing` subscriber once, at startup
//! - JSON output in release mode, human-readable output otherwise
//! - Log level from `RUST_LOG` when set, configuration otherwise
//!
//! The subscriber lives for the rest of the process; there is no teardown.
//! Components emit through `tracing` macros, the audit stage through its
//! injected [`AuditSink`](crate::observability::audit::AuditSink).

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| LoggingError::Filter {
            filter: config.log_level.clone(),
            source,
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.release_mode {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    Ok(())
}
