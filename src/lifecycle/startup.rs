//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the request pipeline from validated configuration
//! - Install the optional metrics endpoint
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The origin policy is built before anything binds, so a wildcard
//!   allow-list never serves a single request
//! - Listeners start last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};

use axum::Router;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::http::{HttpServer, Pipeline, ServerError, ServerHandle, ServerSettings};
use crate::observability::metrics;
use crate::security::PolicyError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid origin policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Wrap `routes` in the pipeline and start serving them.
pub async fn launch(config: &ServerConfig, routes: Router) -> Result<ServerHandle, StartupError> {
    let pipeline = Pipeline::from_config(config).inspect_err(|e| {
        tracing::error!(error = %e, "CORS middleware refuses this allow-list");
    })?;
    tracing::info!(
        allowed_origins = pipeline.policy().allow_list().len(),
        "Request pipeline ready"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(ServerSettings::from_config(config), pipeline.apply(routes));
    Ok(server.start(&config.listener.bind_address).await?)
}

/// Start serving and hold the caller until the server has stopped.
pub async fn run(config: &ServerConfig, routes: Router) -> Result<(), StartupError> {
    let handle = launch(config, routes).await?;
    handle.await_shutdown().await?;
    Ok(())
}
