//! flow-server
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     FLOW SERVER                       │
//!                    │                                                       │
//!  Client Request    │  ┌─────────┐   ┌───────┐   ┌─────────┐   ┌─────────┐  │
//!  ──────────────────┼─▶│   net   │──▶│ audit │──▶│  cors   │──▶│ recover │  │
//!                    │  │listener │   │       │   │ policy  │   │         │  │
//!                    │  └─────────┘   └───────┘   └─────────┘   └────┬────┘  │
//!                    │                    ▲                          ▼       │
//!  Client Response   │                    │                     ┌─────────┐  │
//!  ◀─────────────────┼────────────────────┴─────────────────────│ routes  │  │
//!                    │                                          └─────────┘  │
//!                    │  ┌─────────────────────────────────────────────────┐  │
//!                    │  │ lifecycle: signals / cancellation → drain (5s)  │  │
//!                    │  └─────────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::{routing::get, Router};
use clap::Parser;

use flow_server::config;
use flow_server::lifecycle::startup;
use flow_server::observability::init_logging;

#[derive(Parser)]
#[command(name = "flow-server", about = "HTTP server with origin policy and request auditing", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "FLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address (host:port)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, warnings) = config::load(cli.config.as_deref()).map_err(|e| {
        // Logging is not up yet; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    init_logging(&config.observability)?;
    for warning in &warnings {
        tracing::warn!(%warning, "Configuration warning");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        release_mode = config.observability.release_mode,
        grace_period_secs = config.shutdown.grace_period_secs,
        "Configuration loaded"
    );

    startup::run(&config, routes()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes() -> Router {
    Router::new().route("/health", get(|| async { "ok" }))
}
