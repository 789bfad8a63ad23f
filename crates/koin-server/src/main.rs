//! Koin API server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `koin-config.yaml` (or `KOIN_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the catalog, connect storage, build the webhook verifier
//! 4. Serve HTTP until `Ctrl-C`, then close the database pool

use std::path::PathBuf;
use std::sync::Arc;

use koin_server::config::KoinConfig;
use koin_server::server::{ServerConfig, start_server};
use koin_server::startup::build_app;
use koin_server::telemetry::init_tracing;
use tracing::info;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "koin-config.yaml";

/// Application entry point for the Koin server.
///
/// # Errors
///
/// Returns an error if configuration, startup or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var_os("KOIN_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = KoinConfig::load(&path)?;

    init_tracing(&config.logging);
    info!(
        config = %path.display(),
        backend = ?config.database.backend,
        "koin-server starting"
    );

    let app = build_app(&config).await?;
    let served = start_server(&ServerConfig::from(&config.server), Arc::clone(&app.state)).await;
    app.shutdown().await;
    served?;
    Ok(())
}
