//! Assembles [`AppState`] from [`KoinConfig`].
//!
//! Startup is where the process commits to a catalog, a storage backend
//! and a webhook verifier. Every failure here is fatal and reported
//! before the listener binds.

use std::sync::Arc;

use koin_catalog::{CatalogError, CatalogStore};
use koin_db::{DbError, PostgresPool};
use koin_economy::{
    Economy, EconomyError, HmacSignatureVerifier, NoVerification, NotificationVerifier,
    Repositories, SystemClock,
};
use tracing::{info, warn};

use crate::config::{Backend, CatalogConfig, DatabaseConfig, KoinConfig, PaymentsConfig};
use crate::state::AppState;

/// Errors that can occur while assembling the application.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The catalog could not be loaded or failed validation.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The database could not be reached or migrated.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// The configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The webhook verifier could not be built.
    #[error("verifier error: {0}")]
    Verifier(#[from] EconomyError),
}

/// Application state plus the resources that must be released on exit.
#[derive(Debug)]
pub struct KoinApp {
    /// Shared handler state.
    pub state: Arc<AppState>,
    pool: Option<PostgresPool>,
}

impl KoinApp {
    /// Release the database pool, if one was opened.
    pub async fn shutdown(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

/// Build the shared application state.
///
/// # Errors
///
/// Returns [`StartupError`] if the catalog, database or verifier cannot
/// be set up.
pub async fn build_app(config: &KoinConfig) -> Result<KoinApp, StartupError> {
    let catalog = Arc::new(load_catalog(&config.catalog, &config.payments)?);
    let verifier = build_verifier(&config.payments)?;
    let (repos, pool) = connect_repositories(&config.database).await?;

    let economy = Economy::new(catalog, repos, Arc::new(SystemClock), &config.economy);
    info!(
        starting_balance = config.economy.starting_balance,
        daily_quest_count = config.economy.daily_quest_count,
        "Economy assembled"
    );
    Ok(KoinApp {
        state: Arc::new(AppState::new(economy, verifier)),
        pool,
    })
}

/// Load the catalog file, or the built-in catalog, and apply configured
/// tiers on top.
pub fn load_catalog(
    catalog: &CatalogConfig,
    payments: &PaymentsConfig,
) -> Result<CatalogStore, StartupError> {
    let store = match &catalog.path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog file");
            CatalogStore::from_file(path)?
        }
        None => CatalogStore::builtin()?,
    };
    let store = match &payments.tiers {
        Some(tiers) => store.with_tiers(tiers.clone())?,
        None => store,
    };
    info!(
        items = store.items().len(),
        quests = store.templates().len(),
        tiers = store.tiers().len(),
        "Catalog ready"
    );
    Ok(store)
}

async fn connect_repositories(
    config: &DatabaseConfig,
) -> Result<(Repositories, Option<PostgresPool>), StartupError> {
    match config.backend {
        Backend::Memory => {
            warn!("Using in-memory storage; balances are lost on restart");
            Ok((Repositories::in_memory(), None))
        }
        Backend::Postgres => {
            let url = config.url.as_deref().ok_or_else(|| {
                StartupError::Config(String::from(
                    "database.url is required for the postgres backend",
                ))
            })?;
            let pool = PostgresPool::connect(&config.pool_config(url)).await?;
            if config.run_migrations {
                pool.run_migrations().await?;
            }
            let repos = Repositories::from_store(&Arc::new(pool.store()));
            Ok((repos, Some(pool)))
        }
    }
}

/// A signature verifier when a secret is configured, otherwise none.
pub fn build_verifier(
    payments: &PaymentsConfig,
) -> Result<Arc<dyn NotificationVerifier>, StartupError> {
    match payments.webhook_secret.as_deref() {
        Some(secret) => {
            info!("Payment webhook signatures enabled");
            Ok(Arc::new(HmacSignatureVerifier::new(secret)?))
        }
        None => {
            warn!("No webhook secret configured; payment notifications are not verified");
            Ok(Arc::new(NoVerification))
        }
    }
}
