//! Shared application state for the Koin API server.
//!
//! [`AppState`] holds the assembled [`Economy`] and the webhook verifier.
//! Both are cheap to share; all mutable state lives in the store behind
//! the economy's repositories.

use std::sync::Arc;

use koin_catalog::CatalogStore;
use koin_economy::{
    Economy, EconomySettings, NoVerification, NotificationVerifier, Repositories, SystemClock,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The economy services.
    pub economy: Economy,
    /// Checks payment webhook signatures.
    pub verifier: Arc<dyn NotificationVerifier>,
}

impl AppState {
    /// Create state from an assembled economy and a verifier.
    pub fn new(economy: Economy, verifier: Arc<dyn NotificationVerifier>) -> Self {
        Self { economy, verifier }
    }

    /// In-memory economy over `catalog` with unverified webhooks. For
    /// tests and local development.
    pub fn in_memory(catalog: CatalogStore, settings: &EconomySettings) -> Self {
        let economy = Economy::new(
            Arc::new(catalog),
            Repositories::in_memory(),
            Arc::new(SystemClock),
            settings,
        );
        Self::new(economy, Arc::new(NoVerification))
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("economy", &self.economy)
            .finish_non_exhaustive()
    }
}
