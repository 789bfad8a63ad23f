//! Axum router construction for the Koin API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::webhook;

/// Build the complete Axum router for the Koin server.
///
/// See [`handlers`] for the endpoint table. Routes sharing a path
/// position use the same parameter name, which the router requires.
///
/// CORS allows any origin so the game client can call the API from its
/// own host.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Catalog
        .route("/api/catalog/items", get(handlers::list_catalog_items))
        .route("/api/catalog/quests", get(handlers::list_quest_templates))
        .route("/api/catalog/tiers", get(handlers::list_tiers))
        // Wallets
        .route("/api/wallets/{owner}", get(handlers::get_wallet))
        .route("/api/wallets/{owner}/credit", post(handlers::credit_wallet))
        .route("/api/wallets/{owner}/debit", post(handlers::debit_wallet))
        // Quests
        .route("/api/quests/renew", post(handlers::renew_quests))
        .route("/api/quests/{owner}", get(handlers::get_quests))
        .route(
            "/api/quests/{owner}/progress",
            post(handlers::update_quest_progress),
        )
        .route(
            "/api/quests/{owner}/{quest_id}/claim",
            post(handlers::claim_quest),
        )
        // Interactions
        .route(
            "/api/interactions/{owner}",
            post(handlers::record_interaction),
        )
        // Items
        .route("/api/items/owner/{owner}", get(handlers::list_owner_items))
        .route(
            "/api/items/owner/{owner}/purchase",
            post(handlers::purchase_item),
        )
        .route("/api/items/entity/{entity}", get(handlers::list_entity_items))
        .route("/api/items/{id}/equip", post(handlers::equip_item))
        .route("/api/items/{id}/unequip", post(handlers::unequip_item))
        // Payments
        .route(
            "/api/payments/receipts/{event_id}",
            get(handlers::get_receipt),
        )
        .route("/webhooks/payments", post(webhook::payment_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
