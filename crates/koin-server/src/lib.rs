//! HTTP API for the Koin virtual economy.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Catalog endpoints** listing items with their computed prices,
//!   quest templates and Koins tiers
//! - **Wallet, quest, interaction and item endpoints** that call into
//!   [`koin_economy::Economy`]
//! - **Payment webhook** (`/webhooks/payments`) that verifies and
//!   reconciles processor notifications
//!
//! # Architecture
//!
//! Handlers are thin: they parse path, query and body, call one economy
//! operation and map [`EconomyError`](koin_economy::EconomyError) to a
//! status through [`ApiError`]. Storage is chosen at startup from
//! [`KoinConfig`]: the in-memory store for development, `PostgreSQL`
//! through `koin-db` otherwise.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod telemetry;
pub mod webhook;

// Re-export primary types for convenience.
pub use config::KoinConfig;
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{KoinApp, StartupError, build_app};
pub use state::AppState;
