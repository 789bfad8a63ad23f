//! `PostgreSQL` data layer for the Koin economy.
//!
//! [`PgStore`] implements every repository port defined in
//! `koin-economy`. Each precondition-dependent write is one conditional
//! statement or one transaction:
//!
//! ```text
//! WalletLedger      --> wallets            UPDATE ... WHERE balance >= $n
//! QuestEngine       --> daily_quest_sets   INSERT ... ON CONFLICT DO NOTHING
//!                   --> quest_progress     UPDATE ... WHERE completed AND NOT claimed
//! OwnershipStore    --> owned_items        advisory lock on (entity, category)
//! PaymentReconciler --> payment_receipts   receipt + credit in one transaction
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`store`] -- [`PgStore`] and row types
//! - [`wallet_store`] -- Wallet balances
//! - [`quest_store`] -- Daily quest sets and progress
//! - [`item_store`] -- Owned items and equip slots
//! - [`payment_store`] -- Payment receipts
//! - [`error`] -- Shared error types

pub mod error;
pub mod item_store;
pub mod payment_store;
pub mod postgres;
pub mod quest_store;
pub mod store;
pub mod wallet_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::{OwnedItemRow, PgStore, QuestProgressRow, QuestSetRow, ReceiptRow, WalletRow};
