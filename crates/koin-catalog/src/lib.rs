//! Static catalog data for the Koin virtual economy.
//!
//! Everything in this crate is read-only and deterministic apart from
//! daily quest sampling, which draws from an injected or thread-local RNG.
//!
//! # Modules
//!
//! - [`catalog`] -- [`CatalogStore`]: items, quest templates, Koins tiers
//! - [`pricing`] -- Rarity multipliers and the item price formula
//! - [`rewards`] -- Koins earned per monster interaction
//! - [`builtin`] -- The catalog shipped with the application
//! - [`error`] -- Catalog loading and validation errors

pub mod builtin;
pub mod catalog;
pub mod error;
pub mod pricing;
pub mod rewards;

pub use catalog::CatalogStore;
pub use error::CatalogError;
pub use pricing::{price, rarity_multiplier};
pub use rewards::{calculate_reward, is_rewardable, reward_for, total_for};
