//! Rarity multipliers and item pricing.
//!
//! `price = round(base_price * multiplier[rarity])`, computed in
//! [`Decimal`] so `1.5 * 15` is exactly `22.5` and rounds to `23`
//! (midpoint away from zero). No floating point, no randomness.

use koin_types::{CatalogItem, Rarity};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CatalogError;

/// Price multiplier for a rarity tier. Monotonic in [`Rarity`] order.
pub fn rarity_multiplier(rarity: Rarity) -> Decimal {
    match rarity {
        Rarity::Common => Decimal::new(10, 1),
        Rarity::Uncommon => Decimal::new(15, 1),
        Rarity::Rare => Decimal::new(25, 1),
        Rarity::Epic => Decimal::new(50, 1),
        Rarity::Legendary => Decimal::new(100, 1),
    }
}

/// Final price of a catalog item in Koins.
///
/// # Errors
///
/// Returns [`CatalogError::PriceOverflow`] if the result does not fit in
/// an `i64`.
pub fn price(item: &CatalogItem) -> Result<i64, CatalogError> {
    Decimal::from(item.base_price)
        .checked_mul(rarity_multiplier(item.rarity))
        .map(|raw| raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or_else(|| CatalogError::PriceOverflow(item.id.clone()))
}
