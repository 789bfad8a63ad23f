//! Shared type definitions for the Koin virtual economy.
//!
//! This crate is the single source of truth for the records that flow
//! between the economy services, the database layer and the HTTP API.
//! Types are exported to `TypeScript` via `ts-rs` so the presentation code
//! reads the same catalog and quest shapes.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers
//! - [`enums`] -- Rarity, item category, quest type and interaction enums
//! - [`structs`] -- Wallets, catalog definitions, quest sets, owned items,
//!   payment receipts

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{InteractionAction, ItemCategory, QuestType, Rarity, UnknownVariant};
pub use ids::{CatalogItemId, EntityId, OwnedItemId, OwnerId, PaymentEventId, ProductId, QuestId};
pub use structs::{
    CatalogItem, DailyQuestSet, EnrichedQuest, KoinTier, OwnedItem, PaymentReceipt,
    QuestProgress, QuestTemplate, RewardResult, Wallet,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::OwnedItemId::export_all();
        let _ = crate::ids::OwnerId::export_all();
        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::CatalogItemId::export_all();
        let _ = crate::ids::QuestId::export_all();
        let _ = crate::ids::ProductId::export_all();
        let _ = crate::ids::PaymentEventId::export_all();

        let _ = crate::enums::Rarity::export_all();
        let _ = crate::enums::ItemCategory::export_all();
        let _ = crate::enums::QuestType::export_all();
        let _ = crate::enums::InteractionAction::export_all();

        let _ = crate::structs::Wallet::export_all();
        let _ = crate::structs::CatalogItem::export_all();
        let _ = crate::structs::QuestTemplate::export_all();
        let _ = crate::structs::RewardResult::export_all();
        let _ = crate::structs::KoinTier::export_all();
        let _ = crate::structs::QuestProgress::export_all();
        let _ = crate::structs::DailyQuestSet::export_all();
        let _ = crate::structs::EnrichedQuest::export_all();
        let _ = crate::structs::OwnedItem::export_all();
        let _ = crate::structs::PaymentReceipt::export_all();
    }
}
