//! The assembled economy.
//!
//! [`Economy`] wires the services over one set of repositories and adds
//! the cross-service flows: interaction rewards and the quest progress
//! hooks fired by purchases and equips.

use std::sync::Arc;

use koin_catalog::{CatalogStore, reward_for};
use koin_types::{
    CatalogItemId, EntityId, InteractionAction, ItemCategory, OwnedItem, OwnedItemId, OwnerId,
    QuestProgress, QuestType, RewardResult, Wallet,
};
use serde::Serialize;
use tracing::warn;

use crate::clock::Clock;
use crate::config::EconomySettings;
use crate::error::EconomyError;
use crate::memory::MemoryStore;
use crate::ownership::OwnershipStore;
use crate::payments::PaymentReconciler;
use crate::quests::QuestEngine;
use crate::repo::{ItemRepo, PaymentRepo, QuestRepo, WalletRepo};
use crate::wallet::WalletLedger;

/// One handle per repository port.
#[derive(Clone)]
pub struct Repositories {
    /// Wallet balances.
    pub wallets: Arc<dyn WalletRepo>,
    /// Daily quest sets.
    pub quests: Arc<dyn QuestRepo>,
    /// Owned items.
    pub items: Arc<dyn ItemRepo>,
    /// Payment receipts.
    pub payments: Arc<dyn PaymentRepo>,
}

impl Repositories {
    /// Every port served by the same store.
    pub fn from_store<S>(store: &Arc<S>) -> Self
    where
        S: WalletRepo + QuestRepo + ItemRepo + PaymentRepo + 'static,
    {
        Self {
            wallets: Arc::clone(store) as Arc<dyn WalletRepo>,
            quests: Arc::clone(store) as Arc<dyn QuestRepo>,
            items: Arc::clone(store) as Arc<dyn ItemRepo>,
            payments: Arc::clone(store) as Arc<dyn PaymentRepo>,
        }
    }

    /// A fresh [`MemoryStore`] behind every port.
    pub fn in_memory() -> Self {
        Self::from_store(&Arc::new(MemoryStore::new()))
    }
}

impl core::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// Result of rewarding an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionReceipt {
    /// What the interaction earned.
    pub reward: RewardResult,
    /// Wallet after the credit.
    pub wallet: Wallet,
    /// Quest advanced by the interaction, if any.
    pub quest: Option<QuestProgress>,
}

/// All economy services over a shared catalog, store and clock.
#[derive(Debug, Clone)]
pub struct Economy {
    catalog: Arc<CatalogStore>,
    wallets: WalletLedger,
    quests: QuestEngine,
    ownership: OwnershipStore,
    payments: PaymentReconciler,
}

impl Economy {
    /// Assemble the services.
    pub fn new(
        catalog: Arc<CatalogStore>,
        repos: Repositories,
        clock: Arc<dyn Clock>,
        settings: &EconomySettings,
    ) -> Self {
        let wallets =
            WalletLedger::new(repos.wallets, Arc::clone(&clock), settings.starting_balance);
        let quests = QuestEngine::new(
            Arc::clone(&catalog),
            repos.quests,
            wallets.clone(),
            Arc::clone(&clock),
            settings.daily_quest_count,
        );
        let ownership = OwnershipStore::new(
            Arc::clone(&catalog),
            repos.items,
            wallets.clone(),
            Arc::clone(&clock),
        );
        let payments = PaymentReconciler::new(
            Arc::clone(&catalog),
            repos.payments,
            clock,
            settings.starting_balance,
        );
        Self {
            catalog,
            wallets,
            quests,
            ownership,
            payments,
        }
    }

    /// The catalog.
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// The wallet ledger.
    pub const fn wallets(&self) -> &WalletLedger {
        &self.wallets
    }

    /// The quest engine.
    pub const fn quests(&self) -> &QuestEngine {
        &self.quests
    }

    /// The ownership store.
    pub const fn ownership(&self) -> &OwnershipStore {
        &self.ownership
    }

    /// The payment reconciler.
    pub const fn payments(&self) -> &PaymentReconciler {
        &self.payments
    }

    /// Pay out an interaction and advance the matching quest.
    ///
    /// Unknown actions are rejected before anything is written.
    pub async fn record_interaction(
        &self,
        owner: &OwnerId,
        action: &str,
    ) -> Result<InteractionReceipt, EconomyError> {
        let action = action
            .parse::<InteractionAction>()
            .map_err(|e| EconomyError::Validation(e.to_string()))?;
        let reward = reward_for(action);
        let wallet = self.wallets.credit(owner, reward.koins).await?;
        let quest = self.advance_quest(owner, action.quest_type()).await;
        Ok(InteractionReceipt {
            reward,
            wallet,
            quest,
        })
    }

    /// [`OwnershipStore::purchase`], then advance a `buy_item` quest.
    pub async fn purchase(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<OwnedItem, EconomyError> {
        let item = self.ownership.purchase(owner, catalog_item_id).await?;
        self.advance_quest(owner, QuestType::BuyItem).await;
        Ok(item)
    }

    /// [`OwnershipStore::equip`], then advance the owner's `equip_item` quest.
    pub async fn equip(
        &self,
        owned_item_id: OwnedItemId,
        entity: &EntityId,
        category: ItemCategory,
    ) -> Result<OwnedItem, EconomyError> {
        let item = self.ownership.equip(owned_item_id, entity, category).await?;
        self.advance_quest(&item.owner_id, QuestType::EquipItem).await;
        Ok(item)
    }

    /// Best-effort quest progress. A failure is logged and never undoes the
    /// action that triggered it.
    async fn advance_quest(&self, owner: &OwnerId, quest_type: QuestType) -> Option<QuestProgress> {
        match self.quests.update_progress(owner, quest_type, 1).await {
            Ok(progress) => progress,
            Err(err) => {
                warn!(
                    owner = %owner,
                    quest_type = %quest_type,
                    error = %err,
                    "Quest progress hook failed"
                );
                None
            }
        }
    }
}
