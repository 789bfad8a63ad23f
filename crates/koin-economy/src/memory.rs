//! In-memory implementation of every repository port.
//!
//! All four tables live behind one [`tokio::sync::Mutex`], so each port
//! method is a single critical section with the same all-or-nothing
//! semantics the SQL store gets from conditional updates and transactions.
//! Used by tests and by local development without `PostgreSQL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use koin_types::{
    CatalogItemId, DailyQuestSet, EntityId, OwnedItem, OwnedItemId, OwnerId, PaymentEventId,
    PaymentReceipt, QuestId, QuestProgress, QuestType, Wallet,
};
use tokio::sync::Mutex;

use crate::error::RepoError;
use crate::repo::{DebitOutcome, ItemRepo, PaymentApplication, PaymentRepo, QuestRepo, WalletRepo};

#[derive(Debug, Default)]
struct Tables {
    wallets: BTreeMap<OwnerId, Wallet>,
    quest_sets: BTreeMap<(OwnerId, NaiveDate), DailyQuestSet>,
    items: BTreeMap<OwnedItemId, OwnedItem>,
    receipts: BTreeMap<PaymentEventId, PaymentReceipt>,
}

impl Tables {
    fn wallet_or_insert(
        &mut self,
        owner: &OwnerId,
        starting_balance: i64,
        now: DateTime<Utc>,
    ) -> &mut Wallet {
        self.wallets
            .entry(owner.clone())
            .or_insert_with(|| new_wallet(owner, starting_balance, now))
    }

    fn quest_mut(
        &mut self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
    ) -> Option<&mut QuestProgress> {
        self.quest_sets
            .get_mut(&(owner.clone(), day))?
            .quests
            .iter_mut()
            .find(|q| &q.quest_id == quest_id)
    }
}

fn new_wallet(owner: &OwnerId, starting_balance: i64, now: DateTime<Utc>) -> Wallet {
    Wallet {
        owner_id: owner.clone(),
        balance: starting_balance,
        created_at: now,
        updated_at: now,
    }
}

/// Add `amount` to a wallet, refusing to overflow.
fn add_to_balance(wallet: &mut Wallet, amount: i64, now: DateTime<Utc>) -> Result<(), RepoError> {
    wallet.balance = wallet
        .balance
        .checked_add(amount)
        .ok_or_else(|| RepoError::Constraint(String::from("balance overflow")))?;
    wallet.updated_at = now;
    Ok(())
}

/// Process-local store implementing every repository port.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepo for MemoryStore {
    async fn find(&self, owner: &OwnerId) -> Result<Option<Wallet>, RepoError> {
        Ok(self.tables.lock().await.wallets.get(owner).cloned())
    }

    async fn insert_or_fetch(
        &self,
        owner: &OwnerId,
        starting_balance: i64,
        now: DateTime<Utc>,
    ) -> Result<Wallet, RepoError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.wallet_or_insert(owner, starting_balance, now).clone())
    }

    async fn increment(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Wallet>, RepoError> {
        let mut tables = self.tables.lock().await;
        let Some(wallet) = tables.wallets.get_mut(owner) else {
            return Ok(None);
        };
        add_to_balance(wallet, amount, now)?;
        Ok(Some(wallet.clone()))
    }

    async fn decrement_if_sufficient(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<DebitOutcome, RepoError> {
        let mut tables = self.tables.lock().await;
        let Some(wallet) = tables.wallets.get_mut(owner) else {
            return Ok(DebitOutcome::Missing);
        };
        match wallet.balance.checked_sub(amount) {
            Some(remaining) if remaining >= 0 => {
                wallet.balance = remaining;
                wallet.updated_at = now;
                Ok(DebitOutcome::Applied(wallet.clone()))
            }
            _ => Ok(DebitOutcome::Insufficient {
                balance: wallet.balance,
            }),
        }
    }
}

#[async_trait]
impl QuestRepo for MemoryStore {
    async fn find_set(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<Option<DailyQuestSet>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.quest_sets.get(&(owner.clone(), day)).cloned())
    }

    async fn insert_set_or_fetch(&self, set: &DailyQuestSet) -> Result<DailyQuestSet, RepoError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .quest_sets
            .entry((set.owner_id.clone(), set.day))
            .or_insert_with(|| set.clone());
        Ok(stored.clone())
    }

    async fn advance_first_incomplete(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_type: QuestType,
        increment: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<QuestProgress>, RepoError> {
        let mut tables = self.tables.lock().await;
        let Some(set) = tables.quest_sets.get_mut(&(owner.clone(), day)) else {
            return Ok(None);
        };
        let Some(quest) = set
            .quests
            .iter_mut()
            .find(|q| q.quest_type == quest_type && !q.completed)
        else {
            return Ok(None);
        };
        quest.advance(increment, now);
        Ok(Some(quest.clone()))
    }

    async fn mark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        match tables.quest_mut(owner, day, quest_id) {
            Some(quest) if quest.completed && !quest.claimed => {
                quest.claimed = true;
                quest.claimed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unmark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
    ) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        match tables.quest_mut(owner, day, quest_id) {
            Some(quest) if quest.claimed => {
                quest.claimed = false;
                quest.claimed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn owners(&self) -> Result<Vec<OwnerId>, RepoError> {
        let tables = self.tables.lock().await;
        let mut owners: Vec<OwnerId> =
            tables.quest_sets.keys().map(|(owner, _)| owner.clone()).collect();
        owners.dedup();
        Ok(owners)
    }
}

#[async_trait]
impl ItemRepo for MemoryStore {
    async fn find(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn find_owned(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<OwnedItem>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .values()
            .find(|item| &item.owner_id == owner && &item.catalog_item_id == catalog_item_id)
            .cloned())
    }

    async fn insert(&self, item: &OwnedItem) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables.items.values().any(|existing| {
            existing.owner_id == item.owner_id && existing.catalog_item_id == item.catalog_item_id
        });
        if duplicate || tables.items.contains_key(&item.id) {
            return Err(RepoError::Duplicate(format!(
                "{} already owns {}",
                item.owner_id, item.catalog_item_id
            )));
        }
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn equip_exclusive(
        &self,
        id: OwnedItemId,
        entity: &EntityId,
    ) -> Result<Option<OwnedItem>, RepoError> {
        let mut tables = self.tables.lock().await;
        let Some(category) = tables.items.get(&id).map(|item| item.category) else {
            return Ok(None);
        };
        for other in tables.items.values_mut() {
            if other.id != id
                && other.category == category
                && other.equipped_on_entity_id.as_ref() == Some(entity)
            {
                other.equipped_on_entity_id = None;
            }
        }
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        item.equipped_on_entity_id = Some(entity.clone());
        Ok(Some(item.clone()))
    }

    async fn unequip(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError> {
        let mut tables = self.tables.lock().await;
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        item.equipped_on_entity_id = None;
        Ok(Some(item.clone()))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedItem>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .values()
            .filter(|item| &item.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn list_by_entity(&self, entity: &EntityId) -> Result<Vec<OwnedItem>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .values()
            .filter(|item| item.equipped_on_entity_id.as_ref() == Some(entity))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepo for MemoryStore {
    async fn apply_once(
        &self,
        receipt: &PaymentReceipt,
        starting_balance: i64,
    ) -> Result<PaymentApplication, RepoError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.receipts.get(&receipt.event_id) {
            return Ok(PaymentApplication::Duplicate(existing.clone()));
        }
        // Nothing is written unless the credit fits.
        let mut credited = tables.wallets.get(&receipt.owner_id).cloned().unwrap_or_else(|| {
            new_wallet(&receipt.owner_id, starting_balance, receipt.applied_at)
        });
        add_to_balance(&mut credited, receipt.koins, receipt.applied_at)?;
        tables.wallets.insert(receipt.owner_id.clone(), credited.clone());
        tables.receipts.insert(receipt.event_id.clone(), receipt.clone());
        Ok(PaymentApplication::Applied(credited))
    }

    async fn find_receipt(
        &self,
        event_id: &PaymentEventId,
    ) -> Result<Option<PaymentReceipt>, RepoError> {
        Ok(self.tables.lock().await.receipts.get(event_id).cloned())
    }
}
