//! Repository ports for the persistent store.
//!
//! These traits are the only abstraction between the services and storage.
//! Every method that depends on a precondition (sufficient balance, quest
//! not yet claimed, exclusive equip slot, event not yet applied) is a
//! single atomic operation in the adapter: the services never read a value
//! and write a decision back in two steps.
//!
//! Implementations: [`MemoryStore`](crate::memory::MemoryStore) in this
//! crate and the `PostgreSQL` stores in `koin-db`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use koin_types::{
    CatalogItemId, DailyQuestSet, EntityId, OwnedItem, OwnedItemId, OwnerId, PaymentEventId,
    PaymentReceipt, QuestId, QuestProgress, QuestType, Wallet,
};

use crate::error::RepoError;

/// Result of a conditional debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The balance covered the amount and was decremented.
    Applied(Wallet),
    /// The balance did not cover the amount; nothing changed.
    Insufficient {
        /// Balance at the time of the attempt.
        balance: i64,
    },
    /// The owner has no wallet yet.
    Missing,
}

/// Result of applying a payment credit exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentApplication {
    /// This call recorded the receipt and credited the wallet.
    Applied(Wallet),
    /// The event was applied before; nothing changed.
    Duplicate(PaymentReceipt),
}

/// Wallet balances, one row per owner.
#[async_trait]
pub trait WalletRepo: Send + Sync {
    /// Fetch a wallet.
    async fn find(&self, owner: &OwnerId) -> Result<Option<Wallet>, RepoError>;

    /// Insert a wallet with `starting_balance` unless one exists, then
    /// return whichever wallet is stored. Safe under concurrent first access.
    async fn insert_or_fetch(
        &self,
        owner: &OwnerId,
        starting_balance: i64,
        now: DateTime<Utc>,
    ) -> Result<Wallet, RepoError>;

    /// Atomically add `amount`. `None` if the owner has no wallet.
    async fn increment(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Wallet>, RepoError>;

    /// Atomically subtract `amount` only if the balance covers it.
    async fn decrement_if_sufficient(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<DebitOutcome, RepoError>;
}

/// Daily quest sets and their embedded progress.
#[async_trait]
pub trait QuestRepo: Send + Sync {
    /// Fetch the set for `(owner, day)`.
    async fn find_set(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<Option<DailyQuestSet>, RepoError>;

    /// Store `set` unless one exists for its `(owner, day)`, then return the
    /// stored set. An existing set is never overwritten.
    async fn insert_set_or_fetch(&self, set: &DailyQuestSet) -> Result<DailyQuestSet, RepoError>;

    /// Advance the first incomplete quest of `quest_type` in the set by
    /// `increment`, clamped to its target, completing it when the target is
    /// reached. Returns the updated progress, or `None` if no quest matched.
    async fn advance_first_incomplete(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_type: QuestType,
        increment: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<QuestProgress>, RepoError>;

    /// Transition `claimed: false -> true` on a completed quest. Returns
    /// `true` only for the call that performed the transition.
    async fn mark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError>;

    /// Undo [`QuestRepo::mark_claimed`] after a failed payout.
    async fn unmark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
    ) -> Result<bool, RepoError>;

    /// Every owner that has ever had a quest set.
    async fn owners(&self) -> Result<Vec<OwnerId>, RepoError>;
}

/// Owned items and their equip state.
#[async_trait]
pub trait ItemRepo: Send + Sync {
    /// Fetch an owned item.
    async fn find(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError>;

    /// Fetch the owner's copy of a catalog item.
    async fn find_owned(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<OwnedItem>, RepoError>;

    /// Insert a new owned item. Fails with [`RepoError::Duplicate`] if the
    /// owner already has this catalog item.
    async fn insert(&self, item: &OwnedItem) -> Result<(), RepoError>;

    /// Within one atomic scope for `(entity, item category)`, unequip every
    /// other item of that category on `entity` and equip `id` on it.
    /// `None` if the item does not exist.
    async fn equip_exclusive(
        &self,
        id: OwnedItemId,
        entity: &EntityId,
    ) -> Result<Option<OwnedItem>, RepoError>;

    /// Clear the item's equip slot. `None` if the item does not exist.
    async fn unequip(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError>;

    /// All items bought by `owner`, oldest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedItem>, RepoError>;

    /// All items currently equipped on `entity`.
    async fn list_by_entity(&self, entity: &EntityId) -> Result<Vec<OwnedItem>, RepoError>;
}

/// Applied payment events.
#[async_trait]
pub trait PaymentRepo: Send + Sync {
    /// Atomically record `receipt` and credit its Koins to the owner's
    /// wallet (creating the wallet with `starting_balance` first if needed).
    /// A receipt already stored under the same event id makes this a no-op.
    async fn apply_once(
        &self,
        receipt: &PaymentReceipt,
        starting_balance: i64,
    ) -> Result<PaymentApplication, RepoError>;

    /// Fetch the receipt for an event.
    async fn find_receipt(
        &self,
        event_id: &PaymentEventId,
    ) -> Result<Option<PaymentReceipt>, RepoError>;
}
