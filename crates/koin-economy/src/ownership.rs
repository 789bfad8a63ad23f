//! Item ownership: purchases and equip slots.
//!
//! A purchase is a debit followed by an insert. If the insert fails after
//! the debit went through, the debit is refunded before the error is
//! returned, so the caller never pays for an item it does not get.
//!
//! Equip exclusivity is keyed on the category stored on the owned item,
//! which is copied from the catalog at purchase time.

use std::sync::Arc;

use koin_catalog::CatalogStore;
use koin_types::{CatalogItemId, EntityId, ItemCategory, OwnedItem, OwnedItemId, OwnerId};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::{ConflictReason, EconomyError, Missing, RepoError};
use crate::repo::ItemRepo;
use crate::wallet::{WalletLedger, validate_owner};

/// Tracks purchased items and which entity wears each one.
#[derive(Clone)]
pub struct OwnershipStore {
    catalog: Arc<CatalogStore>,
    repo: Arc<dyn ItemRepo>,
    wallet: WalletLedger,
    clock: Arc<dyn Clock>,
}

impl OwnershipStore {
    /// Create an ownership store that debits purchases from `wallet`.
    pub fn new(
        catalog: Arc<CatalogStore>,
        repo: Arc<dyn ItemRepo>,
        wallet: WalletLedger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            repo,
            wallet,
            clock,
        }
    }

    /// Buy a catalog item for `owner`.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an unknown catalog item.
    /// - [`ConflictReason::AlreadyOwned`] if the owner has the item; the
    ///   wallet is not touched.
    /// - [`ConflictReason::InsufficientBalance`] if the wallet cannot pay.
    /// - [`EconomyError::Persistence`] if the item could not be stored; the
    ///   price has been refunded unless the refund failed as well.
    pub async fn purchase(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<OwnedItem, EconomyError> {
        validate_owner(owner)?;
        let item = self
            .catalog
            .item_by_id(catalog_item_id)
            .ok_or_else(|| EconomyError::not_found(Missing::CatalogItem, catalog_item_id))?;
        let price = self
            .catalog
            .price(item)
            .map_err(|e| EconomyError::Validation(e.to_string()))?;

        if self.repo.find_owned(owner, catalog_item_id).await?.is_some() {
            return Err(EconomyError::Conflict(ConflictReason::AlreadyOwned));
        }

        if price > 0 {
            self.wallet.debit(owner, price).await?;
        }

        let owned = OwnedItem {
            id: OwnedItemId::new(),
            catalog_item_id: catalog_item_id.clone(),
            owner_id: owner.clone(),
            category: item.category,
            equipped_on_entity_id: None,
            acquired_at: self.clock.now(),
        };

        if let Err(insert_err) = self.repo.insert(&owned).await {
            if price > 0 {
                self.refund(owner, price, &insert_err).await?;
            }
            return Err(match insert_err {
                RepoError::Duplicate(_) => EconomyError::Conflict(ConflictReason::AlreadyOwned),
                other => EconomyError::from(other),
            });
        }

        info!(
            owner = %owner,
            item = %catalog_item_id,
            owned_item = %owned.id,
            price,
            "Item purchased"
        );
        Ok(owned)
    }

    /// Give back a purchase debit after the ownership insert failed.
    async fn refund(
        &self,
        owner: &OwnerId,
        price: i64,
        cause: &RepoError,
    ) -> Result<(), EconomyError> {
        warn!(owner = %owner, price, error = %cause, "Ownership insert failed, refunding");
        if let Err(refund_err) = self.wallet.credit(owner, price).await {
            error!(
                owner = %owner,
                price,
                error = %refund_err,
                "Refund failed after ownership insert failure"
            );
            return Err(EconomyError::Persistence(format!(
                "purchase failed ({cause}) and refund failed ({refund_err})"
            )));
        }
        Ok(())
    }

    /// Equip an owned item on `entity`, displacing whatever item of the
    /// same category the entity was wearing.
    ///
    /// `category` must match the item's own category.
    pub async fn equip(
        &self,
        owned_item_id: OwnedItemId,
        entity: &EntityId,
        category: ItemCategory,
    ) -> Result<OwnedItem, EconomyError> {
        if entity.is_blank() {
            return Err(EconomyError::Validation(String::from("entity id is blank")));
        }
        let item = self.find(owned_item_id).await?;
        if item.category != category {
            return Err(EconomyError::Validation(format!(
                "item {owned_item_id} is a {}, not a {category}",
                item.category
            )));
        }

        let equipped = match self.repo.equip_exclusive(owned_item_id, entity).await {
            Ok(Some(equipped)) => equipped,
            Ok(None) => return Err(EconomyError::not_found(Missing::OwnedItem, owned_item_id)),
            Err(RepoError::Duplicate(_)) => {
                return Err(EconomyError::Conflict(ConflictReason::EquipRaceLost));
            }
            Err(other) => return Err(other.into()),
        };
        info!(owned_item = %owned_item_id, entity = %entity, category = %category, "Item equipped");
        Ok(equipped)
    }

    /// Take an item off whatever entity wears it. Idempotent.
    pub async fn unequip(&self, owned_item_id: OwnedItemId) -> Result<OwnedItem, EconomyError> {
        let item = self
            .repo
            .unequip(owned_item_id)
            .await?
            .ok_or_else(|| EconomyError::not_found(Missing::OwnedItem, owned_item_id))?;
        info!(owned_item = %owned_item_id, "Item unequipped");
        Ok(item)
    }

    /// Fetch one owned item.
    pub async fn find(&self, owned_item_id: OwnedItemId) -> Result<OwnedItem, EconomyError> {
        self.repo
            .find(owned_item_id)
            .await?
            .ok_or_else(|| EconomyError::not_found(Missing::OwnedItem, owned_item_id))
    }

    /// Every item `owner` has bought.
    pub async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedItem>, EconomyError> {
        validate_owner(owner)?;
        Ok(self.repo.list_by_owner(owner).await?)
    }

    /// Every item currently equipped on `entity`.
    pub async fn list_by_entity(&self, entity: &EntityId) -> Result<Vec<OwnedItem>, EconomyError> {
        Ok(self.repo.list_by_entity(entity).await?)
    }
}

impl core::fmt::Debug for OwnershipStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwnershipStore").finish_non_exhaustive()
    }
}
