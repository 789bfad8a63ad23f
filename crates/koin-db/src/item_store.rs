//! `owned_items` table: [`ItemRepo`] for [`PgStore`].
//!
//! Equipping runs in one transaction holding an advisory lock on
//! `(entity, category)`. The partial unique index on
//! `(equipped_on_entity_id, category)` backs it up: a write that would put
//! two items in one slot fails with a unique violation instead.

use async_trait::async_trait;
use koin_economy::{ItemRepo, RepoError};
use koin_types::{CatalogItemId, EntityId, OwnedItem, OwnedItemId, OwnerId};
use uuid::Uuid;

use crate::error::DbError;
use crate::store::{OwnedItemRow, PgStore, convert_all};

/// Columns selected for an [`OwnedItemRow`].
const ITEM_COLUMNS: &str =
    "id, owner_id, catalog_item_id, category, equipped_on_entity_id, acquired_at";

impl PgStore {
    async fn item_row(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, DbError> {
        let row = sqlx::query_as::<_, OwnedItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM owned_items WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        row.map(OwnedItem::try_from).transpose()
    }

    async fn owned_copy(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<OwnedItem>, DbError> {
        let row = sqlx::query_as::<_, OwnedItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM owned_items WHERE owner_id = $1 AND catalog_item_id = $2"
        ))
        .bind(owner.as_str())
        .bind(catalog_item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(OwnedItem::try_from).transpose()
    }

    async fn insert_item(&self, item: &OwnedItem) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO owned_items
                (id, owner_id, catalog_item_id, category, equipped_on_entity_id, acquired_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(item.id))
        .bind(item.owner_id.as_str())
        .bind(item.catalog_item_id.as_str())
        .bind(item.category.as_str())
        .bind(item.equipped_on_entity_id.as_ref().map(EntityId::as_str))
        .bind(item.acquired_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn equip_in_slot(
        &self,
        id: OwnedItemId,
        entity: &EntityId,
    ) -> Result<Option<OwnedItem>, DbError> {
        let mut tx = self.pool.begin().await?;

        let category: Option<String> =
            sqlx::query_scalar(r"SELECT category FROM owned_items WHERE id = $1")
                .bind(Uuid::from(id))
                .fetch_optional(&mut *tx)
                .await?;
        let Some(category) = category else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(r"SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{entity}:{category}"))
            .execute(&mut *tx)
            .await?;

        let displaced = sqlx::query(
            r"UPDATE owned_items
              SET equipped_on_entity_id = NULL
              WHERE equipped_on_entity_id = $1 AND category = $2 AND id <> $3",
        )
        .bind(entity.as_str())
        .bind(&category)
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query_as::<_, OwnedItemRow>(&format!(
            "UPDATE owned_items
             SET equipped_on_entity_id = $2
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(entity.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(owned_item = %id, entity = %entity, %category, displaced, "Equipped item");
        row.map(OwnedItem::try_from).transpose()
    }

    async fn clear_slot(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, DbError> {
        let row = sqlx::query_as::<_, OwnedItemRow>(&format!(
            "UPDATE owned_items
             SET equipped_on_entity_id = NULL
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        row.map(OwnedItem::try_from).transpose()
    }

    async fn items_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Vec<OwnedItem>, DbError> {
        let rows = sqlx::query_as::<_, OwnedItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM owned_items WHERE {column} = $1 ORDER BY acquired_at, id"
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}

#[async_trait]
impl ItemRepo for PgStore {
    async fn find(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError> {
        Ok(self.item_row(id).await?)
    }

    async fn find_owned(
        &self,
        owner: &OwnerId,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<OwnedItem>, RepoError> {
        Ok(self.owned_copy(owner, catalog_item_id).await?)
    }

    async fn insert(&self, item: &OwnedItem) -> Result<(), RepoError> {
        Ok(self.insert_item(item).await?)
    }

    async fn equip_exclusive(
        &self,
        id: OwnedItemId,
        entity: &EntityId,
    ) -> Result<Option<OwnedItem>, RepoError> {
        Ok(self.equip_in_slot(id, entity).await?)
    }

    async fn unequip(&self, id: OwnedItemId) -> Result<Option<OwnedItem>, RepoError> {
        Ok(self.clear_slot(id).await?)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedItem>, RepoError> {
        Ok(self.items_where("owner_id", owner.as_str()).await?)
    }

    async fn list_by_entity(&self, entity: &EntityId) -> Result<Vec<OwnedItem>, RepoError> {
        Ok(self
            .items_where("equipped_on_entity_id", entity.as_str())
            .await?)
    }
}
