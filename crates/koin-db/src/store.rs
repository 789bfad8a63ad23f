//! [`PgStore`] and the row types shared by its repository implementations.
//!
//! Identifiers and enums are stored as `TEXT` in their wire spelling and
//! parsed back on read; a value that no longer parses is reported as
//! [`DbError::Decode`].

use chrono::{DateTime, NaiveDate, Utc};
use koin_types::{
    CatalogItemId, EntityId, OwnedItem, OwnedItemId, OwnerId, PaymentEventId, PaymentReceipt,
    ProductId, QuestId, QuestProgress, Wallet,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Repository adapter over a `PostgreSQL` pool.
///
/// Implements [`WalletRepo`](koin_economy::WalletRepo),
/// [`QuestRepo`](koin_economy::QuestRepo),
/// [`ItemRepo`](koin_economy::ItemRepo) and
/// [`PaymentRepo`](koin_economy::PaymentRepo). Cloning is cheap.
#[derive(Debug, Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert a `u32` counter to an `INTEGER` bind value.
pub(crate) fn to_db_int(value: u32, what: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|e| DbError::OutOfRange(format!("{what} {value}: {e}")))
}

/// Convert an `INTEGER` column back to a `u32` counter.
pub(crate) fn from_db_int(value: i32, what: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::Decode(format!("{what} {value}: {e}")))
}

/// Parse a `TEXT` column holding an enum's wire spelling.
pub(crate) fn parse_text<T>(value: &str) -> Result<T, DbError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value.parse().map_err(|e: T::Err| DbError::Decode(e.to_string()))
}

/// A row from the `wallets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    /// Owner identifier.
    pub owner_id: String,
    /// Current balance.
    pub balance: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Self {
            owner_id: OwnerId::from(row.owner_id),
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `daily_quest_sets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestSetRow {
    /// Owner identifier.
    pub owner_id: String,
    /// Calendar day.
    pub day: NaiveDate,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A row from the `quest_progress` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestProgressRow {
    /// Template identifier.
    pub quest_id: String,
    /// Quest type, wire spelling.
    pub quest_type: String,
    /// Progress so far.
    pub current: i32,
    /// Progress needed.
    pub target: i32,
    /// Completion flag.
    pub completed: bool,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
    /// Claim flag.
    pub claimed: bool,
    /// Claim time.
    pub claimed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuestProgressRow> for QuestProgress {
    type Error = DbError;

    fn try_from(row: QuestProgressRow) -> Result<Self, Self::Error> {
        Ok(Self {
            quest_type: parse_text(&row.quest_type)?,
            current: from_db_int(row.current, "current")?,
            target: from_db_int(row.target, "target")?,
            quest_id: QuestId::from(row.quest_id),
            completed: row.completed,
            completed_at: row.completed_at,
            claimed: row.claimed,
            claimed_at: row.claimed_at,
        })
    }
}

/// A row from the `owned_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedItemRow {
    /// Record identifier.
    pub id: Uuid,
    /// Buyer.
    pub owner_id: String,
    /// Catalog item.
    pub catalog_item_id: String,
    /// Item category, wire spelling.
    pub category: String,
    /// Entity wearing the item.
    pub equipped_on_entity_id: Option<String>,
    /// Purchase time.
    pub acquired_at: DateTime<Utc>,
}

impl TryFrom<OwnedItemRow> for OwnedItem {
    type Error = DbError;

    fn try_from(row: OwnedItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            category: parse_text(&row.category)?,
            id: OwnedItemId::from(row.id),
            catalog_item_id: CatalogItemId::from(row.catalog_item_id),
            owner_id: OwnerId::from(row.owner_id),
            equipped_on_entity_id: row.equipped_on_entity_id.map(EntityId::from),
            acquired_at: row.acquired_at,
        })
    }
}

/// A row from the `payment_receipts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReceiptRow {
    /// Processor event id.
    pub event_id: String,
    /// Credited owner.
    pub owner_id: String,
    /// Purchased product.
    pub product_id: String,
    /// Koins credited.
    pub koins: i64,
    /// Application time.
    pub applied_at: DateTime<Utc>,
}

impl From<ReceiptRow> for PaymentReceipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            event_id: PaymentEventId::from(row.event_id),
            owner_id: OwnerId::from(row.owner_id),
            product_id: ProductId::from(row.product_id),
            koins: row.koins,
            applied_at: row.applied_at,
        }
    }
}

/// Collect fallible row conversions.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DbError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use koin_types::{ItemCategory, QuestType};

    use super::*;

    #[test]
    fn progress_row_decodes_wire_spelling() {
        let row = QuestProgressRow {
            quest_id: String::from("feed_3"),
            quest_type: String::from("feed_monster"),
            current: 2,
            target: 3,
            completed: false,
            completed_at: None,
            claimed: false,
            claimed_at: None,
        };
        let progress = QuestProgress::try_from(row).unwrap();
        assert_eq!(progress.quest_type, QuestType::FeedMonster);
        assert_eq!(progress.current, 2);
    }

    #[test]
    fn unknown_category_is_a_decode_error() {
        let row = OwnedItemRow {
            id: Uuid::now_v7(),
            owner_id: String::from("u1"),
            catalog_item_id: String::from("party-hat"),
            category: String::from("cape"),
            equipped_on_entity_id: None,
            acquired_at: Utc::now(),
        };
        assert!(matches!(OwnedItem::try_from(row.clone()), Err(DbError::Decode(_))));

        let row = OwnedItemRow {
            category: String::from("hat"),
            ..row
        };
        assert_eq!(OwnedItem::try_from(row).unwrap().category, ItemCategory::Hat);
    }

    #[test]
    fn negative_counters_are_rejected() {
        assert!(from_db_int(-1, "current").is_err());
        assert_eq!(to_db_int(7, "target").unwrap(), 7);
        assert!(to_db_int(u32::MAX, "target").is_err());
    }
}
