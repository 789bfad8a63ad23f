//! REST API endpoint handlers.
//!
//! Owner ids arrive already authenticated by the caller; handlers only
//! check that they are well formed.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness |
//! | `GET` | `/api/catalog/items` | Items with computed prices |
//! | `GET` | `/api/catalog/quests` | Quest templates |
//! | `GET` | `/api/catalog/tiers` | Koins tiers |
//! | `GET` | `/api/wallets/{owner}` | Get or create a wallet |
//! | `POST` | `/api/wallets/{owner}/credit` | Credit Koins |
//! | `POST` | `/api/wallets/{owner}/debit` | Debit Koins |
//! | `GET` | `/api/quests/{owner}` | Daily quests |
//! | `POST` | `/api/quests/{owner}/progress` | Advance a quest type |
//! | `POST` | `/api/quests/{owner}/{quest_id}/claim` | Claim a reward |
//! | `POST` | `/api/quests/renew` | Renew every owner's daily set |
//! | `POST` | `/api/interactions/{owner}` | Reward a monster interaction |
//! | `POST` | `/api/items/owner/{owner}/purchase` | Buy a catalog item |
//! | `POST` | `/api/items/{owned_item_id}/equip` | Equip on an entity |
//! | `POST` | `/api/items/{owned_item_id}/unequip` | Unequip |
//! | `GET` | `/api/items/owner/{owner}` | Items owned |
//! | `GET` | `/api/items/entity/{entity}` | Items equipped on an entity |
//! | `GET` | `/api/payments/receipts/{event_id}` | Applied payment receipt |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use koin_catalog::CatalogStore;
use koin_economy::{EconomyError, Missing};
use koin_types::{
    CatalogItem, CatalogItemId, EntityId, ItemCategory, OwnedItemId, OwnerId, PaymentEventId,
    QuestId, QuestType, Rarity,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and query types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/catalog/items`.
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    /// Only items of this category.
    pub category: Option<String>,
    /// Only items of this rarity.
    pub rarity: Option<String>,
}

/// Query parameter selecting a calendar day.
#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// `YYYY-MM-DD`. Defaults to today (UTC).
    pub day: Option<NaiveDate>,
}

/// Body for credit and debit.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Koins to move.
    pub amount: i64,
}

/// Body for `POST /api/quests/{owner}/progress`.
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    /// Quest type to advance.
    pub quest_type: QuestType,
    /// Progress to add, default 1.
    #[serde(default = "default_increment")]
    pub increment: u32,
}

const fn default_increment() -> u32 {
    1
}

/// Body for `POST /api/interactions/{owner}`.
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    /// `feed`, `comfort`, `hug` or `wake`.
    pub action: String,
}

/// Body for `POST /api/items/owner/{owner}/purchase`.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Catalog item to buy.
    pub catalog_item_id: CatalogItemId,
}

/// Body for `POST /api/items/{owned_item_id}/equip`.
#[derive(Debug, Deserialize)]
pub struct EquipRequest {
    /// Entity to equip on.
    pub entity_id: EntityId,
    /// Slot to equip into. Must match the item's category.
    pub category: ItemCategory,
}

/// A catalog item with its computed price.
#[derive(Debug, Serialize)]
pub struct PricedItem<'a> {
    /// The item.
    #[serde(flatten)]
    pub item: &'a CatalogItem,
    /// Final price in Koins.
    pub price: i64,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_owner(raw: String) -> Result<OwnerId, ApiError> {
    let owner = OwnerId::from(raw);
    if owner.is_blank() {
        return Err(ApiError::BadRequest(String::from("owner id is blank")));
    }
    Ok(owner)
}

fn parse_owned_item_id(raw: &str) -> Result<OwnedItemId, ApiError> {
    Uuid::parse_str(raw)
        .map(OwnedItemId::from)
        .map_err(|e| ApiError::BadRequest(format!("invalid owned item id {raw:?}: {e}")))
}

fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    })
    .transpose()
}

fn priced<'a>(
    catalog: &CatalogStore,
    items: &[&'a CatalogItem],
) -> Result<Vec<PricedItem<'a>>, ApiError> {
    items
        .iter()
        .map(|item| {
            let price = catalog.price(item)?;
            Ok(PricedItem { item, price })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Health and catalog
// ---------------------------------------------------------------------------

/// Liveness check.
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// List catalog items, optionally filtered by category and rarity.
#[allow(clippy::unused_async)]
pub async fn list_catalog_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = parse_filter::<ItemCategory>(query.category.as_deref())?;
    let rarity = parse_filter::<Rarity>(query.rarity.as_deref())?;
    let catalog = state.economy.catalog();

    let items: Vec<&CatalogItem> = catalog
        .items()
        .iter()
        .filter(|item| category.is_none_or(|c| item.category == c))
        .filter(|item| rarity.is_none_or(|r| item.rarity == r))
        .collect();
    let items = priced(catalog, &items)?;

    Ok(Json(serde_json::json!({
        "count": items.len(),
        "items": items,
    })))
}

/// List quest templates.
#[allow(clippy::unused_async)]
pub async fn list_quest_templates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let templates = state.economy.catalog().templates();
    Json(serde_json::json!({
        "count": templates.len(),
        "quests": templates,
    }))
}

/// List Koins tiers.
#[allow(clippy::unused_async)]
pub async fn list_tiers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tiers = state.economy.catalog().tiers();
    Json(serde_json::json!({
        "count": tiers.len(),
        "tiers": tiers,
    }))
}

// ---------------------------------------------------------------------------
// Wallets
// ---------------------------------------------------------------------------

/// Get the owner's wallet, creating it on first access.
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let wallet = state.economy.wallets().get_or_create(&owner).await?;
    Ok(Json(wallet))
}

/// Credit the owner's wallet.
pub async fn credit_wallet(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(body): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let wallet = state.economy.wallets().credit(&owner, body.amount).await?;
    Ok(Json(wallet))
}

/// Debit the owner's wallet if the balance covers it.
pub async fn debit_wallet(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(body): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let wallet = state.economy.wallets().debit(&owner, body.amount).await?;
    Ok(Json(wallet))
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// The owner's quests for a day, created on first request.
pub async fn get_quests(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let quests = state.economy.quests();
    let list = match query.day {
        Some(day) => quests.get_daily_quests(&owner, day).await?,
        None => quests.get_todays_quests(&owner).await?,
    };
    Ok(Json(serde_json::json!({
        "owner_id": owner,
        "count": list.len(),
        "quests": list,
    })))
}

/// Advance today's first incomplete quest of a type.
pub async fn update_quest_progress(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(body): Json<ProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let progress = state
        .economy
        .quests()
        .update_progress(&owner, body.quest_type, body.increment)
        .await?;
    Ok(Json(serde_json::json!({ "quest": progress })))
}

/// Claim the reward for one of today's completed quests.
pub async fn claim_quest(
    State(state): State<Arc<AppState>>,
    Path((owner, quest_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let quest_id = QuestId::from(quest_id);
    let reward = state.economy.quests().claim_reward(&owner, &quest_id).await?;
    let wallet = state.economy.wallets().get_or_create(&owner).await?;
    Ok(Json(serde_json::json!({
        "quest_id": quest_id,
        "reward": reward,
        "wallet": wallet,
    })))
}

/// Ensure every known owner has a quest set for the day.
pub async fn renew_quests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let quests = state.economy.quests();
    let day = query.day.unwrap_or_else(|| quests.today());
    let owners = quests.renew_all(day).await?;
    Ok(Json(serde_json::json!({
        "day": day,
        "owners": owners,
    })))
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// Reward a monster interaction and advance the matching quest.
pub async fn record_interaction(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(body): Json<InteractionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let receipt = state.economy.record_interaction(&owner, &body.action).await?;
    Ok(Json(receipt))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Buy a catalog item.
pub async fn purchase_item(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(body): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let item = state.economy.purchase(&owner, &body.catalog_item_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Equip an owned item on an entity.
pub async fn equip_item(
    State(state): State<Arc<AppState>>,
    Path(owned_item_id): Path<String>,
    Json(body): Json<EquipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_owned_item_id(&owned_item_id)?;
    let item = state
        .economy
        .equip(id, &body.entity_id, body.category)
        .await?;
    Ok(Json(item))
}

/// Take an owned item off its entity.
pub async fn unequip_item(
    State(state): State<Arc<AppState>>,
    Path(owned_item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_owned_item_id(&owned_item_id)?;
    let item = state.economy.ownership().unequip(id).await?;
    Ok(Json(item))
}

/// Items bought by an owner.
pub async fn list_owner_items(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = parse_owner(owner)?;
    let items = state.economy.ownership().list_by_owner(&owner).await?;
    Ok(Json(serde_json::json!({
        "count": items.len(),
        "items": items,
    })))
}

/// Items currently equipped on an entity.
pub async fn list_entity_items(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .economy
        .ownership()
        .list_by_entity(&EntityId::from(entity))
        .await?;
    Ok(Json(serde_json::json!({
        "count": items.len(),
        "items": items,
    })))
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// The receipt recorded for an applied payment event.
pub async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = PaymentEventId::from(event_id);
    let receipt = state
        .economy
        .payments()
        .receipt(&event_id)
        .await?
        .ok_or_else(|| EconomyError::not_found(Missing::PaymentReceipt, event_id.as_str()))?;
    Ok(Json(receipt))
}
