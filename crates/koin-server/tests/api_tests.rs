//! Integration tests for the Koin API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test gets a fresh in-memory economy and a
//! clock frozen on one day.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use koin_catalog::{CatalogStore, builtin};
use koin_economy::payments::SIGNATURE_HEADER;
use koin_economy::{
    Economy, EconomySettings, FixedClock, HmacSignatureVerifier, NoVerification,
    NotificationVerifier, PaymentNotification, Repositories,
};
use koin_server::router::build_router;
use koin_server::state::AppState;
use koin_types::{OwnerId, ProductId};
use serde_json::{Value, json};
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test";

/// Built-in items and tiers, with a quest pool small enough that every
/// daily set contains all of it.
fn test_catalog() -> CatalogStore {
    let templates = builtin::quest_templates()
        .into_iter()
        .filter(|t| matches!(t.id.as_str(), "feed_3" | "wake_1" | "buy_1"))
        .collect();
    CatalogStore::new(builtin::items(), templates, builtin::koin_tiers()).unwrap()
}

fn make_state(verifier: Arc<dyn NotificationVerifier>) -> Arc<AppState> {
    let clock = Arc::new(FixedClock::at_day(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    ));
    let economy = Economy::new(
        Arc::new(test_catalog()),
        Repositories::in_memory(),
        clock,
        &EconomySettings::default(),
    );
    Arc::new(AppState::new(economy, verifier))
}

fn app() -> Router {
    build_router(make_state(Arc::new(NoVerification)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_webhook(
    app: &Router,
    payload: Vec<u8>,
    signature: Option<&str>,
) -> (StatusCode, Value) {
    let mut request =
        Request::post("/webhooks/payments").header("content-type", "application/json");
    if let Some(signature) = signature {
        request = request.header(SIGNATURE_HEADER, signature);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(payload)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn checkout(event: &str, owner: &str, product: &str) -> Vec<u8> {
    let notification = PaymentNotification::checkout_completed(
        event,
        &OwnerId::from(owner),
        &ProductId::from(product),
    );
    serde_json::to_vec(&notification).unwrap()
}

// ---------------------------------------------------------------------------
// Health and catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let (status, json) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn catalog_items_carry_computed_prices() {
    let (status, json) = get(&app(), "/api/catalog/items?category=hat").await;
    assert_eq!(status, StatusCode::OK);

    let items = json["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| item["category"] == "hat"));

    let wizard = items.iter().find(|item| item["id"] == "wizard-hat").unwrap();
    assert_eq!(wizard["base_price"], 10);
    assert_eq!(wizard["price"], 25);
}

#[tokio::test]
async fn catalog_rarity_filter_applies() {
    let (status, json) = get(&app(), "/api/catalog/items?rarity=legendary").await;
    assert_eq!(status, StatusCode::OK);
    let items = json["items"].as_array().unwrap();
    assert!(items.iter().all(|item| item["rarity"] == "legendary"));
    assert!(items.iter().any(|item| item["id"] == "golden-crown"));
}

#[tokio::test]
async fn unknown_category_filter_is_bad_request() {
    let (status, json) = get(&app(), "/api/catalog/items?category=cape").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn catalog_lists_quests_and_tiers() {
    let app = app();
    let (_, quests) = get(&app, "/api/catalog/quests").await;
    assert_eq!(quests["count"], 3);

    let (_, tiers) = get(&app, "/api/catalog/tiers").await;
    let tiers = tiers["tiers"].as_array().unwrap();
    assert!(
        tiers
            .iter()
            .any(|t| t["product_id"] == "prod_koins_starter" && t["koins"] == 500)
    );
}

// ---------------------------------------------------------------------------
// Wallets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wallet_is_created_with_starting_balance() {
    let (status, json) = get(&app(), "/api/wallets/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["owner_id"], "u1");
    assert_eq!(json["balance"], 100);
}

#[tokio::test]
async fn credit_and_debit_move_the_balance() {
    let app = app();
    let (status, json) = post(&app, "/api/wallets/u1/credit", &json!({ "amount": 50 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["balance"], 150);

    let (status, json) = post(&app, "/api/wallets/u1/debit", &json!({ "amount": 120 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["balance"], 30);
}

#[tokio::test]
async fn overdraft_is_conflict_and_leaves_balance() {
    let app = app();
    let (status, json) = post(&app, "/api/wallets/u1/debit", &json!({ "amount": 101 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 100);
}

#[tokio::test]
async fn non_positive_amount_is_bad_request() {
    let (status, _) = post(&app(), "/api/wallets/u1/credit", &json!({ "amount": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Interactions and quests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn interaction_pays_and_advances_quest() {
    let app = app();
    let (_, quests) = get(&app, "/api/quests/u1").await;
    assert_eq!(quests["count"], 3);

    let (status, json) = post(&app, "/api/interactions/u1", &json!({ "action": "feed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reward"]["koins"], 5);
    assert_eq!(json["wallet"]["balance"], 105);
    assert_eq!(json["quest"]["quest_id"], "feed_3");
    assert_eq!(json["quest"]["current"], 1);
}

#[tokio::test]
async fn unknown_interaction_is_rejected_without_credit() {
    let app = app();
    let (status, _) = post(&app, "/api/interactions/u1", &json!({ "action": "dance" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 100);
}

#[tokio::test]
async fn completed_quest_can_be_claimed_once() {
    let app = app();
    get(&app, "/api/quests/u1").await;

    let (status, _) = post(&app, "/api/quests/u1/wake_1/claim", &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = post(
        &app,
        "/api/quests/u1/progress",
        &json!({ "quest_type": "wake_monster" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quest"]["completed"], true);

    let (status, json) = post(&app, "/api/quests/u1/wake_1/claim", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reward"], 5);
    assert_eq!(json["wallet"]["balance"], 105);

    let (status, _) = post(&app, "/api/quests/u1/wake_1/claim", &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, quests) = get(&app, "/api/quests/u1").await;
    let wake = quests["quests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["quest_id"] == "wake_1")
        .unwrap()
        .clone();
    assert_eq!(wake["claimed"], true);
}

#[tokio::test]
async fn progress_without_todays_set_returns_null() {
    let (status, json) = post(
        &app(),
        "/api/quests/u1/progress",
        &json!({ "quest_type": "feed_monster", "increment": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["quest"].is_null());
}

#[tokio::test]
async fn unknown_quest_claim_is_not_found() {
    let app = app();
    get(&app, "/api/quests/u1").await;
    let (status, json) = post(&app, "/api/quests/u1/hug_5/claim", &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn renew_creates_sets_for_known_owners() {
    let app = app();
    get(&app, "/api/quests/u1").await;
    get(&app, "/api/quests/u2").await;

    let (status, json) = post(&app, "/api/quests/renew?day=2024-03-02", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["day"], "2024-03-02");
    assert_eq!(json["owners"], 2);

    let (_, quests) = get(&app, "/api/quests/u1?day=2024-03-02").await;
    assert_eq!(quests["count"], 3);
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[tokio::test]
async fn purchase_debits_and_rejects_second_buy() {
    let app = app();
    get(&app, "/api/quests/u1").await;

    let body = json!({ "catalog_item_id": "wizard-hat" });
    let (status, item) = post(&app, "/api/items/owner/u1/purchase", &body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["owner_id"], "u1");
    assert_eq!(item["category"], "hat");
    assert!(item["equipped_on_entity_id"].is_null());

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 75);

    let (status, json) = post(&app, "/api/items/owner/u1/purchase", &body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (_, owned) = get(&app, "/api/items/owner/u1").await;
    assert_eq!(owned["count"], 1);

    let (_, quests) = get(&app, "/api/quests/u1").await;
    let buy = quests["quests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["quest_id"] == "buy_1")
        .unwrap()
        .clone();
    assert_eq!(buy["completed"], true);
}

#[tokio::test]
async fn unaffordable_purchase_keeps_balance() {
    let app = app();
    let body = json!({ "catalog_item_id": "golden-crown" });
    let (_, price) = get(&app, "/api/catalog/items?rarity=legendary").await;
    let crown = price["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == "golden-crown")
        .unwrap()
        .clone();
    assert!(crown["price"].as_i64().unwrap() > 100);

    let (status, _) = post(&app, "/api/items/owner/u1/purchase", &body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 100);
    let (_, owned) = get(&app, "/api/items/owner/u1").await;
    assert_eq!(owned["count"], 0);
}

#[tokio::test]
async fn unknown_catalog_item_is_not_found() {
    let body = json!({ "catalog_item_id": "no-such-hat" });
    let (status, _) = post(&app(), "/api/items/owner/u1/purchase", &body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn equip_replaces_item_in_same_slot() {
    let app = app();
    let (_, party) = post(
        &app,
        "/api/items/owner/u1/purchase",
        &json!({ "catalog_item_id": "party-hat" }),
    )
    .await;
    let (_, wizard) = post(
        &app,
        "/api/items/owner/u1/purchase",
        &json!({ "catalog_item_id": "wizard-hat" }),
    )
    .await;
    let party_id = party["id"].as_str().unwrap();
    let wizard_id = wizard["id"].as_str().unwrap();

    let equip = json!({ "entity_id": "monster-1", "category": "hat" });
    let (status, json) = post(&app, &format!("/api/items/{party_id}/equip"), &equip).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["equipped_on_entity_id"], "monster-1");

    post(&app, &format!("/api/items/{wizard_id}/equip"), &equip).await;
    let (_, worn) = get(&app, "/api/items/entity/monster-1").await;
    assert_eq!(worn["count"], 1);
    assert_eq!(worn["items"][0]["id"], wizard_id);

    let (status, json) = post(&app, &format!("/api/items/{wizard_id}/unequip"), &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["equipped_on_entity_id"].is_null());
    let (_, worn) = get(&app, "/api/items/entity/monster-1").await;
    assert_eq!(worn["count"], 0);
}

#[tokio::test]
async fn equip_into_wrong_slot_is_bad_request() {
    let app = app();
    let (_, hat) = post(
        &app,
        "/api/items/owner/u1/purchase",
        &json!({ "catalog_item_id": "party-hat" }),
    )
    .await;
    let hat_id = hat["id"].as_str().unwrap();
    let equip = json!({ "entity_id": "monster-1", "category": "glasses" });
    let (status, _) = post(&app, &format!("/api/items/{hat_id}/equip"), &equip).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_owned_item_id_is_bad_request() {
    let equip = json!({ "entity_id": "monster-1", "category": "hat" });
    let (status, _) = post(&app(), "/api/items/not-a-uuid/equip", &equip).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_credits_once_per_event() {
    let app = app();
    let payload = checkout("evt_1", "u1", "prod_koins_starter");

    let (status, json) = post_webhook(&app, payload.clone(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "credited");
    assert_eq!(json["receipt"]["koins"], 500);

    let (status, json) = post_webhook(&app, payload, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "duplicate");

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 600);

    let (status, receipt) = get(&app, "/api/payments/receipts/evt_1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["owner_id"], "u1");
}

#[tokio::test]
async fn unmapped_product_is_acknowledged_without_credit() {
    let app = app();
    let (status, json) = post_webhook(&app, checkout("evt_2", "u1", "prod_unknown"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "unmapped_product");

    let (status, _) = get(&app, "/api/payments/receipts/evt_2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_event_types_are_ignored() {
    let payload = serde_json::to_vec(&json!({
        "id": "evt_3",
        "type": "invoice.paid",
        "data": { "object": { "metadata": {} } }
    }))
    .unwrap();
    let (status, json) = post_webhook(&app(), payload, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "ignored");
}

#[tokio::test]
async fn malformed_webhook_is_bad_request() {
    let (status, _) = post_webhook(&app(), b"not json".to_vec(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhooks_require_a_valid_signature() {
    let verifier = HmacSignatureVerifier::new(WEBHOOK_SECRET).unwrap();
    let payload = checkout("evt_4", "u1", "prod_koins_popular");
    let signature = verifier.sign(&payload).unwrap();
    let app = build_router(make_state(Arc::new(verifier)));

    let (status, _) = post_webhook(&app, payload.clone(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post_webhook(&app, payload.clone(), Some("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 100);

    let (status, json) = post_webhook(&app, payload, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "credited");
    let (_, wallet) = get(&app, "/api/wallets/u1").await;
    assert_eq!(wallet["balance"], 1_300);
}
