//! Payment provider webhook.
//!
//! The raw body is verified before it is parsed, since the signature
//! covers the exact bytes the provider sent. Every verified notification
//! is acknowledged with `200`, including ones that are ignored, so the
//! provider stops retrying them. Only malformed or unverifiable payloads
//! and storage failures produce an error status.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use koin_economy::ReconcileOutcome;
use koin_economy::payments::SIGNATURE_HEADER;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /webhooks/payments`
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.verifier.verify(&body, signature)?;

    let outcome = state.economy.payments().handle_payload(&body).await?;
    let receipt = match &outcome {
        ReconcileOutcome::Credited(receipt) | ReconcileOutcome::Duplicate(receipt) => {
            Some(receipt.clone())
        }
        ReconcileOutcome::Ignored
        | ReconcileOutcome::UnmappedProduct(_)
        | ReconcileOutcome::MissingMetadata => None,
    };

    Ok(Json(serde_json::json!({
        "received": true,
        "outcome": outcome.as_str(),
        "receipt": receipt,
    })))
}
