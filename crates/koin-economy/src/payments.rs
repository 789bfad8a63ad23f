//! Payment reconciliation: turns processor notifications into Koins.
//!
//! Every applied event leaves a [`PaymentReceipt`] keyed by the processor's
//! event id. The receipt and the wallet credit are written together by
//! [`PaymentRepo::apply_once`], so redelivered events credit nothing.
//!
//! Authenticity is checked by a [`NotificationVerifier`] before a payload
//! reaches the reconciler.

use std::collections::BTreeMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use koin_catalog::CatalogStore;
use koin_types::{OwnerId, PaymentEventId, PaymentReceipt, ProductId};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::EconomyError;
use crate::repo::{PaymentApplication, PaymentRepo};

/// Notification type that credits a wallet.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Header carrying the hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "koin-signature";

// ---------------------------------------------------------------------------
// Notification payload
// ---------------------------------------------------------------------------

/// A webhook notification from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    /// Processor event id, the idempotency key.
    pub id: PaymentEventId,
    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event body.
    #[serde(default)]
    pub data: NotificationData,
}

/// `data` envelope of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    /// The object the event is about.
    #[serde(default)]
    pub object: NotificationObject,
}

/// The checkout session (or other object) an event refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationObject {
    /// Free-form metadata attached when the checkout was created.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentNotification {
    /// Build a completed-checkout notification.
    pub fn checkout_completed(
        id: impl Into<PaymentEventId>,
        owner: &OwnerId,
        product: &ProductId,
    ) -> Self {
        let metadata = BTreeMap::from([
            (String::from("userId"), owner.to_string()),
            (String::from("productId"), product.to_string()),
        ]);
        Self {
            id: id.into(),
            kind: String::from(CHECKOUT_COMPLETED),
            data: NotificationData {
                object: NotificationObject { metadata },
            },
        }
    }

    /// Whether this event should credit a wallet.
    pub fn is_checkout_completed(&self) -> bool {
        self.kind == CHECKOUT_COMPLETED
    }

    /// Buyer from metadata. `userId` wins over `ownerId`.
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.metadata_value("userId")
            .or_else(|| self.metadata_value("ownerId"))
            .map(OwnerId::from)
    }

    /// Product from metadata.
    pub fn product_id(&self) -> Option<ProductId> {
        self.metadata_value("productId").map(ProductId::from)
    }

    fn metadata_value(&self, key: &str) -> Option<&str> {
        self.data
            .object
            .metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to a notification. Every variant is acknowledged to the
/// sender; only errors ask it to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The wallet was credited by this delivery.
    Credited(PaymentReceipt),
    /// The event was applied by an earlier delivery.
    Duplicate(PaymentReceipt),
    /// Not a completed checkout.
    Ignored,
    /// The product is not sold as a Koins tier.
    UnmappedProduct(ProductId),
    /// The owner or product is missing from the metadata.
    MissingMetadata,
}

impl ReconcileOutcome {
    /// Short machine-readable name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credited(_) => "credited",
            Self::Duplicate(_) => "duplicate",
            Self::Ignored => "ignored",
            Self::UnmappedProduct(_) => "unmapped_product",
            Self::MissingMetadata => "missing_metadata",
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Checks that a raw notification really came from the processor.
pub trait NotificationVerifier: Send + Sync {
    /// Accept or reject `payload` given the signature header, if any.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), EconomyError>;
}

/// Accepts everything. For local development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerification;

impl NotificationVerifier for NoVerification {
    fn verify(&self, _payload: &[u8], _signature: Option<&str>) -> Result<(), EconomyError> {
        Ok(())
    }
}

/// Verifies a hex HMAC-SHA256 of the raw body under a shared secret.
#[derive(Clone)]
pub struct HmacSignatureVerifier {
    key: Vec<u8>,
}

impl HmacSignatureVerifier {
    /// Create a verifier for `secret`.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, EconomyError> {
        let key = secret.into();
        if key.is_empty() {
            return Err(EconomyError::Validation(String::from(
                "webhook secret cannot be empty",
            )));
        }
        Ok(Self { key })
    }

    fn mac(&self) -> Result<Hmac<Sha256>, EconomyError> {
        Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|e| EconomyError::ExternalVerification(e.to_string()))
    }

    /// Hex signature of `payload`, as the processor would send it.
    pub fn sign(&self, payload: &[u8]) -> Result<String, EconomyError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl NotificationVerifier for HmacSignatureVerifier {
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), EconomyError> {
        let signature = signature
            .ok_or_else(|| EconomyError::ExternalVerification(String::from("signature missing")))?;
        let signature = hex::decode(signature.trim())
            .map_err(|e| EconomyError::ExternalVerification(format!("signature is not hex: {e}")))?;
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&signature)
            .map_err(|e| EconomyError::ExternalVerification(e.to_string()))
    }
}

impl core::fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HmacSignatureVerifier").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Credits wallets for completed checkouts, once per event.
#[derive(Clone)]
pub struct PaymentReconciler {
    catalog: Arc<CatalogStore>,
    repo: Arc<dyn PaymentRepo>,
    clock: Arc<dyn Clock>,
    starting_balance: i64,
}

impl PaymentReconciler {
    /// Create a reconciler. Wallets first seen here open with
    /// `starting_balance` before the purchase is credited.
    pub fn new(
        catalog: Arc<CatalogStore>,
        repo: Arc<dyn PaymentRepo>,
        clock: Arc<dyn Clock>,
        starting_balance: i64,
    ) -> Self {
        Self {
            catalog,
            repo,
            clock,
            starting_balance,
        }
    }

    /// Parse and handle a raw, already verified JSON payload.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<ReconcileOutcome, EconomyError> {
        let notification: PaymentNotification = serde_json::from_slice(payload)
            .map_err(|e| EconomyError::Validation(format!("malformed notification: {e}")))?;
        self.handle_notification(&notification).await
    }

    /// Apply a verified notification.
    pub async fn handle_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome, EconomyError> {
        let event = &notification.id;
        if event.is_blank() {
            return Err(EconomyError::Validation(String::from("event id is blank")));
        }
        if !notification.is_checkout_completed() {
            debug!(event = %event, kind = %notification.kind, "Notification ignored");
            return Ok(ReconcileOutcome::Ignored);
        }

        let (Some(owner), Some(product)) = (notification.owner_id(), notification.product_id())
        else {
            warn!(event = %event, "Checkout notification without owner or product metadata");
            return Ok(ReconcileOutcome::MissingMetadata);
        };

        let Some(tier) = self.catalog.tier_for_product(&product) else {
            warn!(event = %event, product = %product, "No Koins tier for product");
            return Ok(ReconcileOutcome::UnmappedProduct(product));
        };

        let receipt = PaymentReceipt {
            event_id: event.clone(),
            owner_id: owner,
            product_id: product,
            koins: tier.koins,
            applied_at: self.clock.now(),
        };

        match self.repo.apply_once(&receipt, self.starting_balance).await? {
            PaymentApplication::Applied(wallet) => {
                info!(
                    event = %event,
                    owner = %receipt.owner_id,
                    koins = receipt.koins,
                    balance = wallet.balance,
                    "Payment credited"
                );
                Ok(ReconcileOutcome::Credited(receipt))
            }
            PaymentApplication::Duplicate(existing) => {
                info!(event = %event, "Payment already applied");
                Ok(ReconcileOutcome::Duplicate(existing))
            }
        }
    }

    /// The receipt for an applied event, if any.
    pub async fn receipt(
        &self,
        event_id: &PaymentEventId,
    ) -> Result<Option<PaymentReceipt>, EconomyError> {
        Ok(self.repo.find_receipt(event_id).await?)
    }
}

impl core::fmt::Debug for PaymentReconciler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PaymentReconciler")
            .field("starting_balance", &self.starting_balance)
            .finish_non_exhaustive()
    }
}
