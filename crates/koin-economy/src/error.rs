//! Error taxonomy for the economy services.
//!
//! Every public operation returns [`EconomyError`], whose variant names the
//! error kind the calling layer needs: validation and conflict errors are
//! expected and shown to the end user, persistence errors are logged and
//! surfaced as a generic failure. Repository adapters report
//! [`RepoError`], which the services translate.

/// What was looked up and not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// A wallet.
    Wallet,
    /// A daily quest set.
    QuestSet,
    /// A quest inside today's set.
    Quest,
    /// A quest template in the catalog.
    QuestTemplate,
    /// A catalog item.
    CatalogItem,
    /// An owned item.
    OwnedItem,
    /// A payment receipt.
    PaymentReceipt,
}

impl core::fmt::Display for Missing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Wallet => "wallet",
            Self::QuestSet => "quest set",
            Self::Quest => "quest",
            Self::QuestTemplate => "quest template",
            Self::CatalogItem => "catalog item",
            Self::OwnedItem => "owned item",
            Self::PaymentReceipt => "payment receipt",
        })
    }
}

/// Why a state-dependent mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The wallet balance is lower than the debit.
    InsufficientBalance,
    /// The owner already bought this catalog item.
    AlreadyOwned,
    /// The quest reward was already paid out.
    AlreadyClaimed,
    /// The quest has not reached its target yet.
    NotCompleted,
    /// A concurrent equip took the slot first.
    EquipRaceLost,
}

impl core::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::InsufficientBalance => "insufficient balance",
            Self::AlreadyOwned => "already owned",
            Self::AlreadyClaimed => "already claimed",
            Self::NotCompleted => "not completed",
            Self::EquipRaceLost => "equip race lost",
        })
    }
}

/// Errors returned by the economy services.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Malformed input such as a non-positive amount or a blank id.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up.
        kind: Missing,
        /// The identifier that was looked up.
        id: String,
    },

    /// A precondition on current state does not hold.
    #[error("{0}")]
    Conflict(ConflictReason),

    /// A payment notification failed its authenticity check.
    #[error("payment notification rejected: {0}")]
    ExternalVerification(String),

    /// The store is unreachable, or a compensating step itself failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl EconomyError {
    /// Build a [`EconomyError::NotFound`].
    pub fn not_found(kind: Missing, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::ExternalVerification(_) => "external_verification",
            Self::Persistence(_) => "persistence",
        }
    }

    /// The conflict reason, if this is a conflict.
    pub const fn conflict(&self) -> Option<ConflictReason> {
        match self {
            Self::Conflict(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Errors reported by repository adapters.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The store could not be reached or the operation failed there.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    /// A value constraint (range, check) rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<RepoError> for EconomyError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Constraint(msg) => Self::Validation(msg),
            other => Self::Persistence(other.to_string()),
        }
    }
}
