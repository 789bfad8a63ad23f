//! Error types for the `koin-catalog` crate.
//!
//! Catalog data is validated once when it is loaded; lookups afterwards
//! return `Option` rather than errors.

use koin_types::{CatalogItemId, QuestId};

/// Errors that can occur while loading or validating catalog data.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two definitions of the same kind share an identifier.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId {
        /// Which table the duplicate was found in.
        kind: &'static str,
        /// The repeated identifier.
        id: String,
    },

    /// A quest template has a target of zero.
    #[error("quest {0} must have a target of at least 1")]
    InvalidQuestTarget(QuestId),

    /// A price, reward or tier amount is out of range.
    #[error("{what} for {id} must be {constraint}, got {value}")]
    InvalidAmount {
        /// Which amount is wrong.
        what: &'static str,
        /// The definition it belongs to.
        id: String,
        /// Human-readable constraint.
        constraint: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Applying the rarity multiplier does not fit in an `i64`.
    #[error("price overflow for item {0}")]
    PriceOverflow(CatalogItemId),

    /// Failed to read a catalog file from disk.
    #[error("failed to read catalog file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse catalog YAML.
    #[error("failed to parse catalog YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for CatalogError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}
