//! The read-only catalog: items, quest templates and Koins tiers.
//!
//! A [`CatalogStore`] is validated once at construction (unique ids,
//! non-negative prices and rewards, computable prices, quest targets of at
//! least one) and is immutable afterwards, so it can be shared freely
//! behind an `Arc`.

use std::collections::BTreeSet;
use std::path::Path;

use koin_types::{
    CatalogItem, CatalogItemId, ItemCategory, KoinTier, ProductId, QuestId, QuestTemplate, Rarity,
};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::builtin;
use crate::error::CatalogError;
use crate::pricing;

/// On-disk catalog layout. Every section is optional and falls back to the
/// built-in table when absent.
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Option<Vec<CatalogItem>>,
    #[serde(default)]
    quests: Option<Vec<QuestTemplate>>,
    #[serde(default)]
    tiers: Option<Vec<KoinTier>>,
}

/// Static definitions of purchasable items, quest templates and Koins tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStore {
    items: Vec<CatalogItem>,
    templates: Vec<QuestTemplate>,
    tiers: Vec<KoinTier>,
}

impl CatalogStore {
    /// Build a catalog from explicit tables.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if any table fails validation.
    pub fn new(
        items: Vec<CatalogItem>,
        templates: Vec<QuestTemplate>,
        tiers: Vec<KoinTier>,
    ) -> Result<Self, CatalogError> {
        validate_items(&items)?;
        validate_templates(&templates)?;
        validate_tiers(&tiers)?;

        tracing::debug!(
            items = items.len(),
            templates = templates.len(),
            tiers = tiers.len(),
            "Catalog loaded"
        );

        Ok(Self {
            items,
            templates,
            tiers,
        })
    }

    /// The catalog shipped with the application.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the built-in tables are inconsistent.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin::items(), builtin::quest_templates(), builtin::koin_tiers())
    }

    /// Parse a catalog from YAML. Missing sections use the built-in tables.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] for malformed YAML, or a validation
    /// error for inconsistent tables.
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yml::from_str(yaml)?;
        Self::new(
            file.items.unwrap_or_else(builtin::items),
            file.quests.unwrap_or_else(builtin::quest_templates),
            file.tiers.unwrap_or_else(builtin::koin_tiers),
        )
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`CatalogStore::parse`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Replace the Koins tier table.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the tiers fail validation.
    pub fn with_tiers(mut self, tiers: Vec<KoinTier>) -> Result<Self, CatalogError> {
        validate_tiers(&tiers)?;
        self.tiers = tiers;
        Ok(self)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// All catalog items in definition order.
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Look up an item by id.
    pub fn item_by_id(&self, id: &CatalogItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// All items in a category.
    pub fn items_by_category(&self, category: ItemCategory) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| item.category == category).collect()
    }

    /// All items of a rarity tier.
    pub fn items_by_rarity(&self, rarity: Rarity) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| item.rarity == rarity).collect()
    }

    /// Final price of an item, see [`pricing::price`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PriceOverflow`] if the price does not fit.
    pub fn price(&self, item: &CatalogItem) -> Result<i64, CatalogError> {
        pricing::price(item)
    }

    // =========================================================================
    // Quest templates
    // =========================================================================

    /// All quest templates in definition order.
    pub fn templates(&self) -> &[QuestTemplate] {
        &self.templates
    }

    /// Look up a quest template by id.
    pub fn template_by_id(&self, id: &QuestId) -> Option<&QuestTemplate> {
        self.templates.iter().find(|template| &template.id == id)
    }

    /// Pick `n` distinct templates uniformly at random, without
    /// replacement. Returns every template if the pool has fewer than `n`.
    pub fn sample_quest_templates(&self, n: usize) -> Vec<QuestTemplate> {
        self.sample_quest_templates_with(&mut rand::rng(), n)
    }

    /// [`CatalogStore::sample_quest_templates`] with a caller-supplied RNG.
    pub fn sample_quest_templates_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> Vec<QuestTemplate> {
        self.templates.choose_multiple(rng, n).cloned().collect()
    }

    // =========================================================================
    // Koins tiers
    // =========================================================================

    /// All Koins tiers.
    pub fn tiers(&self) -> &[KoinTier] {
        &self.tiers
    }

    /// The tier sold under an external product identifier.
    pub fn tier_for_product(&self, product_id: &ProductId) -> Option<&KoinTier> {
        self.tiers.iter().find(|tier| &tier.product_id == product_id)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Fail on the first identifier seen twice.
fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_owned(),
            });
        }
    }
    Ok(())
}

fn validate_items(items: &[CatalogItem]) -> Result<(), CatalogError> {
    ensure_unique("item", items.iter().map(|item| item.id.as_str()))?;
    for item in items {
        if item.base_price < 0 {
            return Err(CatalogError::InvalidAmount {
                what: "base price",
                id: item.id.to_string(),
                constraint: "non-negative",
                value: item.base_price,
            });
        }
        pricing::price(item)?;
    }
    Ok(())
}

fn validate_templates(templates: &[QuestTemplate]) -> Result<(), CatalogError> {
    ensure_unique("quest", templates.iter().map(|t| t.id.as_str()))?;
    for template in templates {
        if template.target == 0 {
            return Err(CatalogError::InvalidQuestTarget(template.id.clone()));
        }
        if template.reward <= 0 {
            return Err(CatalogError::InvalidAmount {
                what: "quest reward",
                id: template.id.to_string(),
                constraint: "positive",
                value: template.reward,
            });
        }
    }
    Ok(())
}

fn validate_tiers(tiers: &[KoinTier]) -> Result<(), CatalogError> {
    ensure_unique("tier", tiers.iter().map(|t| t.id.as_str()))?;
    ensure_unique("product", tiers.iter().map(|t| t.product_id.as_str()))?;
    for tier in tiers {
        if tier.koins <= 0 {
            return Err(CatalogError::InvalidAmount {
                what: "tier koins",
                id: tier.id.clone(),
                constraint: "positive",
                value: tier.koins,
            });
        }
    }
    Ok(())
}
