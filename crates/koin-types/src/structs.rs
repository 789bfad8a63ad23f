//! Core record types: wallets, catalog definitions, daily quest sets,
//! owned items and payment receipts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{InteractionAction, ItemCategory, QuestType, Rarity};
use crate::ids::{
    CatalogItemId, EntityId, OwnedItemId, OwnerId, PaymentEventId, ProductId, QuestId,
};

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// One user's Koins balance.
///
/// Created lazily on first access, never deleted. The balance only changes
/// through atomic credit and conditional debit at the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Wallet {
    /// The owner of the wallet (unique).
    pub owner_id: OwnerId,
    /// Current balance in Koins. Never negative.
    pub balance: i64,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable definition of a purchasable cosmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CatalogItem {
    /// Catalog identifier.
    pub id: CatalogItemId,
    /// Display name.
    pub name: String,
    /// Equip slot.
    pub category: ItemCategory,
    /// Rarity tier, selects the price multiplier.
    pub rarity: Rarity,
    /// Price before the rarity multiplier is applied.
    pub base_price: i64,
}

/// Immutable definition of a daily quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuestTemplate {
    /// Quest identifier.
    pub id: QuestId,
    /// Activity that advances the quest.
    pub quest_type: QuestType,
    /// Progress needed to complete the quest. At least 1.
    pub target: u32,
    /// Koins paid out when the reward is claimed.
    pub reward: i64,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Icon shown next to the quest.
    pub icon: String,
}

/// Reward paid for a single monster interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RewardResult {
    /// The interaction that earned the reward.
    pub action: InteractionAction,
    /// Koins earned.
    pub koins: i64,
    /// Short label for toasts.
    pub label: String,
    /// Longer description.
    pub description: String,
}

/// A purchasable pack of Koins sold through the external payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KoinTier {
    /// Tier identifier (e.g. `"small"`).
    pub id: String,
    /// Koins credited when the tier is bought.
    pub koins: i64,
    /// The processor's product identifier for this tier.
    pub product_id: ProductId,
    /// Price in the smallest currency unit.
    pub price_cents: i64,
    /// ISO currency code of `price_cents`.
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// Per-quest progress embedded in a [`DailyQuestSet`].
///
/// Invariants: `current <= target`, `completed` implies `current == target`,
/// `claimed` implies `completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuestProgress {
    /// Template this progress belongs to.
    pub quest_id: QuestId,
    /// Activity type, copied from the template at creation.
    pub quest_type: QuestType,
    /// Progress so far.
    pub current: u32,
    /// Progress needed, copied from the template at creation.
    pub target: u32,
    /// Whether `current` has reached `target`.
    pub completed: bool,
    /// When the quest completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the reward has been paid out.
    pub claimed: bool,
    /// When the reward was claimed.
    pub claimed_at: Option<DateTime<Utc>>,
}

impl QuestProgress {
    /// Fresh, untouched progress for a template.
    pub fn start(template: &QuestTemplate) -> Self {
        Self {
            quest_id: template.id.clone(),
            quest_type: template.quest_type,
            current: 0,
            target: template.target,
            completed: false,
            completed_at: None,
            claimed: false,
            claimed_at: None,
        }
    }

    /// Advance by `increment`, clamped to `target`.
    ///
    /// Returns `false` without touching anything if the quest is already
    /// completed.
    pub fn advance(&mut self, increment: u32, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.current = self.current.saturating_add(increment).min(self.target);
        if self.current == self.target {
            self.completed = true;
            self.completed_at = Some(now);
        }
        true
    }
}

/// The quests assigned to one owner for one calendar day.
///
/// Unique per `(owner_id, day)`. Membership never changes after creation;
/// only the embedded progress fields mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DailyQuestSet {
    /// Owner of the set.
    pub owner_id: OwnerId,
    /// Calendar day the set belongs to.
    pub day: NaiveDate,
    /// Assigned quests in display order.
    pub quests: Vec<QuestProgress>,
    /// When the set was created.
    pub created_at: DateTime<Utc>,
}

impl DailyQuestSet {
    /// Look up a quest in the set.
    pub fn quest(&self, quest_id: &QuestId) -> Option<&QuestProgress> {
        self.quests.iter().find(|q| &q.quest_id == quest_id)
    }
}

/// A quest joined with its template, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EnrichedQuest {
    /// Quest identifier.
    pub quest_id: QuestId,
    /// Activity type.
    pub quest_type: QuestType,
    /// Template title.
    pub title: String,
    /// Template description.
    pub description: String,
    /// Template icon.
    pub icon: String,
    /// Koins paid on claim.
    pub reward: i64,
    /// Progress so far.
    pub current: u32,
    /// Progress needed.
    pub target: u32,
    /// Whether the quest is completed.
    pub completed: bool,
    /// When the quest completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the reward was claimed.
    pub claimed: bool,
    /// When the reward was claimed.
    pub claimed_at: Option<DateTime<Utc>>,
}

impl EnrichedQuest {
    /// Join progress with the template it was created from.
    pub fn new(progress: &QuestProgress, template: &QuestTemplate) -> Self {
        Self {
            quest_id: progress.quest_id.clone(),
            quest_type: progress.quest_type,
            title: template.title.clone(),
            description: template.description.clone(),
            icon: template.icon.clone(),
            reward: template.reward,
            current: progress.current,
            target: progress.target,
            completed: progress.completed,
            completed_at: progress.completed_at,
            claimed: progress.claimed,
            claimed_at: progress.claimed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// A catalog item bought by an owner.
///
/// `category` is copied from the catalog item at purchase time so equip
/// exclusivity never depends on the shape of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OwnedItem {
    /// Record identifier.
    pub id: OwnedItemId,
    /// Catalog item that was bought.
    pub catalog_item_id: CatalogItemId,
    /// Buyer.
    pub owner_id: OwnerId,
    /// Equip slot, inherited from the catalog item.
    pub category: ItemCategory,
    /// Entity currently wearing the item, if any.
    pub equipped_on_entity_id: Option<EntityId>,
    /// Purchase time.
    pub acquired_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Durable record that a payment event has been applied to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PaymentReceipt {
    /// External event identifier (primary key).
    pub event_id: PaymentEventId,
    /// Wallet that was credited.
    pub owner_id: OwnerId,
    /// Product that was bought.
    pub product_id: ProductId,
    /// Koins credited.
    pub koins: i64,
    /// When the credit was applied.
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(target: u32) -> QuestTemplate {
        QuestTemplate {
            id: QuestId::from("feed_3"),
            quest_type: QuestType::FeedMonster,
            target,
            reward: 15,
            title: String::from("Snack Time"),
            description: String::from("Feed your monster"),
            icon: String::from("🍎"),
        }
    }

    #[test]
    fn advance_clamps_to_target() {
        let mut progress = QuestProgress::start(&template(3));
        let now = Utc::now();
        assert!(progress.advance(10, now));
        assert_eq!(progress.current, 3);
        assert!(progress.completed);
        assert_eq!(progress.completed_at, Some(now));
    }

    #[test]
    fn advance_is_noop_once_completed() {
        let mut progress = QuestProgress::start(&template(1));
        let first = Utc::now();
        assert!(progress.advance(1, first));
        assert!(!progress.advance(1, Utc::now()));
        assert_eq!(progress.current, 1);
        assert_eq!(progress.completed_at, Some(first));
    }

    #[test]
    fn partial_progress_does_not_complete() {
        let mut progress = QuestProgress::start(&template(3));
        progress.advance(2, Utc::now());
        assert_eq!(progress.current, 2);
        assert!(!progress.completed);
        assert!(progress.completed_at.is_none());
    }

    #[test]
    fn enriched_quest_carries_template_display_fields() {
        let t = template(3);
        let enriched = EnrichedQuest::new(&QuestProgress::start(&t), &t);
        assert_eq!(enriched.title, "Snack Time");
        assert_eq!(enriched.reward, 15);
        assert_eq!(enriched.target, 3);
        assert!(!enriched.claimed);
    }
}
