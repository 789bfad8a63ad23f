//! Enumeration types for the Koin economy.
//!
//! Every enum serializes to the lowercase / `snake_case` string used by the
//! presentation layer and by the database (`as_str` / [`FromStr`] pair), so
//! the same spelling flows through JSON, SQL and the `TypeScript` bindings.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// The enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl core::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Implements `as_str`, `ALL`, [`FromStr`] and `Display` for a unit enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical wire and database spelling.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Rarity tier of a catalog item. Tiers are ordered from cheapest to most
/// expensive; the price multiplier table is monotonic in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Everyday items.
    Common,
    /// Slightly harder to come by.
    Uncommon,
    /// Rare items.
    Rare,
    /// Epic items.
    Epic,
    /// The top tier.
    Legendary,
}

string_enum!(Rarity, "rarity", {
    Common => "common",
    Uncommon => "uncommon",
    Rare => "rare",
    Epic => "epic",
    Legendary => "legendary",
});

/// Equip slot of a catalog item. A monster wears at most one item per
/// category at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Headwear.
    Hat,
    /// Eyewear.
    Glasses,
    /// Neckwear.
    Necklace,
    /// Back accessories.
    Wings,
    /// Scene behind the monster.
    Background,
}

string_enum!(ItemCategory, "item category", {
    Hat => "hat",
    Glasses => "glasses",
    Necklace => "necklace",
    Wings => "wings",
    Background => "background",
});

// ---------------------------------------------------------------------------
// Quests and interactions
// ---------------------------------------------------------------------------

/// What kind of activity advances a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum QuestType {
    /// Feed a monster.
    FeedMonster,
    /// Comfort a sad monster.
    ComfortMonster,
    /// Hug a monster.
    HugMonster,
    /// Wake a sleeping monster.
    WakeMonster,
    /// Buy an item from the shop.
    BuyItem,
    /// Equip an item on a monster.
    EquipItem,
}

string_enum!(QuestType, "quest type", {
    FeedMonster => "feed_monster",
    ComfortMonster => "comfort_monster",
    HugMonster => "hug_monster",
    WakeMonster => "wake_monster",
    BuyItem => "buy_item",
    EquipItem => "equip_item",
});

/// A rewardable interaction with a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum InteractionAction {
    /// Give the monster food.
    Feed,
    /// Comfort the monster.
    Comfort,
    /// Hug the monster.
    Hug,
    /// Wake the monster up.
    Wake,
}

string_enum!(InteractionAction, "interaction", {
    Feed => "feed",
    Comfort => "comfort",
    Hug => "hug",
    Wake => "wake",
});

impl InteractionAction {
    /// The quest type this interaction advances.
    pub const fn quest_type(self) -> QuestType {
        match self {
            Self::Feed => QuestType::FeedMonster,
            Self::Comfort => QuestType::ComfortMonster,
            Self::Hug => QuestType::HugMonster,
            Self::Wake => QuestType::WakeMonster,
        }
    }
}
