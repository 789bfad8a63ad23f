//! Built-in catalog shipped with the application.
//!
//! Used when no catalog file is configured, and as the fallback for any
//! section a catalog file leaves out.

use koin_types::{
    CatalogItem, CatalogItemId, ItemCategory, KoinTier, ProductId, QuestId, QuestTemplate,
    QuestType, Rarity,
};

/// Helper to build a [`CatalogItem`].
fn item(
    id: &str,
    name: &str,
    category: ItemCategory,
    rarity: Rarity,
    base_price: i64,
) -> CatalogItem {
    CatalogItem {
        id: CatalogItemId::from(id),
        name: name.to_owned(),
        category,
        rarity,
        base_price,
    }
}

/// Helper to build a [`QuestTemplate`].
fn quest(
    id: &str,
    quest_type: QuestType,
    target: u32,
    reward: i64,
    title: &str,
    description: &str,
    icon: &str,
) -> QuestTemplate {
    QuestTemplate {
        id: QuestId::from(id),
        quest_type,
        target,
        reward,
        title: title.to_owned(),
        description: description.to_owned(),
        icon: icon.to_owned(),
    }
}

/// Helper to build a USD [`KoinTier`].
fn tier(id: &str, koins: i64, product_id: &str, price_cents: i64) -> KoinTier {
    KoinTier {
        id: id.to_owned(),
        koins,
        product_id: ProductId::from(product_id),
        price_cents,
        currency: String::from("usd"),
    }
}

/// Cosmetic items: accessories and backgrounds.
pub fn items() -> Vec<CatalogItem> {
    use ItemCategory::{Background, Glasses, Hat, Necklace, Wings};
    use Rarity::{Common, Epic, Legendary, Rare, Uncommon};

    vec![
        item("party-hat", "Party Hat", Hat, Common, 10),
        item("knit-beanie", "Knit Beanie", Hat, Uncommon, 12),
        item("wizard-hat", "Wizard Hat", Hat, Rare, 10),
        item("golden-crown", "Golden Crown", Hat, Legendary, 50),
        item("round-glasses", "Round Glasses", Glasses, Common, 8),
        item("monocle", "Monocle", Glasses, Rare, 14),
        item("star-shades", "Star Shades", Glasses, Epic, 12),
        item("bead-necklace", "Bead Necklace", Necklace, Common, 6),
        item("pearl-necklace", "Pearl Necklace", Necklace, Epic, 20),
        item("fairy-wings", "Fairy Wings", Wings, Rare, 30),
        item("dragon-wings", "Dragon Wings", Wings, Legendary, 40),
        item("sunny-meadow", "Sunny Meadow", Background, Common, 15),
        item("sandy-beach", "Sandy Beach", Background, Uncommon, 15),
        item("night-sky", "Night Sky", Background, Rare, 20),
        item("candy-land", "Candy Land", Background, Epic, 25),
    ]
}

/// Daily quest pool.
pub fn quest_templates() -> Vec<QuestTemplate> {
    use QuestType::{BuyItem, ComfortMonster, EquipItem, FeedMonster, HugMonster, WakeMonster};

    vec![
        quest(
            "feed_3",
            FeedMonster,
            3,
            15,
            "Snack Time",
            "Feed your monster 3 times.",
            "🍎",
        ),
        quest(
            "feed_5",
            FeedMonster,
            5,
            25,
            "Feast Day",
            "Feed your monster 5 times.",
            "🍰",
        ),
        quest(
            "hug_5",
            HugMonster,
            5,
            10,
            "Cuddle Buddy",
            "Hug your monster 5 times.",
            "🤗",
        ),
        quest(
            "hug_10",
            HugMonster,
            10,
            30,
            "Hug Marathon",
            "Hug your monster 10 times.",
            "💞",
        ),
        quest(
            "comfort_2",
            ComfortMonster,
            2,
            10,
            "There, There",
            "Comfort your monster twice.",
            "🫂",
        ),
        quest(
            "wake_1",
            WakeMonster,
            1,
            5,
            "Rise and Shine",
            "Wake your monster up.",
            "⏰",
        ),
        quest(
            "buy_1",
            BuyItem,
            1,
            20,
            "Window Shopper",
            "Buy an item from the shop.",
            "🛍️",
        ),
        quest(
            "equip_2",
            EquipItem,
            2,
            10,
            "Dress Up",
            "Equip 2 items on your monsters.",
            "🎩",
        ),
    ]
}

/// Koins packs sold through the payment processor.
pub fn koin_tiers() -> Vec<KoinTier> {
    vec![
        tier("starter", 500, "prod_koins_starter", 499),
        tier("popular", 1_200, "prod_koins_popular", 999),
        tier("value", 2_500, "prod_koins_value", 1_999),
        tier("mega", 6_500, "prod_koins_mega", 4_999),
    ]
}
