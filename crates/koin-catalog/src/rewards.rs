//! Koins earned for monster interactions.
//!
//! A pure lookup with no side effects. Callers that receive the action as
//! free text from the presentation layer use the `Option<&str>` entry
//! points, where an absent or unrecognised action yields no reward.

use koin_types::{InteractionAction, RewardResult};

/// Koins paid for a feed.
pub const FEED_REWARD: i64 = 5;
/// Koins paid for a comfort.
pub const COMFORT_REWARD: i64 = 4;
/// Koins paid for a hug.
pub const HUG_REWARD: i64 = 3;
/// Koins paid for a wake-up.
pub const WAKE_REWARD: i64 = 2;

/// Reward for a known interaction.
pub fn reward_for(action: InteractionAction) -> RewardResult {
    let (koins, label, description) = match action {
        InteractionAction::Feed => (FEED_REWARD, "Yum!", "Your monster enjoyed a tasty meal."),
        InteractionAction::Comfort => (
            COMFORT_REWARD,
            "Feeling better",
            "Your monster calmed down after some comfort.",
        ),
        InteractionAction::Hug => (HUG_REWARD, "Warm hug", "Your monster loved the hug."),
        InteractionAction::Wake => (WAKE_REWARD, "Good morning", "Your monster is up and about."),
    };
    RewardResult {
        action,
        koins,
        label: label.to_owned(),
        description: description.to_owned(),
    }
}

/// Reward for an action given as text, `None` if absent or unknown.
pub fn calculate_reward(action: Option<&str>) -> Option<RewardResult> {
    let action = action?.parse::<InteractionAction>().ok()?;
    Some(reward_for(action))
}

/// Whether the action earns a reward.
pub fn is_rewardable(action: Option<&str>) -> bool {
    calculate_reward(action).is_some()
}

/// Sum of the rewards for a batch of actions. Missing or unknown actions
/// contribute nothing; the sum saturates instead of overflowing.
pub fn total_for<'a, I>(actions: I) -> i64
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    actions
        .into_iter()
        .filter_map(calculate_reward)
        .fold(0_i64, |total, reward| total.saturating_add(reward.koins))
}
