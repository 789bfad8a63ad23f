//! Tunables for the economy services.

use serde::{Deserialize, Serialize};

/// Koins every new wallet starts with.
pub const DEFAULT_STARTING_BALANCE: i64 = 100;

/// Quests assigned per owner per day.
pub const DEFAULT_DAILY_QUEST_COUNT: usize = 3;

/// Economy section of the application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomySettings {
    /// Balance of a freshly created wallet.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,

    /// Size of each daily quest set.
    #[serde(default = "default_daily_quest_count")]
    pub daily_quest_count: usize,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            daily_quest_count: DEFAULT_DAILY_QUEST_COUNT,
        }
    }
}

const fn default_starting_balance() -> i64 {
    DEFAULT_STARTING_BALANCE
}

const fn default_daily_quest_count() -> usize {
    DEFAULT_DAILY_QUEST_COUNT
}
