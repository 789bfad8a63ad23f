//! Daily quests: assignment, progress and reward claims.
//!
//! Each owner gets one [`DailyQuestSet`] per UTC calendar day, sampled from
//! the catalog's templates the first time the day is requested and never
//! resampled afterwards. Claiming flips `claimed` with a single conditional
//! update and only the call that flipped it credits the wallet.

use std::sync::Arc;

use chrono::NaiveDate;
use koin_catalog::CatalogStore;
use koin_types::{DailyQuestSet, EnrichedQuest, OwnerId, QuestId, QuestProgress, QuestType};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::{ConflictReason, EconomyError, Missing};
use crate::repo::QuestRepo;
use crate::wallet::{WalletLedger, validate_owner};

/// Assigns daily quests, tracks their progress and pays out rewards.
#[derive(Clone)]
pub struct QuestEngine {
    catalog: Arc<CatalogStore>,
    repo: Arc<dyn QuestRepo>,
    wallet: WalletLedger,
    clock: Arc<dyn Clock>,
    daily_quest_count: usize,
}

impl QuestEngine {
    /// Create an engine that assigns `daily_quest_count` quests per day.
    pub fn new(
        catalog: Arc<CatalogStore>,
        repo: Arc<dyn QuestRepo>,
        wallet: WalletLedger,
        clock: Arc<dyn Clock>,
        daily_quest_count: usize,
    ) -> Self {
        Self {
            catalog,
            repo,
            wallet,
            clock,
            daily_quest_count,
        }
    }

    /// The owner's quests for `day`, joined with their templates. The set
    /// is created on first request.
    pub async fn get_daily_quests(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<Vec<EnrichedQuest>, EconomyError> {
        let set = self.ensure_set(owner, day).await?;
        Ok(self.enrich(&set))
    }

    /// [`QuestEngine::get_daily_quests`] for the clock's current day.
    pub async fn get_todays_quests(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<EnrichedQuest>, EconomyError> {
        self.get_daily_quests(owner, self.clock.today()).await
    }

    /// The engine's current calendar day.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Return the set for `(owner, day)`, creating it if absent. An existing
    /// set is returned unchanged; concurrent callers all see the same set.
    pub async fn ensure_set(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<DailyQuestSet, EconomyError> {
        validate_owner(owner)?;
        if let Some(set) = self.repo.find_set(owner, day).await? {
            return Ok(set);
        }
        let candidate = self.draw_set(owner, day);
        let stored = self.repo.insert_set_or_fetch(&candidate).await?;
        if stored == candidate {
            debug!(owner = %owner, %day, quests = stored.quests.len(), "Daily quest set created");
        }
        Ok(stored)
    }

    /// Sample a fresh set. Kept synchronous so the thread-local RNG never
    /// lives across an await point.
    fn draw_set(&self, owner: &OwnerId, day: NaiveDate) -> DailyQuestSet {
        let quests = self
            .catalog
            .sample_quest_templates(self.daily_quest_count)
            .iter()
            .map(QuestProgress::start)
            .collect();
        DailyQuestSet {
            owner_id: owner.clone(),
            day,
            quests,
            created_at: self.clock.now(),
        }
    }

    fn enrich(&self, set: &DailyQuestSet) -> Vec<EnrichedQuest> {
        set.quests
            .iter()
            .filter_map(|progress| {
                let template = self.catalog.template_by_id(&progress.quest_id);
                if template.is_none() {
                    warn!(
                        owner = %set.owner_id,
                        quest = %progress.quest_id,
                        "Quest template missing from catalog"
                    );
                }
                template.map(|t| EnrichedQuest::new(progress, t))
            })
            .collect()
    }

    /// Advance today's first incomplete quest of `quest_type` by
    /// `increment`, clamped to its target.
    ///
    /// Returns `None` when there is no set for today or no matching
    /// incomplete quest. That is not an error.
    pub async fn update_progress(
        &self,
        owner: &OwnerId,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<Option<QuestProgress>, EconomyError> {
        validate_owner(owner)?;
        if increment == 0 {
            return Err(EconomyError::Validation(String::from(
                "progress increment must be at least 1",
            )));
        }
        let progress = self
            .repo
            .advance_first_incomplete(
                owner,
                self.clock.today(),
                quest_type,
                increment,
                self.clock.now(),
            )
            .await?;
        if let Some(ref quest) = progress {
            debug!(
                owner = %owner,
                quest = %quest.quest_id,
                current = quest.current,
                target = quest.target,
                "Quest progressed"
            );
            if quest.completed {
                info!(owner = %owner, quest = %quest.quest_id, "Quest completed");
            }
        }
        Ok(progress)
    }

    /// Pay out the reward of one of today's completed quests.
    ///
    /// Returns the Koins credited.
    pub async fn claim_reward(
        &self,
        owner: &OwnerId,
        quest_id: &QuestId,
    ) -> Result<i64, EconomyError> {
        validate_owner(owner)?;
        let day = self.clock.today();
        let set = self
            .repo
            .find_set(owner, day)
            .await?
            .ok_or_else(|| EconomyError::not_found(Missing::Quest, quest_id))?;
        let quest = set
            .quest(quest_id)
            .ok_or_else(|| EconomyError::not_found(Missing::Quest, quest_id))?;
        if !quest.completed {
            return Err(EconomyError::Conflict(ConflictReason::NotCompleted));
        }
        if quest.claimed {
            return Err(EconomyError::Conflict(ConflictReason::AlreadyClaimed));
        }
        let reward = self
            .catalog
            .template_by_id(quest_id)
            .ok_or_else(|| EconomyError::not_found(Missing::QuestTemplate, quest_id))?
            .reward;

        if !self.repo.mark_claimed(owner, day, quest_id, self.clock.now()).await? {
            return Err(EconomyError::Conflict(ConflictReason::AlreadyClaimed));
        }

        let paid = if reward > 0 {
            self.wallet.credit(owner, reward).await.map(drop)
        } else {
            Ok(())
        };
        if let Err(credit_err) = paid {
            self.revert_claim(owner, day, quest_id, &credit_err).await;
            return Err(credit_err);
        }

        info!(owner = %owner, quest = %quest_id, reward, "Quest reward claimed");
        Ok(reward)
    }

    async fn revert_claim(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
        cause: &EconomyError,
    ) {
        warn!(
            owner = %owner,
            quest = %quest_id,
            error = %cause,
            "Reward credit failed, reverting claim"
        );
        match self.repo.unmark_claimed(owner, day, quest_id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(owner = %owner, quest = %quest_id, "Claim flag already cleared");
            }
            Err(err) => {
                error!(owner = %owner, quest = %quest_id, error = %err, "Could not revert claim");
            }
        }
    }

    /// Make sure every owner that ever had a quest set has one for `day`.
    /// Existing sets are left alone. Returns the number of owners processed.
    pub async fn renew_all(&self, day: NaiveDate) -> Result<usize, EconomyError> {
        let owners = self.repo.owners().await?;
        for owner in &owners {
            self.ensure_set(owner, day).await?;
        }
        info!(%day, owners = owners.len(), "Daily quests renewed");
        Ok(owners.len())
    }
}

impl core::fmt::Debug for QuestEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuestEngine")
            .field("daily_quest_count", &self.daily_quest_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use koin_catalog::builtin;
    use koin_types::Wallet;

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::RepoError;
    use crate::memory::MemoryStore;
    use crate::repo::{DebitOutcome, WalletRepo};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    struct Fixture {
        quests: QuestEngine,
        wallet: WalletLedger,
        clock: Arc<FixedClock>,
    }

    /// Engine over a pool of exactly three templates, so every set holds
    /// all of them.
    fn fixture() -> Fixture {
        let templates = builtin::quest_templates()
            .into_iter()
            .filter(|t| ["feed_3", "hug_5", "wake_1"].contains(&t.id.as_str()))
            .collect();
        let tiers = builtin::koin_tiers();
        let catalog = Arc::new(CatalogStore::new(builtin::items(), templates, tiers).unwrap());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at_day(day(1)));
        let wallet = WalletLedger::new(store.clone(), clock.clone(), 100);
        Fixture {
            quests: QuestEngine::new(catalog, store, wallet.clone(), clock.clone(), 3),
            wallet,
            clock,
        }
    }

    #[tokio::test]
    async fn set_is_created_once_per_day() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        let first = f.quests.get_daily_quests(&owner, day(1)).await.unwrap();
        let second = f.quests.get_daily_quests(&owner, day(1)).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert!(first.iter().all(|q| q.current == 0 && !q.completed && !q.claimed));
    }

    #[tokio::test]
    async fn feeding_completes_and_claims_once() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        f.quests.get_todays_quests(&owner).await.unwrap();

        for _ in 0..3 {
            f.quests
                .update_progress(&owner, QuestType::FeedMonster, 1)
                .await
                .unwrap();
        }
        let quests = f.quests.get_todays_quests(&owner).await.unwrap();
        let feed = quests.iter().find(|q| q.quest_id.as_str() == "feed_3").unwrap();
        assert!(feed.completed);
        assert!(feed.completed_at.is_some());

        let feed_id = QuestId::from("feed_3");
        assert_eq!(f.quests.claim_reward(&owner, &feed_id).await.unwrap(), 15);
        assert_eq!(f.wallet.find(&owner).await.unwrap().balance, 115);

        let err = f.quests.claim_reward(&owner, &feed_id).await.unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictReason::AlreadyClaimed));
        assert_eq!(f.wallet.find(&owner).await.unwrap().balance, 115);
    }

    #[tokio::test]
    async fn progress_is_clamped_to_target() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        f.quests.get_todays_quests(&owner).await.unwrap();
        let progress = f
            .quests
            .update_progress(&owner, QuestType::HugMonster, 50)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.current, 5);
        assert!(progress.completed);
        let again = f
            .quests
            .update_progress(&owner, QuestType::HugMonster, 1)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn progress_without_a_set_is_a_no_op() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        let progress = f
            .quests
            .update_progress(&owner, QuestType::FeedMonster, 1)
            .await
            .unwrap();
        assert!(progress.is_none());
        assert!(matches!(
            f.quests.update_progress(&owner, QuestType::FeedMonster, 0).await,
            Err(EconomyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn claiming_requires_completion() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        f.quests.get_todays_quests(&owner).await.unwrap();
        let err = f
            .quests
            .claim_reward(&owner, &QuestId::from("wake_1"))
            .await
            .unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictReason::NotCompleted));

        let err = f
            .quests
            .claim_reward(&owner, &QuestId::from("buy_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { kind: Missing::Quest, .. }));
    }

    #[tokio::test]
    async fn yesterdays_quest_cannot_be_claimed_today() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        f.quests.get_todays_quests(&owner).await.unwrap();
        f.quests
            .update_progress(&owner, QuestType::WakeMonster, 1)
            .await
            .unwrap();
        f.clock.advance_days(1);
        let err = f
            .quests
            .claim_reward(&owner, &QuestId::from("wake_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn renew_all_covers_every_known_owner() {
        let f = fixture();
        for owner in ["u1", "u2"] {
            f.quests.get_todays_quests(&OwnerId::from(owner)).await.unwrap();
        }
        let before = f.quests.ensure_set(&OwnerId::from("u1"), day(2)).await.unwrap();
        assert_eq!(f.quests.renew_all(day(2)).await.unwrap(), 2);
        let after = f.quests.ensure_set(&OwnerId::from("u1"), day(2)).await.unwrap();
        assert_eq!(before, after);
    }

    /// Wallet repo that cannot credit.
    struct FrozenWallets(Arc<MemoryStore>);

    #[async_trait]
    impl WalletRepo for FrozenWallets {
        async fn find(&self, owner: &OwnerId) -> Result<Option<Wallet>, RepoError> {
            WalletRepo::find(self.0.as_ref(), owner).await
        }
        async fn insert_or_fetch(
            &self,
            owner: &OwnerId,
            starting_balance: i64,
            now: DateTime<Utc>,
        ) -> Result<Wallet, RepoError> {
            self.0.insert_or_fetch(owner, starting_balance, now).await
        }
        async fn increment(
            &self,
            _owner: &OwnerId,
            _amount: i64,
            _now: DateTime<Utc>,
        ) -> Result<Option<Wallet>, RepoError> {
            Err(RepoError::Unavailable(String::from("timeout")))
        }
        async fn decrement_if_sufficient(
            &self,
            owner: &OwnerId,
            amount: i64,
            now: DateTime<Utc>,
        ) -> Result<DebitOutcome, RepoError> {
            self.0.decrement_if_sufficient(owner, amount, now).await
        }
    }

    #[tokio::test]
    async fn failed_payout_leaves_the_quest_claimable() {
        let f = fixture();
        let store = Arc::new(MemoryStore::new());
        let frozen_repo = Arc::new(FrozenWallets(store.clone()));
        let frozen = WalletLedger::new(frozen_repo, f.clock.clone(), 100);
        let quests = QuestEngine::new(
            Arc::clone(&f.quests.catalog),
            store.clone(),
            frozen,
            f.clock.clone(),
            3,
        );
        let owner = OwnerId::from("u1");
        quests.get_todays_quests(&owner).await.unwrap();
        quests
            .update_progress(&owner, QuestType::WakeMonster, 1)
            .await
            .unwrap();

        let err = quests
            .claim_reward(&owner, &QuestId::from("wake_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::Persistence(_)));

        let set = store.find_set(&owner, day(1)).await.unwrap().unwrap();
        let wake = set.quest(&QuestId::from("wake_1")).unwrap();
        assert!(wake.completed);
        assert!(!wake.claimed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_pay_once() {
        let f = fixture();
        let owner = OwnerId::from("u1");
        f.quests.get_todays_quests(&owner).await.unwrap();
        f.quests
            .update_progress(&owner, QuestType::WakeMonster, 1)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let quests = f.quests.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                quests.claim_reward(&owner, &QuestId::from("wake_1")).await
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(err) if err.conflict() == Some(ConflictReason::AlreadyClaimed)
        )));
        assert_eq!(f.wallet.find(&owner).await.unwrap().balance, 105);
    }
}
