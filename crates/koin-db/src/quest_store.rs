//! `daily_quest_sets` and `quest_progress` tables: [`QuestRepo`] for
//! [`PgStore`].
//!
//! A set is one header row plus one progress row per quest, ordered by
//! `slot`. Progress, claim and unclaim are each one conditional `UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use koin_economy::{QuestRepo, RepoError};
use koin_types::{DailyQuestSet, OwnerId, QuestId, QuestProgress, QuestType};

use crate::error::DbError;
use crate::store::{PgStore, QuestProgressRow, QuestSetRow, convert_all, to_db_int};

/// Columns selected for a [`QuestProgressRow`].
const PROGRESS_COLUMNS: &str =
    "quest_id, quest_type, current, target, completed, completed_at, claimed, claimed_at";

impl PgStore {
    async fn load_set(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<Option<DailyQuestSet>, DbError> {
        let header = sqlx::query_as::<_, QuestSetRow>(
            r"SELECT owner_id, day, created_at
              FROM daily_quest_sets
              WHERE owner_id = $1 AND day = $2",
        )
        .bind(owner.as_str())
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, QuestProgressRow>(&format!(
            "SELECT {PROGRESS_COLUMNS}
             FROM quest_progress
             WHERE owner_id = $1 AND day = $2
             ORDER BY slot"
        ))
        .bind(owner.as_str())
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(DailyQuestSet {
            owner_id: OwnerId::from(header.owner_id),
            day: header.day,
            quests: convert_all(rows)?,
            created_at: header.created_at,
        }))
    }

    /// Insert the header and its progress rows in one transaction. If the
    /// header already exists nothing is written.
    async fn create_set(&self, set: &DailyQuestSet) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"INSERT INTO daily_quest_sets (owner_id, day, created_at)
              VALUES ($1, $2, $3)
              ON CONFLICT (owner_id, day) DO NOTHING",
        )
        .bind(set.owner_id.as_str())
        .bind(set.day)
        .bind(set.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(());
        }

        let len = set.quests.len();
        let mut quest_ids = Vec::with_capacity(len);
        let mut slots = Vec::with_capacity(len);
        let mut quest_types = Vec::with_capacity(len);
        let mut targets = Vec::with_capacity(len);
        for (slot, quest) in set.quests.iter().enumerate() {
            quest_ids.push(quest.quest_id.as_str().to_owned());
            slots.push(i32::try_from(slot).map_err(|e| DbError::OutOfRange(e.to_string()))?);
            quest_types.push(quest.quest_type.as_str().to_owned());
            targets.push(to_db_int(quest.target, "target")?);
        }

        sqlx::query(
            r"INSERT INTO quest_progress (owner_id, day, quest_id, slot, quest_type, target)
              SELECT $1::TEXT, $2::DATE, *
              FROM UNNEST($3::TEXT[], $4::INTEGER[], $5::TEXT[], $6::INTEGER[])",
        )
        .bind(set.owner_id.as_str())
        .bind(set.day)
        .bind(&quest_ids)
        .bind(&slots)
        .bind(&quest_types)
        .bind(&targets)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(
            owner = %set.owner_id,
            day = %set.day,
            quests = len,
            "Inserted daily quest set"
        );
        Ok(())
    }

    async fn advance_progress(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_type: QuestType,
        increment: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<QuestProgress>, DbError> {
        let row = sqlx::query_as::<_, QuestProgressRow>(&format!(
            "UPDATE quest_progress
             SET current = LEAST(current::BIGINT + $4, target),
                 completed = LEAST(current::BIGINT + $4, target) = target,
                 completed_at = CASE
                     WHEN LEAST(current::BIGINT + $4, target) = target THEN $5
                     ELSE completed_at
                 END
             WHERE NOT completed
               AND (owner_id, day, quest_id) = (
                 SELECT owner_id, day, quest_id
                 FROM quest_progress
                 WHERE owner_id = $1 AND day = $2 AND quest_type = $3 AND NOT completed
                 ORDER BY slot
                 LIMIT 1
                 FOR UPDATE
             )
             RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(owner.as_str())
        .bind(day)
        .bind(quest_type.as_str())
        .bind(i64::from(increment))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestProgress::try_from).transpose()
    }

    async fn set_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
        claimed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, DbError> {
        let claim = claimed_at.is_some();
        let affected = sqlx::query(
            r"UPDATE quest_progress
              SET claimed = $4, claimed_at = $5
              WHERE owner_id = $1 AND day = $2 AND quest_id = $3
                AND completed AND claimed <> $4",
        )
        .bind(owner.as_str())
        .bind(day)
        .bind(quest_id.as_str())
        .bind(claim)
        .bind(claimed_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected == 1)
    }
}

#[async_trait]
impl QuestRepo for PgStore {
    async fn find_set(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
    ) -> Result<Option<DailyQuestSet>, RepoError> {
        Ok(self.load_set(owner, day).await?)
    }

    async fn insert_set_or_fetch(&self, set: &DailyQuestSet) -> Result<DailyQuestSet, RepoError> {
        self.create_set(set).await?;
        self.load_set(&set.owner_id, set.day).await?.ok_or_else(|| {
            RepoError::Corrupt(format!(
                "quest set {}/{} vanished after insert",
                set.owner_id, set.day
            ))
        })
    }

    async fn advance_first_incomplete(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_type: QuestType,
        increment: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<QuestProgress>, RepoError> {
        Ok(self
            .advance_progress(owner, day, quest_type, increment, now)
            .await?)
    }

    async fn mark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        Ok(self.set_claimed(owner, day, quest_id, Some(now)).await?)
    }

    async fn unmark_claimed(
        &self,
        owner: &OwnerId,
        day: NaiveDate,
        quest_id: &QuestId,
    ) -> Result<bool, RepoError> {
        Ok(self.set_claimed(owner, day, quest_id, None).await?)
    }

    async fn owners(&self) -> Result<Vec<OwnerId>, RepoError> {
        let owners: Vec<String> = sqlx::query_scalar(
            r"SELECT DISTINCT owner_id FROM daily_quest_sets ORDER BY owner_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(owners.into_iter().map(OwnerId::from).collect())
    }
}
