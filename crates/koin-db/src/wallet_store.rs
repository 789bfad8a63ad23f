//! `wallets` table: [`WalletRepo`] for [`PgStore`].
//!
//! Credits and debits are single `UPDATE` statements. The debit's
//! `balance >= $2` guard and the table's CHECK constraint together make an
//! overdraft impossible regardless of concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use koin_economy::{DebitOutcome, RepoError, WalletRepo};
use koin_types::{OwnerId, Wallet};

use crate::error::DbError;
use crate::store::{PgStore, WalletRow};

impl PgStore {
    async fn wallet_row(&self, owner: &OwnerId) -> Result<Option<WalletRow>, DbError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r"SELECT owner_id, balance, created_at, updated_at
              FROM wallets
              WHERE owner_id = $1",
        )
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn open_wallet(
        &self,
        owner: &OwnerId,
        starting_balance: i64,
        now: DateTime<Utc>,
    ) -> Result<Wallet, DbError> {
        sqlx::query(
            r"INSERT INTO wallets (owner_id, balance, created_at, updated_at)
              VALUES ($1, $2, $3, $3)
              ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner.as_str())
        .bind(starting_balance)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.wallet_row(owner)
            .await?
            .map(Wallet::from)
            .ok_or_else(|| DbError::Decode(format!("wallet {owner} vanished after insert")))
    }

    async fn add_balance(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Wallet>, DbError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r"UPDATE wallets
              SET balance = balance + $2, updated_at = $3
              WHERE owner_id = $1
              RETURNING owner_id, balance, created_at, updated_at",
        )
        .bind(owner.as_str())
        .bind(amount)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Wallet::from))
    }

    async fn subtract_if_covered(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<DebitOutcome, DbError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r"UPDATE wallets
              SET balance = balance - $2, updated_at = $3
              WHERE owner_id = $1 AND balance >= $2
              RETURNING owner_id, balance, created_at, updated_at",
        )
        .bind(owner.as_str())
        .bind(amount)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(DebitOutcome::Applied(row.into()));
        }
        Ok(match self.wallet_row(owner).await? {
            Some(current) => DebitOutcome::Insufficient {
                balance: current.balance,
            },
            None => DebitOutcome::Missing,
        })
    }
}

#[async_trait]
impl WalletRepo for PgStore {
    async fn find(&self, owner: &OwnerId) -> Result<Option<Wallet>, RepoError> {
        Ok(self.wallet_row(owner).await?.map(Wallet::from))
    }

    async fn insert_or_fetch(
        &self,
        owner: &OwnerId,
        starting_balance: i64,
        now: DateTime<Utc>,
    ) -> Result<Wallet, RepoError> {
        Ok(self.open_wallet(owner, starting_balance, now).await?)
    }

    async fn increment(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Wallet>, RepoError> {
        Ok(self.add_balance(owner, amount, now).await?)
    }

    async fn decrement_if_sufficient(
        &self,
        owner: &OwnerId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<DebitOutcome, RepoError> {
        Ok(self.subtract_if_covered(owner, amount, now).await?)
    }
}
