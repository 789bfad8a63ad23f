//! `payment_receipts` table: [`PaymentRepo`] for [`PgStore`].
//!
//! The receipt insert and the wallet credit share one transaction. The
//! receipt's primary key on `event_id` makes a second delivery insert
//! nothing, and that delivery then credits nothing.

use async_trait::async_trait;
use koin_economy::{PaymentApplication, PaymentRepo, RepoError};
use koin_types::{PaymentEventId, PaymentReceipt, Wallet};

use crate::error::DbError;
use crate::store::{PgStore, ReceiptRow, WalletRow};

impl PgStore {
    async fn receipt_row(&self, event_id: &str) -> Result<Option<PaymentReceipt>, DbError> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r"SELECT event_id, owner_id, product_id, koins, applied_at
              FROM payment_receipts
              WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PaymentReceipt::from))
    }

    async fn apply_receipt(
        &self,
        receipt: &PaymentReceipt,
        starting_balance: i64,
    ) -> Result<PaymentApplication, DbError> {
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query(
            r"INSERT INTO payment_receipts (event_id, owner_id, product_id, koins, applied_at)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(receipt.event_id.as_str())
        .bind(receipt.owner_id.as_str())
        .bind(receipt.product_id.as_str())
        .bind(receipt.koins)
        .bind(receipt.applied_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if recorded == 0 {
            tx.rollback().await?;
            let existing = self
                .receipt_row(receipt.event_id.as_str())
                .await?
                .ok_or_else(|| {
                    DbError::Decode(format!("receipt {} vanished", receipt.event_id))
                })?;
            return Ok(PaymentApplication::Duplicate(existing));
        }

        sqlx::query(
            r"INSERT INTO wallets (owner_id, balance, created_at, updated_at)
              VALUES ($1, $2, $3, $3)
              ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(receipt.owner_id.as_str())
        .bind(starting_balance)
        .bind(receipt.applied_at)
        .execute(&mut *tx)
        .await?;

        let wallet = sqlx::query_as::<_, WalletRow>(
            r"UPDATE wallets
              SET balance = balance + $2, updated_at = $3
              WHERE owner_id = $1
              RETURNING owner_id, balance, created_at, updated_at",
        )
        .bind(receipt.owner_id.as_str())
        .bind(receipt.koins)
        .bind(receipt.applied_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(PaymentApplication::Applied(Wallet::from(wallet)))
    }
}

#[async_trait]
impl PaymentRepo for PgStore {
    async fn apply_once(
        &self,
        receipt: &PaymentReceipt,
        starting_balance: i64,
    ) -> Result<PaymentApplication, RepoError> {
        Ok(self.apply_receipt(receipt, starting_balance).await?)
    }

    async fn find_receipt(
        &self,
        event_id: &PaymentEventId,
    ) -> Result<Option<PaymentReceipt>, RepoError> {
        Ok(self.receipt_row(event_id.as_str()).await?)
    }
}
