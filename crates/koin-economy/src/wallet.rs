//! The wallet ledger: every Koins balance change goes through here.
//!
//! Debits are a single conditional decrement in the store, never a read
//! followed by a write, so concurrent debits cannot overdraw a wallet.

use std::sync::Arc;

use koin_types::{OwnerId, Wallet};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{ConflictReason, EconomyError, Missing};
use crate::repo::{DebitOutcome, WalletRepo};

/// Owns every owner's Koins balance.
#[derive(Clone)]
pub struct WalletLedger {
    repo: Arc<dyn WalletRepo>,
    clock: Arc<dyn Clock>,
    starting_balance: i64,
}

impl WalletLedger {
    /// Create a ledger over `repo`. New wallets open with `starting_balance`.
    pub fn new(repo: Arc<dyn WalletRepo>, clock: Arc<dyn Clock>, starting_balance: i64) -> Self {
        Self {
            repo,
            clock,
            starting_balance,
        }
    }

    /// Balance a new wallet opens with.
    pub const fn starting_balance(&self) -> i64 {
        self.starting_balance
    }

    /// Return the owner's wallet, creating it on first access.
    pub async fn get_or_create(&self, owner: &OwnerId) -> Result<Wallet, EconomyError> {
        validate_owner(owner)?;
        if let Some(wallet) = self.repo.find(owner).await? {
            return Ok(wallet);
        }
        let wallet = self
            .repo
            .insert_or_fetch(owner, self.starting_balance, self.clock.now())
            .await?;
        debug!(owner = %owner, balance = wallet.balance, "Wallet opened");
        Ok(wallet)
    }

    /// Fetch a wallet without creating it.
    pub async fn find(&self, owner: &OwnerId) -> Result<Wallet, EconomyError> {
        validate_owner(owner)?;
        self.repo
            .find(owner)
            .await?
            .ok_or_else(|| EconomyError::not_found(Missing::Wallet, owner))
    }

    /// Add `amount` Koins. The wallet is created first if needed.
    pub async fn credit(&self, owner: &OwnerId, amount: i64) -> Result<Wallet, EconomyError> {
        validate_owner(owner)?;
        validate_amount(amount)?;
        let wallet = match self.repo.increment(owner, amount, self.clock.now()).await? {
            Some(wallet) => wallet,
            None => {
                self.repo
                    .insert_or_fetch(owner, self.starting_balance, self.clock.now())
                    .await?;
                self.repo
                    .increment(owner, amount, self.clock.now())
                    .await?
                    .ok_or_else(|| EconomyError::not_found(Missing::Wallet, owner))?
            }
        };
        info!(owner = %owner, amount, balance = wallet.balance, "Wallet credited");
        Ok(wallet)
    }

    /// Remove `amount` Koins if the balance covers it.
    ///
    /// Fails with [`ConflictReason::InsufficientBalance`] and leaves the
    /// balance untouched otherwise.
    pub async fn debit(&self, owner: &OwnerId, amount: i64) -> Result<Wallet, EconomyError> {
        validate_owner(owner)?;
        validate_amount(amount)?;
        let mut outcome = self
            .repo
            .decrement_if_sufficient(owner, amount, self.clock.now())
            .await?;
        if outcome == DebitOutcome::Missing {
            self.repo
                .insert_or_fetch(owner, self.starting_balance, self.clock.now())
                .await?;
            outcome = self
                .repo
                .decrement_if_sufficient(owner, amount, self.clock.now())
                .await?;
        }
        match outcome {
            DebitOutcome::Applied(wallet) => {
                info!(owner = %owner, amount, balance = wallet.balance, "Wallet debited");
                Ok(wallet)
            }
            DebitOutcome::Insufficient { balance } => {
                debug!(owner = %owner, amount, balance, "Debit refused");
                Err(EconomyError::Conflict(ConflictReason::InsufficientBalance))
            }
            DebitOutcome::Missing => Err(EconomyError::not_found(Missing::Wallet, owner)),
        }
    }
}

impl core::fmt::Debug for WalletLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WalletLedger")
            .field("starting_balance", &self.starting_balance)
            .finish_non_exhaustive()
    }
}

pub(crate) fn validate_owner(owner: &OwnerId) -> Result<(), EconomyError> {
    if owner.is_blank() {
        return Err(EconomyError::Validation(String::from("owner id is blank")));
    }
    Ok(())
}

fn validate_amount(amount: i64) -> Result<(), EconomyError> {
    if amount <= 0 {
        return Err(EconomyError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::MemoryStore;

    fn ledger() -> WalletLedger {
        WalletLedger::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), 100)
    }

    #[tokio::test]
    async fn fresh_wallet_starts_at_default_balance() {
        let ledger = ledger();
        let wallet = ledger.get_or_create(&OwnerId::from("u1")).await.unwrap();
        assert_eq!(wallet.balance, 100);
        let again = ledger.get_or_create(&OwnerId::from("u1")).await.unwrap();
        assert_eq!(again.created_at, wallet.created_at);
    }

    #[tokio::test]
    async fn overdraft_is_refused_and_balance_kept() {
        let ledger = ledger();
        let owner = OwnerId::from("u1");
        ledger.get_or_create(&owner).await.unwrap();
        let err = ledger.debit(&owner, 150).await.unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictReason::InsufficientBalance));
        assert_eq!(ledger.find(&owner).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn credit_and_debit_move_the_balance() {
        let ledger = ledger();
        let owner = OwnerId::from("u1");
        assert_eq!(ledger.credit(&owner, 15).await.unwrap().balance, 115);
        assert_eq!(ledger.debit(&owner, 115).await.unwrap().balance, 0);
        assert!(ledger.debit(&owner, 1).await.is_err());
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let ledger = ledger();
        let owner = OwnerId::from("u1");
        for amount in [0, -5] {
            assert!(matches!(
                ledger.credit(&owner, amount).await,
                Err(EconomyError::Validation(_))
            ));
            assert!(matches!(
                ledger.debit(&owner, amount).await,
                Err(EconomyError::Validation(_))
            ));
        }
        assert!(matches!(
            ledger.find(&owner).await,
            Err(EconomyError::NotFound { kind: Missing::Wallet, .. })
        ));
    }

    #[tokio::test]
    async fn blank_owner_is_rejected() {
        let ledger = ledger();
        assert!(matches!(
            ledger.get_or_create(&OwnerId::from("  ")).await,
            Err(EconomyError::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_cannot_overdraw() {
        let ledger = ledger();
        let owner = OwnerId::from("u1");
        ledger.get_or_create(&owner).await.unwrap();

        let a = tokio::spawn({
            let ledger = ledger.clone();
            let owner = owner.clone();
            async move { ledger.debit(&owner, 60).await }
        });
        let b = tokio::spawn({
            let ledger = ledger.clone();
            let owner = owner.clone();
            async move { ledger.debit(&owner, 60).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(ledger.find(&owner).await.unwrap().balance, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_creates_one_wallet() {
        let ledger = ledger();
        let owner = OwnerId::from("u1");
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move { ledger.credit(&owner, 1).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(ledger.find(&owner).await.unwrap().balance, 108);
    }
}
