//! Economy services for Koin: wallets, daily quests, item ownership and
//! payment reconciliation.
//!
//! Services talk to storage only through the ports in [`repo`]. Every
//! precondition-dependent write (debit, claim, equip, payment credit) is a
//! single atomic operation in the adapter; multi-step flows compensate on
//! failure instead of leaving partial state.
//!
//! # Modules
//!
//! - [`wallet`] -- [`WalletLedger`]: get-or-create, credit, conditional debit
//! - [`quests`] -- [`QuestEngine`]: daily sets, progress, claim-once rewards
//! - [`ownership`] -- [`OwnershipStore`]: purchases with refund, exclusive equip
//! - [`payments`] -- [`PaymentReconciler`]: exactly-once payment credits
//! - [`economy`] -- [`Economy`]: the assembled services and cross-service hooks
//! - [`repo`] -- Repository ports
//! - [`memory`] -- [`MemoryStore`], an in-process implementation of every port
//! - [`clock`] -- Injected wall clock
//! - [`config`] -- [`EconomySettings`]
//! - [`error`] -- [`EconomyError`] and [`RepoError`]

pub mod clock;
pub mod config;
pub mod economy;
pub mod error;
pub mod memory;
pub mod ownership;
pub mod payments;
pub mod quests;
pub mod repo;
pub mod wallet;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EconomySettings;
pub use economy::{Economy, InteractionReceipt, Repositories};
pub use error::{ConflictReason, EconomyError, Missing, RepoError};
pub use memory::MemoryStore;
pub use ownership::OwnershipStore;
pub use payments::{
    HmacSignatureVerifier, NoVerification, NotificationVerifier, PaymentNotification,
    PaymentReconciler, ReconcileOutcome,
};
pub use quests::QuestEngine;
pub use repo::{DebitOutcome, ItemRepo, PaymentApplication, PaymentRepo, QuestRepo, WalletRepo};
pub use wallet::WalletLedger;
