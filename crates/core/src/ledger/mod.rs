//! Balance accounting logic.
//!
//! This module implements the core ledger functionality:
//! - Ledger entries (deposits, purchases, subscription charges, reversals)
//! - Account balance state with optimistic-lock versioning
//! - Posting plans produced by the stateless ledger service
//! - Replay of committed entries for reconciliation
//! - Error types for ledger operations

pub mod account;
pub mod error;
pub mod replay;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use account::AccountState;
pub use error::LedgerError;
pub use replay::{replay_balances, Reconciliation};
pub use service::{
    DepositResolution, GrantAction, LedgerService, Posting, PurchasePlan,
};
pub use types::{
    Balances, BalanceBucket, EntryDraft, EntryKind, EntryStatus, LedgerEntry,
};
