//! Repository abstractions for data access.

pub mod account;
pub mod entitlement;
pub mod ledger;

pub use account::AccountRepository;
pub use entitlement::EntitlementRepository;
pub use ledger::{LedgerRepository, PurchaseOutcome};

use sea_orm::DbErr;
use tessera_core::ledger::LedgerError;

/// Maps a database error into the ledger error taxonomy.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}
