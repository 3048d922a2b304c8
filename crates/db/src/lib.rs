//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//!
//! The repositories are the transactional boundary of the ledger: every
//! mutating operation runs as one database transaction guarded by an
//! optimistic version check on the account row.

pub mod entities;
pub mod migration;
pub mod repositories;

mod convert;

pub use repositories::{
    AccountRepository, EntitlementRepository, LedgerRepository, PurchaseOutcome,
};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
