//! Account repository.
//!
//! Accounts are created once per user with zero balances and are only ever
//! mutated through [`super::LedgerRepository`] operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use tessera_core::ledger::{
    replay_balances, AccountState, Balances, LedgerError, Reconciliation,
};
use tessera_shared::types::{AccountId, Currency};

use super::db_err;
use crate::convert::{account_from_model, entry_from_model};
use crate::entities::{accounts, ledger_entries};

/// Account repository for creation and read paths.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a fresh account with zero balances.
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub async fn create_account(&self, currency: Currency) -> Result<AccountState, LedgerError> {
        let state = AccountState::new(AccountId::new(), currency);
        let now = Utc::now();

        accounts::ActiveModel {
            id: Set(state.id.into_inner()),
            currency: Set(state.currency.to_string()),
            available: Set(0),
            reserved: Set(0),
            subscription_expires_at: Set(None),
            version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        info!(account_id = %state.id, currency = %currency, "account created");
        Ok(state)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn find_account(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountState>, LedgerError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        model.map(account_from_model).transpose()
    }

    /// Loads an account, failing with `AccountNotFound` when absent.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a database error.
    pub async fn get_account(&self, id: AccountId) -> Result<AccountState, LedgerError> {
        self.find_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id.into_inner()))
    }

    /// Read-only view of the account's balances.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a database error.
    pub async fn balance_of(&self, id: AccountId) -> Result<Balances, LedgerError> {
        Ok(self.get_account(id).await?.balances())
    }

    /// Replays the committed entry log and compares it against the cached
    /// balances.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a database error.
    pub async fn reconcile(&self, id: AccountId) -> Result<Reconciliation, LedgerError> {
        let account = self.get_account(id).await?;

        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let entries = models
            .into_iter()
            .map(entry_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        let replayed = replay_balances(account.currency, &entries)?;
        Ok(Reconciliation::compare(account.balances(), replayed))
    }
}
