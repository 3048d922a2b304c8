//! Entitlement store.
//!
//! Read paths (`has_access`, grant lookups) run against the connection;
//! grant and revoke are invoked inside ledger transactions so that a
//! purchase debit and its grant, or a reversal and its revocation, commit
//! together or not at all.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use tessera_core::entitlement::{evaluate_access, AccessDecision, Grant};
use tessera_core::ledger::LedgerError;
use tessera_shared::types::{AccountId, ContentId};

use super::db_err;
use crate::convert::grant_from_model;
use crate::entities::{accounts, entitlements};

/// Repository for entitlement grants and access checks.
#[derive(Debug, Clone)]
pub struct EntitlementRepository {
    db: DatabaseConnection,
}

impl EntitlementRepository {
    /// Creates a new entitlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the live (unrevoked) grant for `(account, content)`, if any.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn find_live_grant(
        &self,
        account_id: AccountId,
        content_id: &ContentId,
    ) -> Result<Option<Grant>, LedgerError> {
        let model = entitlements::Entity::find()
            .filter(entitlements::Column::AccountId.eq(account_id.into_inner()))
            .filter(entitlements::Column::ContentId.eq(content_id.as_str()))
            .filter(entitlements::Column::RevokedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(grant_from_model))
    }

    /// Lists all grants (live and revoked) held by an account.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn grants_for(&self, account_id: AccountId) -> Result<Vec<Grant>, LedgerError> {
        let models = entitlements::Entity::find()
            .filter(entitlements::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(entitlements::Column::GrantedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(grant_from_model).collect())
    }

    /// Finds the grant sourced from a given purchase entry.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn find_grant_by_source(
        &self,
        source_entry_id: Uuid,
    ) -> Result<Option<Grant>, LedgerError> {
        let model = entitlements::Entity::find()
            .filter(entitlements::Column::SourceEntryId.eq(source_entry_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(grant_from_model))
    }

    /// Decides whether the account may view the content at `now`.
    ///
    /// Pure read: true iff a live grant exists or the account's subscription
    /// window still covers `now`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a database error.
    pub async fn has_access(
        &self,
        account_id: AccountId,
        content_id: &ContentId,
        now: DateTime<Utc>,
    ) -> Result<AccessDecision, LedgerError> {
        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id.into_inner()))?;

        let grant = self.find_live_grant(account_id, content_id).await?;

        Ok(evaluate_access(
            grant.as_ref(),
            account
                .subscription_expires_at
                .map(|ts| ts.with_timezone(&Utc)),
            now,
        ))
    }

    /// Records a grant inside a ledger transaction.
    ///
    /// The partial unique index on live grants makes a concurrent duplicate
    /// surface as a unique-constraint violation, which the caller treats as
    /// a lost race.
    ///
    /// # Errors
    ///
    /// Returns the underlying database error, including unique violations.
    pub async fn grant<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        content_id: &str,
        source_entry_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<entitlements::Model, DbErr> {
        entitlements::ActiveModel {
            id: Set(Uuid::now_v7()),
            account_id: Set(account_id),
            content_id: Set(content_id.to_string()),
            source_entry_id: Set(source_entry_id),
            granted_at: Set(now.into()),
            revoked_at: Set(None),
            revoked_by_entry_id: Set(None),
        }
        .insert(conn)
        .await
    }

    /// Revokes the live grant sourced from `source_entry_id` inside a ledger
    /// transaction. Returns the number of grants revoked (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns the underlying database error.
    pub async fn revoke_by_source<C: ConnectionTrait>(
        conn: &C,
        source_entry_id: Uuid,
        revoked_by_entry_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let update = entitlements::Entity::update_many()
            .set(entitlements::ActiveModel {
                revoked_at: Set(Some(now.into())),
                revoked_by_entry_id: Set(Some(revoked_by_entry_id)),
                ..Default::default()
            })
            .filter(entitlements::Column::SourceEntryId.eq(source_entry_id))
            .filter(entitlements::Column::RevokedAt.is_null())
            .exec(conn)
            .await?;

        Ok(update.rows_affected)
    }
}
