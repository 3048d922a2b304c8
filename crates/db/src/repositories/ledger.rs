//! Ledger repository: the transactional boundary.
//!
//! Every mutating operation here is single-account, atomic, and idempotent:
//! the posting planner in `tessera-core` decides what should happen against
//! a snapshot, and this repository commits the decision inside one database
//! transaction guarded by a conditional update on the account's `version`
//! column. A lost race surfaces as `ConcurrentModification`, is retried
//! with backoff, and becomes `Busy` when the attempt budget runs out —
//! regardless of how many callers or surfaces hammer the same account, the
//! balance moves exactly once per real-world event.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use tessera_core::entitlement::Grant;
use tessera_core::events::{EventSink, LedgerEvent, LedgerEventState};
use tessera_core::ledger::{
    AccountState, DepositResolution, EntryDraft, EntryStatus, GrantAction, LedgerEntry,
    LedgerError, LedgerService, Posting, PurchasePlan,
};
use tessera_core::workflow::{
    ApprovalWorkflow, DepositDecision, DepositTransition, ModeratorAction,
};
use tessera_shared::config::LedgerConfig;
use tessera_shared::types::{AccountId, ContentId, EntryId, Money};

use super::db_err;
use super::entitlement::EntitlementRepository;
use crate::convert::{account_from_model, entry_from_model};
use crate::entities::{accounts, ledger_entries, sea_orm_active_enums};

/// Outcome of a purchase operation.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// The balance was debited and a grant recorded.
    Charged {
        /// The committed purchase entry.
        entry: LedgerEntry,
        /// The freshly recorded grant.
        grant: Grant,
    },
    /// A live grant already covered the content; nothing was charged.
    AlreadyOwned {
        /// The prior grant.
        grant: Grant,
    },
    /// An active subscription covers the content; nothing was charged.
    CoveredBySubscription {
        /// When the covering subscription lapses.
        expires_at: DateTime<Utc>,
    },
}

/// The transactional ledger service.
#[derive(Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
    events: Arc<dyn EventSink>,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: LedgerConfig, events: Arc<dyn EventSink>) -> Self {
        Self { db, config, events }
    }

    // ========================================================================
    // Deposits
    // ========================================================================

    /// Records a pending deposit request. No balance effect until a
    /// moderator resolves it.
    ///
    /// Replaying the same `idempotency_key` returns the original entry
    /// instead of creating a second one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `CurrencyMismatch`, `AccountNotFound`, or a
    /// database error.
    pub async fn request_deposit(
        &self,
        account_id: AccountId,
        amount: Money,
        external_ref: Option<String>,
        idempotency_key: String,
    ) -> Result<LedgerEntry, LedgerError> {
        if let Some(existing) = self.find_by_idempotency_key(&idempotency_key).await? {
            debug!(entry_id = %existing.id, key = %idempotency_key, "idempotent deposit replay");
            return Ok(existing);
        }

        let account = self.load_account(account_id).await?;
        let draft =
            LedgerService::request_deposit(&account, amount, external_ref, idempotency_key)?;

        let now = Utc::now();
        let inserted = match insert_draft(&self.db, &account, &draft, None, now).await {
            Ok(model) => model,
            // Two callers raced the same key past the lookup; the unique
            // constraint picked the winner.
            Err(err) if is_unique_violation(&err) => {
                let key = draft.idempotency_key.as_deref().unwrap_or_default();
                return self
                    .find_by_idempotency_key(key)
                    .await?
                    .ok_or_else(|| db_err(err));
            }
            Err(err) => return Err(db_err(err)),
        };

        let entry = entry_from_model(inserted)?;
        info!(
            account_id = %account_id,
            entry_id = %entry.id,
            amount = %entry.amount,
            "deposit requested"
        );

        self.events
            .publish(LedgerEvent {
                account_id,
                entry_id: entry.id,
                state: LedgerEventState::DepositPending,
                reason: None,
            })
            .await;

        Ok(entry)
    }

    /// Approves a pending deposit, crediting `available` exactly once.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `EntryNotPending`, `Busy`, or a database
    /// error.
    pub async fn approve_deposit(
        &self,
        entry_id: EntryId,
        approver_ref: String,
        notes: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.resolve_deposit(ModeratorAction {
            entry_id,
            decision: DepositDecision::Approve,
            actor_ref: approver_ref,
            reason: notes,
        })
        .await
    }

    /// Rejects a pending deposit. No balance effect.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `EntryNotPending`,
    /// `Workflow(RejectionReasonRequired)`, `Busy`, or a database error.
    pub async fn reject_deposit(
        &self,
        entry_id: EntryId,
        approver_ref: String,
        reason: String,
    ) -> Result<LedgerEntry, LedgerError> {
        self.resolve_deposit(ModeratorAction {
            entry_id,
            decision: DepositDecision::Reject,
            actor_ref: approver_ref,
            reason: Some(reason),
        })
        .await
    }

    /// Resolves a pending deposit with a moderator decision.
    ///
    /// Every moderation surface routes through this single entry point, so
    /// an admin click and a chat-callback racing on the same deposit cannot
    /// credit twice: the loser either sees the entry already resolved (same
    /// decision, returned unchanged) or gets `EntryNotPending`.
    ///
    /// # Errors
    ///
    /// See [`Self::approve_deposit`] and [`Self::reject_deposit`].
    pub async fn resolve_deposit(
        &self,
        action: ModeratorAction,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.load_entry(action.entry_id).await?;
        self.retry_contended(entry.account_id.into_inner(), || {
            self.try_resolve_deposit(&action)
        })
        .await
    }

    async fn try_resolve_deposit(
        &self,
        action: &ModeratorAction,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.load_entry(action.entry_id).await?;

        let transition =
            ApprovalWorkflow::decide(&entry, action.decision, action.reason.as_deref())?;
        let new_status = match transition {
            DepositTransition::AlreadyResolved => {
                debug!(entry_id = %entry.id, decision = %action.decision, "deposit already resolved");
                return Ok(entry);
            }
            DepositTransition::Apply { new_status } => new_status,
        };

        let account = self.load_account(entry.account_id).await?;
        let resolution = match action.decision {
            DepositDecision::Approve => LedgerService::approve_deposit(&account, &entry)?,
            DepositDecision::Reject => LedgerService::reject_deposit(&account, &entry)?,
        };
        let updated_account = match resolution {
            DepositResolution::AlreadyResolved => return Ok(entry),
            DepositResolution::Applied { account, .. } => account,
        };

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        // A rejection leaves balances alone, so only approvals touch the
        // account row; the conditional update on the entry serializes both.
        if action.decision == DepositDecision::Approve
            && !cas_account_update(&txn, &updated_account, now)
                .await
                .map_err(db_err)?
        {
            txn.rollback().await.map_err(db_err)?;
            return Err(LedgerError::ConcurrentModification(
                entry.account_id.into_inner(),
            ));
        }

        let resolved = ledger_entries::Entity::update_many()
            .set(ledger_entries::ActiveModel {
                status: Set(new_status.into()),
                actor_ref: Set(Some(action.actor_ref.clone())),
                reason: Set(action.reason.clone()),
                committed_at: Set(Some(now.into())),
                ..Default::default()
            })
            .filter(ledger_entries::Column::Id.eq(entry.id.into_inner()))
            .filter(ledger_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::Pending))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if resolved.rows_affected != 1 {
            txn.rollback().await.map_err(db_err)?;
            return Err(LedgerError::ConcurrentModification(
                entry.account_id.into_inner(),
            ));
        }

        txn.commit().await.map_err(db_err)?;

        let entry = self.load_entry(action.entry_id).await?;
        info!(
            account_id = %entry.account_id,
            entry_id = %entry.id,
            decision = %action.decision,
            actor = %action.actor_ref,
            "deposit resolved"
        );

        self.events
            .publish(ApprovalWorkflow::transition_event(&entry, new_status))
            .await;

        Ok(entry)
    }

    // ========================================================================
    // Purchases & subscriptions
    // ========================================================================

    /// Purchases a piece of content: checks the balance, debits it, and
    /// grants the entitlement in one transaction.
    ///
    /// Holding a live grant or an active subscription makes this a no-op
    /// that reports the existing coverage instead of double-charging.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `CurrencyMismatch`, `InsufficientBalance`,
    /// `AccountNotFound`, `Busy`, or a database error.
    pub async fn purchase(
        &self,
        account_id: AccountId,
        content_id: &ContentId,
        price: Money,
        idempotency_key: Option<String>,
    ) -> Result<PurchaseOutcome, LedgerError> {
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                let grant = self
                    .entitlements()
                    .find_grant_by_source(existing.id.into_inner())
                    .await?
                    .ok_or_else(|| {
                        LedgerError::Database("purchase entry without grant".to_string())
                    })?;
                debug!(entry_id = %existing.id, key, "idempotent purchase replay");
                return Ok(PurchaseOutcome::Charged {
                    entry: existing,
                    grant,
                });
            }
        }

        self.retry_contended(account_id.into_inner(), || {
            self.try_purchase(account_id, content_id, price, idempotency_key.clone())
        })
        .await
    }

    async fn try_purchase(
        &self,
        account_id: AccountId,
        content_id: &ContentId,
        price: Money,
        idempotency_key: Option<String>,
    ) -> Result<PurchaseOutcome, LedgerError> {
        let account = self.load_account(account_id).await?;
        let live_grant = self
            .entitlements()
            .find_live_grant(account_id, content_id)
            .await?;

        let now = Utc::now();
        let plan =
            LedgerService::purchase(&account, live_grant.as_ref(), content_id, price, now)?;

        let mut posting = match plan {
            PurchasePlan::AlreadyOwned { grant } => {
                return Ok(PurchaseOutcome::AlreadyOwned { grant });
            }
            PurchasePlan::CoveredBySubscription { expires_at } => {
                return Ok(PurchaseOutcome::CoveredBySubscription { expires_at });
            }
            PurchasePlan::Charge(posting) => posting,
        };
        posting.entries[0].idempotency_key = idempotency_key;

        let entry = self.commit_first(&posting, None, now).await?;
        let grant = self
            .entitlements()
            .find_grant_by_source(entry.id.into_inner())
            .await?
            .ok_or_else(|| LedgerError::Database("grant missing after commit".to_string()))?;

        info!(
            account_id = %account_id,
            entry_id = %entry.id,
            content_id = %content_id,
            price = %price,
            "content purchased"
        );

        self.events
            .publish(LedgerEvent {
                account_id,
                entry_id: entry.id,
                state: LedgerEventState::PurchaseCompleted,
                reason: None,
            })
            .await;

        Ok(PurchaseOutcome::Charged { entry, grant })
    }

    /// Charges for a subscription window and extends
    /// `subscription_expires_at` to `max(now, current expiry) + duration`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `InvalidDuration`, `InsufficientBalance`,
    /// `AccountNotFound`, `Busy`, or a database error.
    pub async fn subscribe(
        &self,
        account_id: AccountId,
        price: Money,
        duration_days: u32,
        idempotency_key: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                debug!(entry_id = %existing.id, key, "idempotent subscription replay");
                return Ok(existing);
            }
        }

        self.retry_contended(account_id.into_inner(), || {
            self.try_subscribe(account_id, price, duration_days, idempotency_key.clone())
        })
        .await
    }

    async fn try_subscribe(
        &self,
        account_id: AccountId,
        price: Money,
        duration_days: u32,
        idempotency_key: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let account = self.load_account(account_id).await?;
        let now = Utc::now();
        let mut posting = LedgerService::subscribe(&account, price, duration_days, now)?;
        posting.entries[0].idempotency_key = idempotency_key;

        let entry = self.commit_first(&posting, None, now).await?;
        info!(
            account_id = %account_id,
            entry_id = %entry.id,
            price = %price,
            duration_days,
            "subscription extended"
        );

        self.events
            .publish(LedgerEvent {
                account_id,
                entry_id: entry.id,
                state: LedgerEventState::SubscriptionExtended,
                reason: None,
            })
            .await;

        Ok(entry)
    }

    // ========================================================================
    // Reversals & adjustments
    // ========================================================================

    /// Reverses a committed entry: credits back the original amount through
    /// a linked reversal entry, revoking the entitlement for purchases.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `EntryNotReversible`,
    /// `InsufficientBalance` (clawing back a spent deposit), `Busy`, or a
    /// database error.
    pub async fn reverse(
        &self,
        entry_id: EntryId,
        reason: String,
    ) -> Result<LedgerEntry, LedgerError> {
        let original = self.load_entry(entry_id).await?;
        self.retry_contended(original.account_id.into_inner(), || {
            self.try_reverse(entry_id, reason.clone())
        })
        .await
    }

    async fn try_reverse(
        &self,
        entry_id: EntryId,
        reason: String,
    ) -> Result<LedgerEntry, LedgerError> {
        let original = self.load_entry(entry_id).await?;
        let account = self.load_account(original.account_id).await?;
        let now = Utc::now();

        let posting = LedgerService::reverse(&account, &original, reason.clone())?;
        let entry = self
            .commit_first(&posting, Some(original.id.into_inner()), now)
            .await?;

        info!(
            account_id = %original.account_id,
            entry_id = %original.id,
            reversal_id = %entry.id,
            "entry reversed"
        );

        self.events
            .publish(LedgerEvent {
                account_id: original.account_id,
                entry_id: entry.id,
                state: LedgerEventState::EntryReversed,
                reason: Some(reason),
            })
            .await;

        Ok(entry)
    }

    /// Applies a signed admin adjustment to `available`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `InsufficientBalance`, `AccountNotFound`,
    /// `Busy`, or a database error.
    pub async fn adjust(
        &self,
        account_id: AccountId,
        amount: Money,
        reason: String,
        actor_ref: String,
        idempotency_key: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                debug!(entry_id = %existing.id, key, "idempotent adjustment replay");
                return Ok(existing);
            }
        }

        self.retry_contended(account_id.into_inner(), || {
            self.try_adjust(
                account_id,
                amount,
                reason.clone(),
                actor_ref.clone(),
                idempotency_key.clone(),
            )
        })
        .await
    }

    async fn try_adjust(
        &self,
        account_id: AccountId,
        amount: Money,
        reason: String,
        actor_ref: String,
        idempotency_key: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let account = self.load_account(account_id).await?;
        let now = Utc::now();
        let mut posting =
            LedgerService::adjust(&account, amount, reason.clone(), actor_ref.clone())?;
        posting.entries[0].idempotency_key = idempotency_key;

        let entry = self.commit_first(&posting, None, now).await?;
        info!(
            account_id = %account_id,
            entry_id = %entry.id,
            amount = %amount,
            actor = %actor_ref,
            "balance adjusted"
        );

        self.events
            .publish(LedgerEvent {
                account_id,
                entry_id: entry.id,
                state: LedgerEventState::BalanceAdjusted,
                reason: Some(reason),
            })
            .await;

        Ok(entry)
    }

    // ========================================================================
    // Holds
    // ========================================================================

    /// Moves funds from `available` into `reserved` as a linked pair of
    /// committed legs. Returns the available-bucket leg, which is the handle
    /// for releasing the hold.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `InsufficientBalance`, `AccountNotFound`,
    /// `Busy`, or a database error.
    pub async fn hold_funds(
        &self,
        account_id: AccountId,
        amount: Money,
        reason: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.retry_contended(account_id.into_inner(), || {
            self.try_hold(account_id, amount, reason.clone())
        })
        .await
    }

    async fn try_hold(
        &self,
        account_id: AccountId,
        amount: Money,
        reason: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let account = self.load_account(account_id).await?;
        let now = Utc::now();
        let posting = LedgerService::hold(&account, amount, reason.clone())?;

        let entry = self.commit_first(&posting, None, now).await?;
        info!(account_id = %account_id, entry_id = %entry.id, amount = %amount, "funds held");

        self.events
            .publish(LedgerEvent {
                account_id,
                entry_id: entry.id,
                state: LedgerEventState::FundsHeld,
                reason,
            })
            .await;

        Ok(entry)
    }

    /// Releases a hold, returning the earmarked funds to `available`.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `EntryNotReversible` (wrong leg or already
    /// released), `Busy`, or a database error.
    pub async fn release_hold(&self, hold_entry_id: EntryId) -> Result<LedgerEntry, LedgerError> {
        let hold_leg = self.load_entry(hold_entry_id).await?;
        self.retry_contended(hold_leg.account_id.into_inner(), || {
            self.try_release(hold_entry_id)
        })
        .await
    }

    async fn try_release(&self, hold_entry_id: EntryId) -> Result<LedgerEntry, LedgerError> {
        let hold_leg = self.load_entry(hold_entry_id).await?;
        let account = self.load_account(hold_leg.account_id).await?;
        let now = Utc::now();

        let posting = LedgerService::release(&account, &hold_leg)?;
        let entry = self
            .commit_first(&posting, Some(hold_leg.id.into_inner()), now)
            .await?;

        info!(
            account_id = %hold_leg.account_id,
            hold_id = %hold_leg.id,
            release_id = %entry.id,
            "hold released"
        );

        self.events
            .publish(LedgerEvent {
                account_id: hold_leg.account_id,
                entry_id: entry.id,
                state: LedgerEventState::HoldReleased,
                reason: None,
            })
            .await;

        Ok(entry)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Lists an account's entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list_entries(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models.into_iter().map(entry_from_model).collect()
    }

    /// Lists all pending deposits across accounts, oldest first (the
    /// moderation queue).
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn pending_deposits(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::Pending))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models.into_iter().map(entry_from_model).collect()
    }

    /// Loads a single entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or a database error.
    pub async fn load_entry(&self, entry_id: EntryId) -> Result<LedgerEntry, LedgerError> {
        let model = ledger_entries::Entity::find_by_id(entry_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(entry_id.into_inner()))?;

        entry_from_model(model)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn entitlements(&self) -> EntitlementRepository {
        EntitlementRepository::new(self.db.clone())
    }

    async fn load_account(&self, account_id: AccountId) -> Result<AccountState, LedgerError> {
        let model = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id.into_inner()))?;

        account_from_model(model)
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        model.map(entry_from_model).transpose()
    }

    /// Commits a posting and returns its first entry.
    async fn commit_first(
        &self,
        posting: &Posting,
        mark_reversed: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let models = self.commit_posting(posting, mark_reversed, now).await?;
        entry_from_model(models.into_iter().next().ok_or_else(|| {
            LedgerError::Database("posting committed without entries".to_string())
        })?)
    }

    /// Commits a posting atomically: account CAS, entry inserts, grant side
    /// effect, and (for reversals/releases) the `reversed_by` back-link on
    /// the original entry, all in one transaction.
    async fn commit_posting(
        &self,
        posting: &Posting,
        mark_reversed: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ledger_entries::Model>, LedgerError> {
        let account_uuid = posting.account.id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;

        if !cas_account_update(&txn, &posting.account, now)
            .await
            .map_err(db_err)?
        {
            txn.rollback().await.map_err(db_err)?;
            return Err(LedgerError::ConcurrentModification(account_uuid));
        }

        let mut models = Vec::with_capacity(posting.entries.len());
        let mut first_id = None;
        for draft in &posting.entries {
            let model = insert_draft(&txn, &posting.account, draft, first_id, now)
                .await
                .map_err(db_err)?;
            if first_id.is_none() {
                first_id = Some(model.id);
            }
            models.push(model);
        }
        let first_id =
            first_id.ok_or_else(|| LedgerError::Database("empty posting".to_string()))?;

        if let Some(original_id) = mark_reversed {
            let update = ledger_entries::Entity::update_many()
                .set(ledger_entries::ActiveModel {
                    reversed_by: Set(Some(first_id)),
                    ..Default::default()
                })
                .filter(ledger_entries::Column::Id.eq(original_id))
                .filter(ledger_entries::Column::ReversedBy.is_null())
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if update.rows_affected != 1 {
                txn.rollback().await.map_err(db_err)?;
                return Err(LedgerError::ConcurrentModification(account_uuid));
            }
        }

        match &posting.grant {
            GrantAction::None => {}
            GrantAction::Grant { content_id } => {
                let inserted = EntitlementRepository::grant(
                    &txn,
                    account_uuid,
                    content_id.as_str(),
                    first_id,
                    now,
                )
                .await;
                match inserted {
                    Ok(_) => {}
                    // A concurrent purchase of the same content won the
                    // live-grant index; rerun to observe it.
                    Err(err) if is_unique_violation(&err) => {
                        txn.rollback().await.map_err(db_err)?;
                        return Err(LedgerError::ConcurrentModification(account_uuid));
                    }
                    Err(err) => return Err(db_err(err)),
                }
            }
            GrantAction::RevokeFor { source_entry_id } => {
                EntitlementRepository::revoke_by_source(
                    &txn,
                    source_entry_id.into_inner(),
                    first_id,
                    now,
                )
                .await
                .map_err(db_err)?;
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(models)
    }

    /// Runs one attempt of a contended operation, retrying lost optimistic
    /// races with linear backoff until the attempt budget is spent.
    async fn retry_contended<T, F, Fut>(&self, account_id: Uuid, f: F) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Err(LedgerError::ConcurrentModification(id)) if attempt < max_attempts => {
                    debug!(account_id = %id, attempt, "optimistic lock conflict, retrying");
                    tokio::time::sleep(Duration::from_millis(
                        self.config.retry_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
                Err(LedgerError::ConcurrentModification(_)) => {
                    return Err(LedgerError::Busy {
                        account_id,
                        attempts: attempt,
                    });
                }
                other => return other,
            }
        }
    }
}

/// Conditionally writes the post-operation account state, guarded on the
/// version the planner saw. Returns false when the row moved underneath us.
async fn cas_account_update(
    txn: &DatabaseTransaction,
    account: &AccountState,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let update = accounts::Entity::update_many()
        .set(accounts::ActiveModel {
            available: Set(account.available.amount),
            reserved: Set(account.reserved.amount),
            subscription_expires_at: Set(account.subscription_expires_at.map(Into::into)),
            version: Set(account.version + 1),
            updated_at: Set(now.into()),
            ..Default::default()
        })
        .filter(accounts::Column::Id.eq(account.id.into_inner()))
        .filter(accounts::Column::Version.eq(account.version))
        .exec(txn)
        .await?;

    Ok(update.rows_affected == 1)
}

/// Inserts one planned entry. A paired second leg is linked to the first
/// entry of its posting when the draft carries no explicit back-reference.
async fn insert_draft<C: sea_orm::ConnectionTrait>(
    conn: &C,
    account: &AccountState,
    draft: &EntryDraft,
    sibling: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<ledger_entries::Model, DbErr> {
    let committed = draft.status == EntryStatus::Committed;
    ledger_entries::ActiveModel {
        id: Set(EntryId::new().into_inner()),
        account_id: Set(account.id.into_inner()),
        kind: Set(draft.kind.into()),
        status: Set(draft.status.into()),
        bucket: Set(draft.bucket.into()),
        amount: Set(draft.amount.amount),
        currency: Set(draft.amount.currency.to_string()),
        related_entry_id: Set(draft
            .related_entry_id
            .map(EntryId::into_inner)
            .or(sibling)),
        reversed_by: Set(None),
        external_ref: Set(draft.external_ref.clone()),
        idempotency_key: Set(draft.idempotency_key.clone()),
        actor_ref: Set(draft.actor_ref.clone()),
        reason: Set(draft.reason.clone()),
        created_at: Set(now.into()),
        committed_at: Set(committed.then(|| now.into())),
    }
    .insert(conn)
    .await
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
