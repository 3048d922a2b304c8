//! Stateless posting planner.
//!
//! `LedgerService` contains the pure decision logic for every balance
//! mutation: it validates an operation against a snapshot of the account and
//! the targeted entries, and produces a [`Posting`] describing the new
//! account state, the entries to append, and any entitlement effect. The
//! repository persists a posting atomically under the account's optimistic
//! lock; nothing here touches a database.

use chrono::{DateTime, Utc};
use tessera_shared::types::{ContentId, EntryId, Money};

use super::account::AccountState;
use super::error::LedgerError;
use super::types::{BalanceBucket, EntryDraft, EntryKind, EntryStatus, LedgerEntry};
use crate::entitlement::Grant;

/// Entitlement side effect carried by a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantAction {
    /// No entitlement change.
    None,
    /// Grant the content to the account, sourced from the posting's entry.
    Grant {
        /// The content being unlocked.
        content_id: ContentId,
    },
    /// Revoke the live grant sourced from the given purchase entry.
    RevokeFor {
        /// The purchase entry whose grant is revoked.
        source_entry_id: EntryId,
    },
}

/// A planned, not yet persisted, atomic balance mutation.
///
/// `account` carries the post-operation balances with the *pre-operation*
/// version; the repository commits it with `version = version + 1` guarded
/// by a conditional update on the old version. Entries are appended in
/// order; when a posting carries a paired second leg, the repository links
/// it to the first via `related_entry_id`.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Post-operation account state.
    pub account: AccountState,
    /// Entries to append, in order.
    pub entries: Vec<EntryDraft>,
    /// Entitlement side effect, applied in the same transaction.
    pub grant: GrantAction,
}

/// Outcome of planning a purchase.
#[derive(Debug, Clone)]
pub enum PurchasePlan {
    /// Debit the balance, append the purchase entry, grant the content.
    Charge(Posting),
    /// A live grant already covers the content; nothing is charged and the
    /// prior grant is returned.
    AlreadyOwned {
        /// The existing grant.
        grant: Grant,
    },
    /// An active subscription covers the content; nothing is charged.
    CoveredBySubscription {
        /// When the covering subscription lapses.
        expires_at: DateTime<Utc>,
    },
}

/// Outcome of resolving a pending deposit.
#[derive(Debug, Clone)]
pub enum DepositResolution {
    /// The entry was pending; persist the new state.
    Applied {
        /// Post-resolution account state (unchanged for rejections).
        account: AccountState,
        /// The terminal status the entry resolves to.
        new_status: EntryStatus,
    },
    /// The entry already reached the requested state; return it unchanged.
    AlreadyResolved,
}

/// Stateless ledger service.
///
/// All methods are pure: same inputs, same plan.
pub struct LedgerService;

impl LedgerService {
    /// Plans a deposit request.
    ///
    /// The entry is created pending and has no balance effect until a
    /// moderator resolves it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and
    /// `CurrencyMismatch` when the amount is not in the account's currency.
    pub fn request_deposit(
        account: &AccountState,
        amount: Money,
        external_ref: Option<String>,
        idempotency_key: String,
    ) -> Result<EntryDraft, LedgerError> {
        Self::require_positive(amount)?;
        Self::require_account_currency(account, amount)?;

        Ok(EntryDraft {
            kind: EntryKind::Deposit,
            status: EntryStatus::Pending,
            bucket: BalanceBucket::Available,
            amount,
            related_entry_id: None,
            external_ref,
            idempotency_key: Some(idempotency_key),
            actor_ref: None,
            reason: None,
        })
    }

    /// Plans the approval of a pending deposit: credits `available` by the
    /// entry's amount.
    ///
    /// Re-approving an entry that already committed yields
    /// [`DepositResolution::AlreadyResolved`] — the balance is credited at
    /// most once no matter how many surfaces deliver the same approval.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotPending` if the entry was rejected.
    pub fn approve_deposit(
        account: &AccountState,
        entry: &LedgerEntry,
    ) -> Result<DepositResolution, LedgerError> {
        match entry.status {
            EntryStatus::Committed => Ok(DepositResolution::AlreadyResolved),
            EntryStatus::Rejected => Err(LedgerError::EntryNotPending {
                entry_id: entry.id.into_inner(),
                status: entry.status,
            }),
            EntryStatus::Pending => {
                let mut account = account.clone();
                account.apply(entry.bucket, entry.amount)?;
                Ok(DepositResolution::Applied {
                    account,
                    new_status: EntryStatus::Committed,
                })
            }
        }
    }

    /// Plans the rejection of a pending deposit. No balance effect.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotPending` if the entry was approved.
    pub fn reject_deposit(
        account: &AccountState,
        entry: &LedgerEntry,
    ) -> Result<DepositResolution, LedgerError> {
        match entry.status {
            EntryStatus::Rejected => Ok(DepositResolution::AlreadyResolved),
            EntryStatus::Committed => Err(LedgerError::EntryNotPending {
                entry_id: entry.id.into_inner(),
                status: entry.status,
            }),
            EntryStatus::Pending => Ok(DepositResolution::Applied {
                account: account.clone(),
                new_status: EntryStatus::Rejected,
            }),
        }
    }

    /// Plans a per-content purchase.
    ///
    /// Checks the balance covers the price before debiting; there is never a
    /// partial debit. Holding a live grant, or an active subscription, makes
    /// the call a no-op rather than a double charge.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `CurrencyMismatch`, or
    /// `InsufficientBalance`.
    pub fn purchase(
        account: &AccountState,
        live_grant: Option<&Grant>,
        content_id: &ContentId,
        price: Money,
        now: DateTime<Utc>,
    ) -> Result<PurchasePlan, LedgerError> {
        Self::require_positive(price)?;
        Self::require_account_currency(account, price)?;

        if let Some(grant) = live_grant.filter(|g| g.is_live()) {
            return Ok(PurchasePlan::AlreadyOwned {
                grant: grant.clone(),
            });
        }

        if let Some(expires_at) = account
            .subscription_expires_at
            .filter(|expiry| *expiry > now)
        {
            return Ok(PurchasePlan::CoveredBySubscription { expires_at });
        }

        let mut updated = account.clone();
        updated.apply(BalanceBucket::Available, price.checked_neg()?)?;

        Ok(PurchasePlan::Charge(Posting {
            account: updated,
            entries: vec![EntryDraft::committed(
                EntryKind::Purchase,
                BalanceBucket::Available,
                price.checked_neg()?,
            )],
            grant: GrantAction::Grant {
                content_id: content_id.clone(),
            },
        }))
    }

    /// Plans a subscription charge: debits the price and extends the window
    /// to `max(now, current expiry) + duration_days`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `InvalidDuration`, `CurrencyMismatch`, or
    /// `InsufficientBalance`.
    pub fn subscribe(
        account: &AccountState,
        price: Money,
        duration_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Posting, LedgerError> {
        Self::require_positive(price)?;
        Self::require_account_currency(account, price)?;
        if duration_days == 0 {
            return Err(LedgerError::InvalidDuration(duration_days));
        }

        let mut updated = account.clone();
        updated.apply(BalanceBucket::Available, price.checked_neg()?)?;
        updated.subscription_expires_at = Some(account.extended_expiry(now, duration_days));

        Ok(Posting {
            account: updated,
            entries: vec![EntryDraft::committed(
                EntryKind::SubscriptionCharge,
                BalanceBucket::Available,
                price.checked_neg()?,
            )],
            grant: GrantAction::None,
        })
    }

    /// Plans the reversal of a committed entry: a compensating entry with
    /// the negated amount, linked via `related_entry_id`. Reversing a
    /// purchase also revokes its grant.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotReversible` for pending, rejected, already-reversed,
    /// or non-reversible-kind entries, and `InsufficientBalance` when
    /// clawing back a spent deposit would overdraw.
    pub fn reverse(
        account: &AccountState,
        original: &LedgerEntry,
        reason: String,
    ) -> Result<Posting, LedgerError> {
        if original.status != EntryStatus::Committed
            || original.reversed_by.is_some()
            || !original.kind.is_reversible()
        {
            return Err(LedgerError::EntryNotReversible(original.id.into_inner()));
        }

        let delta = original.amount.checked_neg()?;
        let mut updated = account.clone();
        updated.apply(original.bucket, delta)?;

        let mut draft = EntryDraft::committed(EntryKind::Reversal, original.bucket, delta);
        draft.related_entry_id = Some(original.id);
        draft.reason = Some(reason);

        let grant = if original.kind == EntryKind::Purchase {
            GrantAction::RevokeFor {
                source_entry_id: original.id,
            }
        } else {
            GrantAction::None
        };

        Ok(Posting {
            account: updated,
            entries: vec![draft],
            grant,
        })
    }

    /// Plans a signed admin adjustment against `available`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a zero amount, `CurrencyMismatch`, or
    /// `InsufficientBalance` when a negative adjustment would overdraw.
    pub fn adjust(
        account: &AccountState,
        amount: Money,
        reason: String,
        actor_ref: String,
    ) -> Result<Posting, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount(0));
        }
        Self::require_account_currency(account, amount)?;

        let mut updated = account.clone();
        updated.apply(BalanceBucket::Available, amount)?;

        let mut draft =
            EntryDraft::committed(EntryKind::AdminAdjustment, BalanceBucket::Available, amount);
        draft.reason = Some(reason);
        draft.actor_ref = Some(actor_ref);

        Ok(Posting {
            account: updated,
            entries: vec![draft],
            grant: GrantAction::None,
        })
    }

    /// Plans a hold: moves funds from available into reserved as a pair of
    /// committed legs (one per bucket).
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `CurrencyMismatch`, or
    /// `InsufficientBalance`.
    pub fn hold(
        account: &AccountState,
        amount: Money,
        reason: Option<String>,
    ) -> Result<Posting, LedgerError> {
        Self::require_positive(amount)?;
        Self::require_account_currency(account, amount)?;

        let mut updated = account.clone();
        updated.apply(BalanceBucket::Available, amount.checked_neg()?)?;
        updated.apply(BalanceBucket::Reserved, amount)?;

        let mut available_leg = EntryDraft::committed(
            EntryKind::Hold,
            BalanceBucket::Available,
            amount.checked_neg()?,
        );
        available_leg.reason = reason.clone();
        let mut reserved_leg =
            EntryDraft::committed(EntryKind::Hold, BalanceBucket::Reserved, amount);
        reserved_leg.reason = reason;

        Ok(Posting {
            account: updated,
            entries: vec![available_leg, reserved_leg],
            grant: GrantAction::None,
        })
    }

    /// Plans the release of a hold: moves the held amount back from
    /// reserved to available.
    ///
    /// `hold_entry` must be the available-bucket leg of the hold pair (the
    /// one carrying the negative delta).
    ///
    /// # Errors
    ///
    /// Returns `EntryNotReversible` if the entry is not an unreleased hold
    /// leg.
    pub fn release(
        account: &AccountState,
        hold_entry: &LedgerEntry,
    ) -> Result<Posting, LedgerError> {
        if hold_entry.kind != EntryKind::Hold
            || hold_entry.bucket != BalanceBucket::Available
            || hold_entry.status != EntryStatus::Committed
            || hold_entry.reversed_by.is_some()
        {
            return Err(LedgerError::EntryNotReversible(hold_entry.id.into_inner()));
        }

        // The available leg carries -amount; releasing restores +amount.
        let amount = hold_entry.amount.checked_neg()?;

        let mut updated = account.clone();
        updated.apply(BalanceBucket::Reserved, amount.checked_neg()?)?;
        updated.apply(BalanceBucket::Available, amount)?;

        let mut reserved_leg = EntryDraft::committed(
            EntryKind::HoldRelease,
            BalanceBucket::Reserved,
            amount.checked_neg()?,
        );
        reserved_leg.related_entry_id = Some(hold_entry.id);
        let mut available_leg =
            EntryDraft::committed(EntryKind::HoldRelease, BalanceBucket::Available, amount);
        available_leg.related_entry_id = Some(hold_entry.id);

        Ok(Posting {
            account: updated,
            entries: vec![reserved_leg, available_leg],
            grant: GrantAction::None,
        })
    }

    fn require_positive(amount: Money) -> Result<(), LedgerError> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(LedgerError::InvalidAmount(amount.amount))
        }
    }

    fn require_account_currency(account: &AccountState, amount: Money) -> Result<(), LedgerError> {
        if account.currency == amount.currency {
            Ok(())
        } else {
            Err(LedgerError::CurrencyMismatch {
                left: account.currency,
                right: amount.currency,
            })
        }
    }
}
