//! Account balance state.
//!
//! The account row is a derived cache over the entry log. Both balances are
//! invariantly non-negative; every mutation goes through checked arithmetic
//! and is rejected rather than allowed to overdraw.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tessera_shared::types::{AccountId, Currency, Money};

use super::error::LedgerError;
use super::types::{BalanceBucket, Balances};

/// Per-user balance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// The account ID.
    pub id: AccountId,
    /// The account's currency; every entry must match it.
    pub currency: Currency,
    /// The spendable balance. Never negative.
    pub available: Money,
    /// Funds earmarked for an in-flight operation. Never negative.
    pub reserved: Money,
    /// Blanket access to subscription-gated content until this instant.
    pub subscription_expires_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, incremented on every committed mutation.
    pub version: i64,
}

impl AccountState {
    /// Creates a fresh account with zero balances.
    #[must_use]
    pub fn new(id: AccountId, currency: Currency) -> Self {
        Self {
            id,
            currency,
            available: Money::zero(currency),
            reserved: Money::zero(currency),
            subscription_expires_at: None,
            version: 0,
        }
    }

    /// Returns both balances.
    #[must_use]
    pub const fn balances(&self) -> Balances {
        Balances {
            available: self.available,
            reserved: self.reserved,
        }
    }

    /// Returns true if the subscription window covers `now`.
    ///
    /// Expiry is exclusive: at `now == subscription_expires_at` the window
    /// is already over.
    #[must_use]
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_expires_at.is_some_and(|expiry| expiry > now)
    }

    /// Applies a signed delta to one balance bucket.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if the delta would push the bucket
    /// negative, `CurrencyMismatch`/`ArithmeticOverflow` from the checked
    /// arithmetic.
    pub fn apply(&mut self, bucket: BalanceBucket, delta: Money) -> Result<(), LedgerError> {
        let target = match bucket {
            BalanceBucket::Available => self.available,
            BalanceBucket::Reserved => self.reserved,
        };
        let updated = target.checked_add(delta)?;
        if updated.is_negative() {
            return Err(LedgerError::InsufficientBalance {
                needed: delta.checked_neg()?,
                available: target,
            });
        }
        match bucket {
            BalanceBucket::Available => self.available = updated,
            BalanceBucket::Reserved => self.reserved = updated,
        }
        Ok(())
    }

    /// Computes the subscription expiry after charging a window of
    /// `duration_days`, extending from whichever is later: now or the
    /// current expiry.
    #[must_use]
    pub fn extended_expiry(&self, now: DateTime<Utc>, duration_days: u32) -> DateTime<Utc> {
        let base = match self.subscription_expires_at {
            Some(current) if current > now => current,
            _ => now,
        };
        base + Duration::days(i64::from(duration_days))
    }
}
