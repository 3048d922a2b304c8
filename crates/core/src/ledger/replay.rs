//! Balance reconstruction from the entry log.
//!
//! The entry log is the source of truth: the account row's balances must
//! always equal the sum of committed entry amounts per bucket. Replay is how
//! that invariant is checked.

use serde::Serialize;
use tessera_shared::types::{Currency, Money};

use super::error::LedgerError;
use super::types::{BalanceBucket, Balances, LedgerEntry};

/// Reconstructs balances by summing committed entries per bucket.
///
/// Pending and rejected entries have no balance effect and are skipped.
///
/// # Errors
///
/// Returns `CurrencyMismatch` if any entry is not in `currency` and
/// `ArithmeticOverflow` if a running sum exceeds the ceiling.
pub fn replay_balances(
    currency: Currency,
    entries: &[LedgerEntry],
) -> Result<Balances, LedgerError> {
    let mut available = Money::zero(currency);
    let mut reserved = Money::zero(currency);

    for entry in entries.iter().filter(|e| e.is_committed()) {
        match entry.bucket {
            BalanceBucket::Available => available = available.checked_add(entry.amount)?,
            BalanceBucket::Reserved => reserved = reserved.checked_add(entry.amount)?,
        }
    }

    Ok(Balances {
        available,
        reserved,
    })
}

/// Stored balances compared against a replay of the entry log.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// Balances on the account row.
    pub stored: Balances,
    /// Balances reconstructed from committed entries.
    pub replayed: Balances,
    /// True when stored and replayed agree exactly.
    pub consistent: bool,
}

impl Reconciliation {
    /// Compares stored balances against a replay.
    #[must_use]
    pub fn compare(stored: Balances, replayed: Balances) -> Self {
        let consistent = stored == replayed;
        Self {
            stored,
            replayed,
            consistent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{EntryKind, EntryStatus};
    use chrono::Utc;
    use tessera_shared::types::{AccountId, EntryId};

    fn entry(
        kind: EntryKind,
        status: EntryStatus,
        bucket: BalanceBucket,
        amount: i64,
    ) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(),
            account_id: AccountId::new(),
            kind,
            status,
            bucket,
            amount: Money::from_minor(amount, Currency::Usd),
            related_entry_id: None,
            reversed_by: None,
            external_ref: None,
            idempotency_key: None,
            actor_ref: None,
            reason: None,
            created_at: Utc::now(),
            committed_at: None,
        }
    }

    #[test]
    fn test_replay_empty_log_is_zero() {
        let balances = replay_balances(Currency::Usd, &[]).unwrap();
        assert!(balances.available.is_zero());
        assert!(balances.reserved.is_zero());
    }

    #[test]
    fn test_replay_skips_pending_and_rejected() {
        let entries = vec![
            entry(EntryKind::Deposit, EntryStatus::Committed, BalanceBucket::Available, 1000),
            entry(EntryKind::Deposit, EntryStatus::Pending, BalanceBucket::Available, 9999),
            entry(EntryKind::Deposit, EntryStatus::Rejected, BalanceBucket::Available, 5555),
        ];
        let balances = replay_balances(Currency::Usd, &entries).unwrap();
        assert_eq!(balances.available.amount, 1000);
    }

    #[test]
    fn test_replay_separates_buckets() {
        let entries = vec![
            entry(EntryKind::Deposit, EntryStatus::Committed, BalanceBucket::Available, 1000),
            entry(EntryKind::Hold, EntryStatus::Committed, BalanceBucket::Available, -300),
            entry(EntryKind::Hold, EntryStatus::Committed, BalanceBucket::Reserved, 300),
        ];
        let balances = replay_balances(Currency::Usd, &entries).unwrap();
        assert_eq!(balances.available.amount, 700);
        assert_eq!(balances.reserved.amount, 300);
    }

    #[test]
    fn test_replay_nets_purchase_and_reversal() {
        let entries = vec![
            entry(EntryKind::Deposit, EntryStatus::Committed, BalanceBucket::Available, 100_000),
            entry(EntryKind::Purchase, EntryStatus::Committed, BalanceBucket::Available, -50_000),
            entry(EntryKind::Reversal, EntryStatus::Committed, BalanceBucket::Available, 50_000),
        ];
        let balances = replay_balances(Currency::Usd, &entries).unwrap();
        assert_eq!(balances.available.amount, 100_000);
    }

    #[test]
    fn test_replay_rejects_foreign_currency_entry() {
        let entries = vec![entry(
            EntryKind::Deposit,
            EntryStatus::Committed,
            BalanceBucket::Available,
            1000,
        )]
        .into_iter()
        .map(|mut e| {
            e.amount = Money::from_minor(1000, Currency::Jpy);
            e
        })
        .collect::<Vec<_>>();

        let err = replay_balances(Currency::Usd, &entries).unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_reconciliation_compare() {
        let stored = Balances {
            available: Money::from_minor(700, Currency::Usd),
            reserved: Money::from_minor(300, Currency::Usd),
        };
        let rec = Reconciliation::compare(stored, stored);
        assert!(rec.consistent);

        let drifted = Balances {
            available: Money::from_minor(701, Currency::Usd),
            reserved: Money::from_minor(300, Currency::Usd),
        };
        let rec = Reconciliation::compare(stored, drifted);
        assert!(!rec.consistent);
    }
}
