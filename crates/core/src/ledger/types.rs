//! Ledger domain types.
//!
//! The entry log is the source of truth for every balance: account rows are
//! derived caches that must always be reconstructable by replaying committed
//! entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_shared::types::{AccountId, EntryId, Money};

/// Kind of ledger entry.
///
/// The kind is fixed at creation; only a deposit's [`EntryStatus`] ever
/// changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Moderated top-up of the available balance.
    Deposit,
    /// Per-content purchase debit.
    Purchase,
    /// Subscription window charge.
    SubscriptionCharge,
    /// Signed admin correction.
    AdminAdjustment,
    /// Compensating entry undoing a committed entry.
    Reversal,
    /// Earmarks funds: paired legs moving available into reserved.
    Hold,
    /// Returns held funds: paired legs moving reserved back to available.
    HoldRelease,
}

impl EntryKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Purchase => "purchase",
            Self::SubscriptionCharge => "subscription_charge",
            Self::AdminAdjustment => "admin_adjustment",
            Self::Reversal => "reversal",
            Self::Hold => "hold",
            Self::HoldRelease => "hold_release",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(Self::Deposit),
            "purchase" => Some(Self::Purchase),
            "subscription_charge" => Some(Self::SubscriptionCharge),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            "reversal" => Some(Self::Reversal),
            "hold" => Some(Self::Hold),
            "hold_release" => Some(Self::HoldRelease),
            _ => None,
        }
    }

    /// Returns true if a committed entry of this kind may be reversed.
    ///
    /// Reversals themselves, adjustments, and hold legs are not reversible;
    /// holds are undone through release.
    #[must_use]
    pub const fn is_reversible(&self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::Purchase | Self::SubscriptionCharge
        )
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a ledger entry.
///
/// Deposits are created `Pending` and resolved by a moderator to a terminal
/// state; every other kind is created `Committed`. The valid transitions are:
/// - Pending → Committed (approve)
/// - Pending → Rejected (reject)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Awaiting moderator resolution; no balance effect yet.
    Pending,
    /// Applied to the account balance (immutable).
    Committed,
    /// Resolved without balance effect (immutable).
    Rejected,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "committed" => Some(Self::Committed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the status admits no further transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which balance a signed entry delta applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceBucket {
    /// The spendable balance.
    Available,
    /// Funds earmarked for an in-flight operation.
    Reserved,
}

impl BalanceBucket {
    /// Returns the string representation of the bucket.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
        }
    }

    /// Parses a bucket from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            _ => None,
        }
    }
}

impl fmt::Display for BalanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single append-only ledger entry.
///
/// The signed `amount` is the delta applied to the account's `bucket`
/// balance when the entry commits. Amounts are immutable; only a pending
/// deposit's status and resolution metadata ever change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: EntryId,
    /// The account this entry belongs to.
    pub account_id: AccountId,
    /// Entry kind, fixed at creation.
    pub kind: EntryKind,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Balance the delta applies to.
    pub bucket: BalanceBucket,
    /// Signed delta in minor units.
    pub amount: Money,
    /// Back-reference, e.g. a reversal points at the entry it undoes.
    pub related_entry_id: Option<EntryId>,
    /// Set when a later entry reversed (or released) this one.
    pub reversed_by: Option<EntryId>,
    /// Opaque caller-supplied reference (e.g. payment-screenshot URL).
    pub external_ref: Option<String>,
    /// Caller-supplied deduplication key, unique across all entries.
    pub idempotency_key: Option<String>,
    /// Who resolved or created the entry (moderator or admin reference).
    pub actor_ref: Option<String>,
    /// Human-readable reason (rejection, reversal, adjustment).
    pub reason: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// When the entry left pending; null until then.
    pub committed_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Returns true if the entry has been applied to the balance.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == EntryStatus::Committed
    }

    /// Returns true if the entry awaits moderator resolution.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }
}

/// A planned entry produced by the ledger service, not yet persisted.
///
/// The repository assigns the ID and timestamps when it writes the draft
/// inside the operation's database transaction.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Entry kind.
    pub kind: EntryKind,
    /// Initial status (`Pending` for deposits, `Committed` otherwise).
    pub status: EntryStatus,
    /// Balance the delta applies to.
    pub bucket: BalanceBucket,
    /// Signed delta in minor units.
    pub amount: Money,
    /// Back-reference to a prior entry.
    pub related_entry_id: Option<EntryId>,
    /// Opaque caller-supplied reference.
    pub external_ref: Option<String>,
    /// Caller-supplied deduplication key.
    pub idempotency_key: Option<String>,
    /// Acting moderator or admin reference.
    pub actor_ref: Option<String>,
    /// Human-readable reason.
    pub reason: Option<String>,
}

impl EntryDraft {
    /// Creates a committed draft with no references attached.
    #[must_use]
    pub fn committed(kind: EntryKind, bucket: BalanceBucket, amount: Money) -> Self {
        Self {
            kind,
            status: EntryStatus::Committed,
            bucket,
            amount,
            related_entry_id: None,
            external_ref: None,
            idempotency_key: None,
            actor_ref: None,
            reason: None,
        }
    }
}

/// An account's balances at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// The spendable balance.
    pub available: Money,
    /// Funds earmarked for in-flight operations.
    pub reserved: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str_roundtrip() {
        for kind in [
            EntryKind::Deposit,
            EntryKind::Purchase,
            EntryKind::SubscriptionCharge,
            EntryKind::AdminAdjustment,
            EntryKind::Reversal,
            EntryKind::Hold,
            EntryKind::HoldRelease,
        ] {
            assert_eq!(EntryKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::parse("withdrawal"), None);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            EntryStatus::Pending,
            EntryStatus::Committed,
            EntryStatus::Rejected,
        ] {
            assert_eq!(EntryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EntryStatus::parse("approved"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!EntryStatus::Pending.is_terminal());
        assert!(EntryStatus::Committed.is_terminal());
        assert!(EntryStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_reversible_kinds() {
        assert!(EntryKind::Deposit.is_reversible());
        assert!(EntryKind::Purchase.is_reversible());
        assert!(EntryKind::SubscriptionCharge.is_reversible());
        assert!(!EntryKind::Reversal.is_reversible());
        assert!(!EntryKind::AdminAdjustment.is_reversible());
        assert!(!EntryKind::Hold.is_reversible());
        assert!(!EntryKind::HoldRelease.is_reversible());
    }

    #[test]
    fn test_bucket_roundtrip() {
        assert_eq!(BalanceBucket::parse("available"), Some(BalanceBucket::Available));
        assert_eq!(BalanceBucket::parse("RESERVED"), Some(BalanceBucket::Reserved));
        assert_eq!(BalanceBucket::parse("escrow"), None);
    }
}
