//! Database enum mappings.
//!
//! Mirrors the Postgres enum types; conversions to and from the domain
//! enums in `tessera-core` live here so repositories never match on raw
//! strings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry kind (`entry_kind` Postgres enum).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_kind")]
pub enum EntryKind {
    /// Moderated top-up.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Per-content purchase.
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Subscription window charge.
    #[sea_orm(string_value = "subscription_charge")]
    SubscriptionCharge,
    /// Signed admin correction.
    #[sea_orm(string_value = "admin_adjustment")]
    AdminAdjustment,
    /// Compensating entry.
    #[sea_orm(string_value = "reversal")]
    Reversal,
    /// Hold leg (available → reserved).
    #[sea_orm(string_value = "hold")]
    Hold,
    /// Hold release leg (reserved → available).
    #[sea_orm(string_value = "hold_release")]
    HoldRelease,
}

/// Ledger entry status (`entry_status` Postgres enum).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_status")]
pub enum EntryStatus {
    /// Awaiting moderation.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Applied to the balance.
    #[sea_orm(string_value = "committed")]
    Committed,
    /// Resolved without balance effect.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Balance bucket (`balance_bucket` Postgres enum).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "balance_bucket")]
pub enum BalanceBucket {
    /// Spendable balance.
    #[sea_orm(string_value = "available")]
    Available,
    /// Earmarked funds.
    #[sea_orm(string_value = "reserved")]
    Reserved,
}

impl From<tessera_core::ledger::EntryKind> for EntryKind {
    fn from(kind: tessera_core::ledger::EntryKind) -> Self {
        use tessera_core::ledger::EntryKind as Domain;
        match kind {
            Domain::Deposit => Self::Deposit,
            Domain::Purchase => Self::Purchase,
            Domain::SubscriptionCharge => Self::SubscriptionCharge,
            Domain::AdminAdjustment => Self::AdminAdjustment,
            Domain::Reversal => Self::Reversal,
            Domain::Hold => Self::Hold,
            Domain::HoldRelease => Self::HoldRelease,
        }
    }
}

impl From<EntryKind> for tessera_core::ledger::EntryKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Deposit => Self::Deposit,
            EntryKind::Purchase => Self::Purchase,
            EntryKind::SubscriptionCharge => Self::SubscriptionCharge,
            EntryKind::AdminAdjustment => Self::AdminAdjustment,
            EntryKind::Reversal => Self::Reversal,
            EntryKind::Hold => Self::Hold,
            EntryKind::HoldRelease => Self::HoldRelease,
        }
    }
}

impl From<tessera_core::ledger::EntryStatus> for EntryStatus {
    fn from(status: tessera_core::ledger::EntryStatus) -> Self {
        use tessera_core::ledger::EntryStatus as Domain;
        match status {
            Domain::Pending => Self::Pending,
            Domain::Committed => Self::Committed,
            Domain::Rejected => Self::Rejected,
        }
    }
}

impl From<EntryStatus> for tessera_core::ledger::EntryStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Pending => Self::Pending,
            EntryStatus::Committed => Self::Committed,
            EntryStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<tessera_core::ledger::BalanceBucket> for BalanceBucket {
    fn from(bucket: tessera_core::ledger::BalanceBucket) -> Self {
        use tessera_core::ledger::BalanceBucket as Domain;
        match bucket {
            Domain::Available => Self::Available,
            Domain::Reserved => Self::Reserved,
        }
    }
}

impl From<BalanceBucket> for tessera_core::ledger::BalanceBucket {
    fn from(bucket: BalanceBucket) -> Self {
        match bucket {
            BalanceBucket::Available => Self::Available,
            BalanceBucket::Reserved => Self::Reserved,
        }
    }
}
