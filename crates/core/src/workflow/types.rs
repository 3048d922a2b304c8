//! Workflow domain types for deposit moderation.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_shared::types::EntryId;

use crate::ledger::EntryStatus;

/// The moderator's decision on a pending deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositDecision {
    /// Credit the deposit to the account.
    Approve,
    /// Decline the deposit; no balance effect.
    Reject,
}

impl DepositDecision {
    /// Returns the string representation of the decision.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Parses a decision from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "reject" | "rejected" => Some(Self::Reject),
            _ => None,
        }
    }

    /// The terminal entry status this decision resolves to.
    #[must_use]
    pub const fn target_status(&self) -> EntryStatus {
        match self {
            Self::Approve => EntryStatus::Committed,
            Self::Reject => EntryStatus::Rejected,
        }
    }
}

impl fmt::Display for DepositDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A moderator action supplied by an external surface.
///
/// Every surface (admin endpoint, callback hook) reduces to this shape and
/// routes into the same idempotent resolution call.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeratorAction {
    /// The deposit entry being resolved.
    pub entry_id: EntryId,
    /// Approve or reject.
    pub decision: DepositDecision,
    /// Reference to the acting moderator.
    pub actor_ref: String,
    /// Reason, required for rejections.
    pub reason: Option<String>,
}

/// The validated outcome of a moderation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositTransition {
    /// The entry is pending; resolve it to `new_status`.
    Apply {
        /// The terminal status to transition to.
        new_status: EntryStatus,
    },
    /// The entry already reached the requested terminal state; return it
    /// unchanged instead of re-applying the balance effect.
    AlreadyResolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parse() {
        assert_eq!(DepositDecision::parse("approve"), Some(DepositDecision::Approve));
        assert_eq!(DepositDecision::parse("APPROVED"), Some(DepositDecision::Approve));
        assert_eq!(DepositDecision::parse("reject"), Some(DepositDecision::Reject));
        assert_eq!(DepositDecision::parse("rejected"), Some(DepositDecision::Reject));
        assert_eq!(DepositDecision::parse("defer"), None);
    }

    #[test]
    fn test_decision_target_status() {
        assert_eq!(DepositDecision::Approve.target_status(), EntryStatus::Committed);
        assert_eq!(DepositDecision::Reject.target_status(), EntryStatus::Rejected);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(DepositDecision::Approve.to_string(), "approve");
        assert_eq!(DepositDecision::Reject.to_string(), "reject");
    }
}
