//! Deposit moderation state machine.
//!
//! State machine per deposit entry: pending → committed | rejected, both
//! terminal. Re-applying the decision a terminal entry already reached is a
//! no-op; the conflicting decision fails. This is what makes a moderator
//! double-click (or two surfaces racing on the same approval) harmless.

use crate::events::{LedgerEvent, LedgerEventState};
use crate::ledger::{EntryKind, EntryStatus, LedgerEntry, LedgerError};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{DepositDecision, DepositTransition};

/// Stateless validator for deposit moderation decisions.
pub struct ApprovalWorkflow;

impl ApprovalWorkflow {
    /// Validates a moderation decision against the targeted entry.
    ///
    /// # Errors
    ///
    /// - `Workflow(NotADepositEntry)` if the entry is not a deposit
    /// - `Workflow(RejectionReasonRequired)` for a reject without a reason
    /// - `EntryNotPending` if the entry reached the opposite terminal state
    pub fn decide(
        entry: &LedgerEntry,
        decision: DepositDecision,
        reason: Option<&str>,
    ) -> Result<DepositTransition, LedgerError> {
        if entry.kind != EntryKind::Deposit {
            return Err(WorkflowError::NotADepositEntry(entry.id.into_inner()).into());
        }

        if decision == DepositDecision::Reject
            && reason.is_none_or(|r| r.trim().is_empty())
        {
            return Err(WorkflowError::RejectionReasonRequired.into());
        }

        let target = decision.target_status();
        match entry.status {
            EntryStatus::Pending => Ok(DepositTransition::Apply { new_status: target }),
            status if status == target => Ok(DepositTransition::AlreadyResolved),
            status => Err(LedgerError::EntryNotPending {
                entry_id: entry.id.into_inner(),
                status,
            }),
        }
    }

    /// Builds the notification event for a resolved transition.
    #[must_use]
    pub fn transition_event(entry: &LedgerEntry, new_status: EntryStatus) -> LedgerEvent {
        let state = match new_status {
            EntryStatus::Pending => LedgerEventState::DepositPending,
            EntryStatus::Committed => LedgerEventState::DepositApproved,
            EntryStatus::Rejected => LedgerEventState::DepositRejected,
        };
        LedgerEvent {
            account_id: entry.account_id,
            entry_id: entry.id,
            state,
            reason: entry.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_shared::types::{AccountId, Currency, EntryId, Money};

    use crate::ledger::BalanceBucket;

    fn deposit_entry(status: EntryStatus) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(),
            account_id: AccountId::new(),
            kind: EntryKind::Deposit,
            status,
            bucket: BalanceBucket::Available,
            amount: Money::from_minor(1000, Currency::Usd),
            related_entry_id: None,
            reversed_by: None,
            external_ref: Some("https://storage.example/proof.png".to_string()),
            idempotency_key: None,
            actor_ref: None,
            reason: None,
            created_at: Utc::now(),
            committed_at: None,
        }
    }

    #[test]
    fn test_approve_pending() {
        let entry = deposit_entry(EntryStatus::Pending);
        let transition =
            ApprovalWorkflow::decide(&entry, DepositDecision::Approve, None).unwrap();
        assert_eq!(
            transition,
            DepositTransition::Apply {
                new_status: EntryStatus::Committed
            }
        );
    }

    #[test]
    fn test_reject_pending_with_reason() {
        let entry = deposit_entry(EntryStatus::Pending);
        let transition =
            ApprovalWorkflow::decide(&entry, DepositDecision::Reject, Some("blurry screenshot"))
                .unwrap();
        assert_eq!(
            transition,
            DepositTransition::Apply {
                new_status: EntryStatus::Rejected
            }
        );
    }

    #[test]
    fn test_reject_requires_reason() {
        let entry = deposit_entry(EntryStatus::Pending);
        let err = ApprovalWorkflow::decide(&entry, DepositDecision::Reject, None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Workflow(WorkflowError::RejectionReasonRequired)
        ));

        let err =
            ApprovalWorkflow::decide(&entry, DepositDecision::Reject, Some("   ")).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Workflow(WorkflowError::RejectionReasonRequired)
        ));
    }

    #[test]
    fn test_re_approving_approved_is_noop() {
        let entry = deposit_entry(EntryStatus::Committed);
        let transition =
            ApprovalWorkflow::decide(&entry, DepositDecision::Approve, None).unwrap();
        assert_eq!(transition, DepositTransition::AlreadyResolved);
    }

    #[test]
    fn test_re_rejecting_rejected_is_noop() {
        let entry = deposit_entry(EntryStatus::Rejected);
        let transition =
            ApprovalWorkflow::decide(&entry, DepositDecision::Reject, Some("dup")).unwrap();
        assert_eq!(transition, DepositTransition::AlreadyResolved);
    }

    #[test]
    fn test_conflicting_decision_on_terminal_fails() {
        let approved = deposit_entry(EntryStatus::Committed);
        let err =
            ApprovalWorkflow::decide(&approved, DepositDecision::Reject, Some("no")).unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotPending { .. }));

        let rejected = deposit_entry(EntryStatus::Rejected);
        let err = ApprovalWorkflow::decide(&rejected, DepositDecision::Approve, None).unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotPending { .. }));
    }

    #[test]
    fn test_non_deposit_cannot_be_moderated() {
        let mut entry = deposit_entry(EntryStatus::Pending);
        entry.kind = EntryKind::Purchase;
        let err = ApprovalWorkflow::decide(&entry, DepositDecision::Approve, None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Workflow(WorkflowError::NotADepositEntry(_))
        ));
    }

    #[test]
    fn test_transition_event_states() {
        let entry = deposit_entry(EntryStatus::Pending);
        let event = ApprovalWorkflow::transition_event(&entry, EntryStatus::Committed);
        assert_eq!(event.state, LedgerEventState::DepositApproved);
        assert_eq!(event.account_id, entry.account_id);
        assert_eq!(event.entry_id, entry.id);

        let event = ApprovalWorkflow::transition_event(&entry, EntryStatus::Rejected);
        assert_eq!(event.state, LedgerEventState::DepositRejected);
    }
}
