//! Notification events handed to the external dispatch collaborator.
//!
//! The ledger does not know how delivery happens (chat messages, in-app
//! records) and never blocks on it: events are published after the database
//! transaction commits, outside of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_shared::types::{AccountId, EntryId};

/// What happened to a ledger entry, for notification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventState {
    /// A deposit request was recorded and awaits moderation.
    DepositPending,
    /// A deposit was approved and credited.
    DepositApproved,
    /// A deposit was rejected.
    DepositRejected,
    /// A purchase debit committed and the entitlement was granted.
    PurchaseCompleted,
    /// A subscription charge committed and the window was extended.
    SubscriptionExtended,
    /// A committed entry was reversed.
    EntryReversed,
    /// Funds were moved from available into reserved.
    FundsHeld,
    /// A hold was released back to available.
    HoldReleased,
    /// An admin adjustment was applied.
    BalanceAdjusted,
}

/// A notification event emitted after a balance-affecting transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// The affected account.
    pub account_id: AccountId,
    /// The entry the transition happened on.
    pub entry_id: EntryId,
    /// The new state.
    pub state: LedgerEventState,
    /// Optional human-readable reason (rejection, reversal).
    pub reason: Option<String>,
}

/// Destination for ledger events.
///
/// Implemented by the out-of-scope notification collaborator; the default
/// [`TracingEventSink`] just logs.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event. Delivery failures are the sink's problem; the
    /// ledger never fails an operation over them.
    async fn publish(&self, event: LedgerEvent);
}

/// Event sink that records events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: LedgerEvent) {
        tracing::info!(
            account_id = %event.account_id,
            entry_id = %event.entry_id,
            state = ?event.state,
            reason = event.reason.as_deref(),
            "ledger event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_snake_case_state() {
        let event = LedgerEvent {
            account_id: AccountId::new(),
            entry_id: EntryId::new(),
            state: LedgerEventState::DepositApproved,
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "deposit_approved");
    }

    #[tokio::test]
    async fn test_tracing_sink_publishes_without_error() {
        let sink = TracingEventSink;
        sink.publish(LedgerEvent {
            account_id: AccountId::new(),
            entry_id: EntryId::new(),
            state: LedgerEventState::PurchaseCompleted,
            reason: Some("test".to_string()),
        })
        .await;
    }
}
