//! Property-based tests for the posting planner.
//!
//! Drives random operation sequences through `LedgerService` against an
//! in-memory entry log and checks, after every step, the invariants the
//! ledger promises: balances never go negative, and replaying committed
//! entries reconstructs the cached balances exactly.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use tessera_shared::types::{AccountId, ContentId, Currency, EntryId, Money};

use super::account::AccountState;
use super::replay::replay_balances;
use super::service::{DepositResolution, LedgerService, Posting, PurchasePlan};
use super::types::{BalanceBucket, EntryDraft, EntryKind, EntryStatus, LedgerEntry};

fn usd(amount: i64) -> Money {
    Money::from_minor(amount, Currency::Usd)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
}

/// One step of a generated operation sequence.
#[derive(Debug, Clone)]
enum Op {
    DepositApproved(i64),
    DepositRejected(i64),
    Purchase(i64),
    Subscribe { price: i64, days: u32 },
    Adjust(i64),
    Hold(i64),
    ReleaseOldestHold,
    ReverseLastReversible,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..200_000).prop_map(Op::DepositApproved),
        (1i64..200_000).prop_map(Op::DepositRejected),
        (1i64..100_000).prop_map(Op::Purchase),
        ((1i64..100_000), (1u32..90)).prop_map(|(price, days)| Op::Subscribe { price, days }),
        (-50_000i64..50_000).prop_map(Op::Adjust),
        (1i64..50_000).prop_map(Op::Hold),
        Just(Op::ReleaseOldestHold),
        Just(Op::ReverseLastReversible),
    ]
}

/// In-memory stand-in for the repository: applies postings to the log the
/// way the persistence layer would, assigning IDs and linking paired legs.
struct Harness {
    account: AccountState,
    log: Vec<LedgerEntry>,
    content_counter: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            account: AccountState::new(AccountId::new(), Currency::Usd),
            log: Vec::new(),
            content_counter: 0,
        }
    }

    fn materialize(&mut self, draft: &EntryDraft, related_override: Option<EntryId>) -> EntryId {
        let id = EntryId::new();
        let committed = draft.status == EntryStatus::Committed;
        self.log.push(LedgerEntry {
            id,
            account_id: self.account.id,
            kind: draft.kind,
            status: draft.status,
            bucket: draft.bucket,
            amount: draft.amount,
            related_entry_id: draft.related_entry_id.or(related_override),
            reversed_by: None,
            external_ref: draft.external_ref.clone(),
            idempotency_key: draft.idempotency_key.clone(),
            actor_ref: draft.actor_ref.clone(),
            reason: draft.reason.clone(),
            created_at: now(),
            committed_at: committed.then(now),
        });
        id
    }

    fn commit(&mut self, posting: Posting) -> EntryId {
        let Posting {
            mut account,
            entries,
            ..
        } = posting;
        account.version += 1;
        self.account = account;

        let first = self.materialize(&entries[0], None);
        for draft in &entries[1..] {
            self.materialize(draft, Some(first));
        }
        first
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::DepositApproved(amount) => {
                let Ok(draft) = LedgerService::request_deposit(
                    &self.account,
                    usd(*amount),
                    None,
                    format!("tx-{}", self.log.len()),
                ) else {
                    return;
                };
                let id = self.materialize(&draft, None);
                let entry = self
                    .log
                    .iter()
                    .find(|e| e.id == id)
                    .cloned()
                    .expect("entry just written");
                if let Ok(DepositResolution::Applied { account, new_status }) =
                    LedgerService::approve_deposit(&self.account, &entry)
                {
                    let mut account = account;
                    account.version += 1;
                    self.account = account;
                    let stored = self
                        .log
                        .iter_mut()
                        .find(|e| e.id == id)
                        .expect("entry just written");
                    stored.status = new_status;
                    stored.committed_at = Some(now());
                }
            }
            Op::DepositRejected(amount) => {
                let Ok(draft) = LedgerService::request_deposit(
                    &self.account,
                    usd(*amount),
                    None,
                    format!("tx-{}", self.log.len()),
                ) else {
                    return;
                };
                let id = self.materialize(&draft, None);
                let entry = self
                    .log
                    .iter()
                    .find(|e| e.id == id)
                    .cloned()
                    .expect("entry just written");
                if let Ok(DepositResolution::Applied { account, new_status }) =
                    LedgerService::reject_deposit(&self.account, &entry)
                {
                    let mut account = account;
                    account.version += 1;
                    self.account = account;
                    let stored = self
                        .log
                        .iter_mut()
                        .find(|e| e.id == id)
                        .expect("entry just written");
                    stored.status = new_status;
                    stored.committed_at = Some(now());
                }
            }
            Op::Purchase(price) => {
                self.content_counter += 1;
                let content = ContentId::new(format!("content-{}", self.content_counter));
                if let Ok(PurchasePlan::Charge(posting)) =
                    LedgerService::purchase(&self.account, None, &content, usd(*price), now())
                {
                    self.commit(posting);
                }
            }
            Op::Subscribe { price, days } => {
                if let Ok(posting) =
                    LedgerService::subscribe(&self.account, usd(*price), *days, now())
                {
                    self.commit(posting);
                }
            }
            Op::Adjust(amount) => {
                if let Ok(posting) = LedgerService::adjust(
                    &self.account,
                    usd(*amount),
                    "prop adjustment".to_string(),
                    "prop-admin".to_string(),
                ) {
                    self.commit(posting);
                }
            }
            Op::Hold(amount) => {
                if let Ok(posting) = LedgerService::hold(&self.account, usd(*amount), None) {
                    self.commit(posting);
                }
            }
            Op::ReleaseOldestHold => {
                let Some(hold_leg) = self
                    .log
                    .iter()
                    .find(|e| {
                        e.kind == EntryKind::Hold
                            && e.bucket == BalanceBucket::Available
                            && e.reversed_by.is_none()
                    })
                    .cloned()
                else {
                    return;
                };
                if let Ok(posting) = LedgerService::release(&self.account, &hold_leg) {
                    let release_id = self.commit(posting);
                    let stored = self
                        .log
                        .iter_mut()
                        .find(|e| e.id == hold_leg.id)
                        .expect("hold leg present");
                    stored.reversed_by = Some(release_id);
                }
            }
            Op::ReverseLastReversible => {
                let Some(original) = self
                    .log
                    .iter()
                    .rev()
                    .find(|e| {
                        e.is_committed() && e.reversed_by.is_none() && e.kind.is_reversible()
                    })
                    .cloned()
                else {
                    return;
                };
                if let Ok(posting) =
                    LedgerService::reverse(&self.account, &original, "prop reversal".to_string())
                {
                    let reversal_id = self.commit(posting);
                    let stored = self
                        .log
                        .iter_mut()
                        .find(|e| e.id == original.id)
                        .expect("original present");
                    stored.reversed_by = Some(reversal_id);
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any operation sequence, available and reserved never go negative.
    #[test]
    fn prop_balances_never_negative(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
            prop_assert!(
                !harness.account.available.is_negative(),
                "available went negative after {:?}",
                op
            );
            prop_assert!(
                !harness.account.reserved.is_negative(),
                "reserved went negative after {:?}",
                op
            );
        }
    }

    /// For any operation sequence, replaying committed entries reconstructs
    /// the cached balances exactly.
    #[test]
    fn prop_replay_matches_cached_balances(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
            let replayed = replay_balances(Currency::Usd, &harness.log).unwrap();
            prop_assert_eq!(replayed.available, harness.account.available);
            prop_assert_eq!(replayed.reserved, harness.account.reserved);
        }
    }

    /// Approving the same deposit twice credits the balance exactly once.
    #[test]
    fn prop_approve_is_idempotent(amount in 1i64..1_000_000) {
        let mut harness = Harness::new();
        harness.apply(&Op::DepositApproved(amount));
        let balance_after_first = harness.account.available;

        let entry = harness.log[0].clone();
        let second = LedgerService::approve_deposit(&harness.account, &entry).unwrap();
        prop_assert!(matches!(second, DepositResolution::AlreadyResolved));
        prop_assert_eq!(harness.account.available, balance_after_first);
    }

    /// Reversing a committed entry restores the balance it changed.
    #[test]
    fn prop_reverse_restores_balance(deposit in 2i64..1_000_000) {
        let mut harness = Harness::new();
        harness.apply(&Op::DepositApproved(deposit));
        let price = deposit / 2;
        harness.apply(&Op::Purchase(price));
        let before = harness.account.available;

        harness.apply(&Op::ReverseLastReversible);
        prop_assert_eq!(
            harness.account.available.amount,
            before.amount + price,
            "reversal must restore the purchase debit"
        );
    }

    /// Version advances once per committed mutation and never regresses.
    #[test]
    fn prop_version_monotone(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut harness = Harness::new();
        let mut last_version = harness.account.version;
        for op in &ops {
            harness.apply(op);
            prop_assert!(harness.account.version >= last_version);
            last_version = harness.account.version;
        }
    }
}
