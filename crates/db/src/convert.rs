//! Model ↔ domain conversions.
//!
//! Rows store currency as text and money as raw minor units; the domain
//! types re-attach the `Money` and typed-ID wrappers. A currency that fails
//! to parse means the row is corrupt, which surfaces as a database error
//! rather than a panic.

use chrono::Utc;
use std::str::FromStr;

use tessera_core::entitlement::Grant;
use tessera_core::ledger::{AccountState, LedgerEntry, LedgerError};
use tessera_shared::types::{AccountId, ContentId, Currency, EntryId, GrantId, Money};

use crate::entities::{accounts, entitlements, ledger_entries};

pub(crate) fn parse_currency(raw: &str) -> Result<Currency, LedgerError> {
    Currency::from_str(raw)
        .map_err(|err| LedgerError::Database(format!("corrupt currency column: {err}")))
}

pub(crate) fn account_from_model(model: accounts::Model) -> Result<AccountState, LedgerError> {
    let currency = parse_currency(&model.currency)?;
    Ok(AccountState {
        id: AccountId::from_uuid(model.id),
        currency,
        available: Money::from_minor(model.available, currency),
        reserved: Money::from_minor(model.reserved, currency),
        subscription_expires_at: model
            .subscription_expires_at
            .map(|ts| ts.with_timezone(&Utc)),
        version: model.version,
    })
}

pub(crate) fn entry_from_model(model: ledger_entries::Model) -> Result<LedgerEntry, LedgerError> {
    let currency = parse_currency(&model.currency)?;
    Ok(LedgerEntry {
        id: EntryId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        kind: model.kind.into(),
        status: model.status.into(),
        bucket: model.bucket.into(),
        amount: Money::from_minor(model.amount, currency),
        related_entry_id: model.related_entry_id.map(EntryId::from_uuid),
        reversed_by: model.reversed_by.map(EntryId::from_uuid),
        external_ref: model.external_ref,
        idempotency_key: model.idempotency_key,
        actor_ref: model.actor_ref,
        reason: model.reason,
        created_at: model.created_at.with_timezone(&Utc),
        committed_at: model.committed_at.map(|ts| ts.with_timezone(&Utc)),
    })
}

pub(crate) fn grant_from_model(model: entitlements::Model) -> Grant {
    Grant {
        id: GrantId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        content_id: ContentId::new(model.content_id),
        source_entry_id: EntryId::from_uuid(model.source_entry_id),
        granted_at: model.granted_at.with_timezone(&Utc),
        revoked_at: model.revoked_at.map(|ts| ts.with_timezone(&Utc)),
        revoked_by_entry_id: model.revoked_by_entry_id.map(EntryId::from_uuid),
    }
}
