//! API route definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use tessera_core::ledger::LedgerError;
use tessera_shared::types::Money;

use crate::AppState;

pub mod access;
pub mod accounts;
pub mod deposits;
pub mod entries;
pub mod health;
pub mod moderation;
pub mod purchases;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(accounts::routes())
        .merge(deposits::routes())
        .merge(moderation::routes())
        .merge(purchases::routes())
        .merge(entries::routes())
        .merge(access::routes())
}

/// Maps a ledger error to its HTTP response.
///
/// Domain errors carry their own status and code; only genuine database
/// failures collapse to an opaque 500.
pub(crate) fn ledger_error_response(err: &LedgerError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, "ledger operation failed");
        return (
            status,
            Json(json!({
                "error": err.error_code(),
                "message": "An error occurred"
            })),
        )
            .into_response();
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string(),
            "retryable": err.is_retryable()
        })),
    )
        .into_response()
}

/// Wire representation of a ledger entry.
#[derive(Debug, Serialize)]
pub(crate) struct EntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// Owning account.
    pub account_id: Uuid,
    /// Entry kind.
    pub kind: String,
    /// Lifecycle status.
    pub status: String,
    /// Balance bucket the delta applies to.
    pub bucket: String,
    /// Signed delta in minor units.
    pub amount: i64,
    /// Human-readable amount.
    pub amount_display: String,
    /// Currency code.
    pub currency: String,
    /// Back-reference to a prior entry.
    pub related_entry_id: Option<Uuid>,
    /// The entry that reversed this one, if any.
    pub reversed_by: Option<Uuid>,
    /// Opaque caller-supplied reference.
    pub external_ref: Option<String>,
    /// Acting moderator or admin.
    pub actor_ref: Option<String>,
    /// Resolution or reversal reason.
    pub reason: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// When the entry left pending.
    pub committed_at: Option<DateTime<Utc>>,
}

impl From<tessera_core::ledger::LedgerEntry> for EntryResponse {
    fn from(entry: tessera_core::ledger::LedgerEntry) -> Self {
        Self {
            id: entry.id.into_inner(),
            account_id: entry.account_id.into_inner(),
            kind: entry.kind.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            bucket: entry.bucket.as_str().to_string(),
            amount: entry.amount.amount,
            amount_display: entry.amount.to_display(),
            currency: entry.amount.currency.to_string(),
            related_entry_id: entry.related_entry_id.map(tessera_shared::types::EntryId::into_inner),
            reversed_by: entry.reversed_by.map(tessera_shared::types::EntryId::into_inner),
            external_ref: entry.external_ref,
            actor_ref: entry.actor_ref,
            reason: entry.reason,
            created_at: entry.created_at,
            committed_at: entry.committed_at,
        }
    }
}

/// Wire representation of a money amount.
#[derive(Debug, Serialize)]
pub(crate) struct MoneyResponse {
    /// Minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Human-readable form.
    pub display: String,
}

impl From<Money> for MoneyResponse {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount,
            currency: money.currency.to_string(),
            display: money.to_display(),
        }
    }
}
