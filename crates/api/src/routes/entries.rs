//! Entry-level admin routes: reversals, adjustments, holds.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use tessera_shared::types::{AccountId, Currency, EntryId, Money};

use super::{ledger_error_response, EntryResponse};
use crate::AppState;

/// Creates the reversal, adjustment, and hold routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entries/{entry_id}/reverse", post(reverse_entry))
        .route("/accounts/{account_id}/adjustments", post(adjust_balance))
        .route("/accounts/{account_id}/holds", post(hold_funds))
        .route("/holds/{entry_id}/release", post(release_hold))
}

/// Request body for reversing an entry.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// Why the entry is being undone.
    pub reason: String,
}

/// Request body for an admin adjustment.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// Signed amount in minor units.
    pub amount: i64,
    /// ISO 4217 currency code; must match the account.
    pub currency: String,
    /// Why the balance is being corrected.
    pub reason: String,
    /// Reference to the acting admin.
    pub actor_ref: String,
    /// Optional deduplication key.
    pub idempotency_key: Option<String>,
}

/// Request body for holding funds.
#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    /// Amount in minor units to earmark.
    pub amount: i64,
    /// ISO 4217 currency code; must match the account.
    pub currency: String,
    /// Optional note on why the funds are held.
    pub reason: Option<String>,
}

/// POST `/entries/{entry_id}/reverse` - Undo a committed entry.
async fn reverse_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<ReverseRequest>,
) -> impl IntoResponse {
    match state
        .ledger()
        .reverse(EntryId::from_uuid(entry_id), payload.reason)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/accounts/{account_id}/adjustments` - Signed admin correction.
async fn adjust_balance(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<AdjustRequest>,
) -> impl IntoResponse {
    let Ok(currency) = Currency::from_str(&payload.currency) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "UNKNOWN_CURRENCY",
                "message": format!("Unknown currency: {}", payload.currency)
            })),
        )
            .into_response();
    };

    match state
        .ledger()
        .adjust(
            AccountId::from_uuid(account_id),
            Money::from_minor(payload.amount, currency),
            payload.reason,
            payload.actor_ref,
            payload.idempotency_key,
        )
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/accounts/{account_id}/holds` - Earmark available funds.
async fn hold_funds(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<HoldRequest>,
) -> impl IntoResponse {
    let Ok(currency) = Currency::from_str(&payload.currency) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "UNKNOWN_CURRENCY",
                "message": format!("Unknown currency: {}", payload.currency)
            })),
        )
            .into_response();
    };

    match state
        .ledger()
        .hold_funds(
            AccountId::from_uuid(account_id),
            Money::from_minor(payload.amount, currency),
            payload.reason,
        )
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/holds/{entry_id}/release` - Return held funds to available.
async fn release_hold(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.ledger().release_hold(EntryId::from_uuid(entry_id)).await {
        Ok(entry) => (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
