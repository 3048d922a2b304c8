//! Deposit routes: request, moderation queue, approve, reject.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use tessera_shared::types::{AccountId, Currency, EntryId, Money};

use super::{ledger_error_response, EntryResponse};
use crate::AppState;

/// Creates the deposit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{account_id}/deposits", post(request_deposit))
        .route("/deposits/pending", get(pending_deposits))
        .route("/deposits/{entry_id}/approve", post(approve_deposit))
        .route("/deposits/{entry_id}/reject", post(reject_deposit))
}

/// Request body for a deposit.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Amount in minor units; must be positive.
    pub amount: i64,
    /// ISO 4217 currency code; must match the account.
    pub currency: String,
    /// Durable URL of the payment proof, supplied by the upload collaborator.
    pub external_ref: Option<String>,
    /// Caller-supplied deduplication key (e.g. the payment transaction code).
    pub idempotency_key: String,
}

/// Request body for approving a deposit.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Reference to the acting moderator.
    pub approver_ref: String,
    /// Optional approval notes.
    pub notes: Option<String>,
}

/// Request body for rejecting a deposit.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Reference to the acting moderator.
    pub approver_ref: String,
    /// Reason shown to the user; required.
    pub reason: String,
}

/// POST `/accounts/{account_id}/deposits` - Record a pending deposit.
async fn request_deposit(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<DepositRequest>,
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
        .request_deposit(
            AccountId::from_uuid(account_id),
            Money::from_minor(payload.amount, currency),
            payload.external_ref,
            payload.idempotency_key,
        )
        .await
    {
        Ok(entry) => {
            (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/deposits/pending` - The moderation queue, oldest first.
async fn pending_deposits(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger().pending_deposits().await {
        Ok(entries) => {
            let entries: Vec<EntryResponse> =
                entries.into_iter().map(EntryResponse::from).collect();
            (StatusCode::OK, Json(json!({ "deposits": entries }))).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/deposits/{entry_id}/approve` - Credit a pending deposit.
async fn approve_deposit(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> impl IntoResponse {
    match state
        .ledger()
        .approve_deposit(
            EntryId::from_uuid(entry_id),
            payload.approver_ref,
            payload.notes,
        )
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/deposits/{entry_id}/reject` - Decline a pending deposit.
async fn reject_deposit(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> impl IntoResponse {
    match state
        .ledger()
        .reject_deposit(
            EntryId::from_uuid(entry_id),
            payload.approver_ref,
            payload.reason,
        )
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
