//! Account routes: creation, balances, entry history, reconciliation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use tessera_shared::types::{AccountId, Currency};

use super::{ledger_error_response, EntryResponse, MoneyResponse};
use crate::AppState;

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route("/accounts/{account_id}/entries", get(list_entries))
        .route("/accounts/{account_id}/reconciliation", get(reconcile))
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// ISO 4217 currency code for the account.
    pub currency: String,
}

/// POST `/accounts` - Create an account with zero balances.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
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

    match state.accounts().create_account(currency).await {
        Ok(account) => {
            info!(account_id = %account.id, "account created via API");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": account.id,
                    "currency": account.currency.to_string(),
                    "available": MoneyResponse::from(account.available),
                    "reserved": MoneyResponse::from(account.reserved),
                })),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/accounts/{account_id}/balance` - Current balances.
async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .accounts()
        .get_account(AccountId::from_uuid(account_id))
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Json(json!({
                "account_id": account.id,
                "available": MoneyResponse::from(account.available),
                "reserved": MoneyResponse::from(account.reserved),
                "subscription_expires_at": account.subscription_expires_at,
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/accounts/{account_id}/entries` - Full entry history, oldest first.
async fn list_entries(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .ledger()
        .list_entries(AccountId::from_uuid(account_id))
        .await
    {
        Ok(entries) => {
            let entries: Vec<EntryResponse> =
                entries.into_iter().map(EntryResponse::from).collect();
            (StatusCode::OK, Json(json!({ "entries": entries }))).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/accounts/{account_id}/reconciliation` - Replay the entry log and
/// compare it against the cached balances.
async fn reconcile(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .accounts()
        .reconcile(AccountId::from_uuid(account_id))
        .await
    {
        Ok(reconciliation) => (StatusCode::OK, Json(json!(reconciliation))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
