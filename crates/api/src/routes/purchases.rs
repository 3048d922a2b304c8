//! Purchase and subscription routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use tessera_db::PurchaseOutcome;
use tessera_shared::types::{AccountId, ContentId, Currency, Money};

use super::{ledger_error_response, EntryResponse};
use crate::AppState;

/// Creates the purchase and subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{account_id}/purchases", post(purchase))
        .route("/accounts/{account_id}/subscription", post(subscribe))
}

/// Request body for a content purchase.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// The content to unlock.
    pub content_id: String,
    /// Price in minor units.
    pub price: i64,
    /// ISO 4217 currency code; must match the account.
    pub currency: String,
    /// Optional deduplication key.
    pub idempotency_key: Option<String>,
}

/// Request body for a subscription charge.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    /// Price in minor units.
    pub price: i64,
    /// ISO 4217 currency code; must match the account.
    pub currency: String,
    /// Window length in days.
    pub duration_days: u32,
    /// Optional deduplication key.
    pub idempotency_key: Option<String>,
}

fn parse_currency(raw: &str) -> Result<Currency, axum::response::Response> {
    Currency::from_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "UNKNOWN_CURRENCY",
                "message": format!("Unknown currency: {raw}")
            })),
        )
            .into_response()
    })
}

/// POST `/accounts/{account_id}/purchases` - Buy one piece of content.
async fn purchase(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<PurchaseRequest>,
) -> impl IntoResponse {
    let currency = match parse_currency(&payload.currency) {
        Ok(currency) => currency,
        Err(response) => return response,
    };

    let outcome = state
        .ledger()
        .purchase(
            AccountId::from_uuid(account_id),
            &ContentId::new(payload.content_id),
            Money::from_minor(payload.price, currency),
            payload.idempotency_key,
        )
        .await;

    match outcome {
        Ok(PurchaseOutcome::Charged { entry, grant }) => (
            StatusCode::CREATED,
            Json(json!({
                "outcome": "charged",
                "entry": EntryResponse::from(entry),
                "grant": grant,
            })),
        )
            .into_response(),
        Ok(PurchaseOutcome::AlreadyOwned { grant }) => (
            StatusCode::OK,
            Json(json!({
                "outcome": "already_owned",
                "grant": grant,
            })),
        )
            .into_response(),
        Ok(PurchaseOutcome::CoveredBySubscription { expires_at }) => (
            StatusCode::OK,
            Json(json!({
                "outcome": "covered_by_subscription",
                "expires_at": expires_at,
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/accounts/{account_id}/subscription` - Charge for a subscription
/// window.
async fn subscribe(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<SubscribeRequest>,
) -> impl IntoResponse {
    let currency = match parse_currency(&payload.currency) {
        Ok(currency) => currency,
        Err(response) => return response,
    };

    match state
        .ledger()
        .subscribe(
            AccountId::from_uuid(account_id),
            Money::from_minor(payload.price, currency),
            payload.duration_days,
            payload.idempotency_key,
        )
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
