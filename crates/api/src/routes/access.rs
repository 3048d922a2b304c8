//! Content access surface.
//!
//! The media delivery layer calls this before serving paid content. It is a
//! pure read; nothing here counts views or mutates state.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use tessera_shared::types::{AccountId, ContentId};

use super::ledger_error_response;
use crate::AppState;

/// Creates the access-check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/accounts/{account_id}/access/{content_id}",
        get(check_access),
    )
}

/// GET `/accounts/{account_id}/access/{content_id}` - May this account view
/// this content right now?
async fn check_access(
    State(state): State<AppState>,
    Path((account_id, content_id)): Path<(Uuid, String)>,
) -> impl IntoResponse {
    match state
        .entitlements()
        .has_access(
            AccountId::from_uuid(account_id),
            &ContentId::new(content_id),
            Utc::now(),
        )
        .await
    {
        Ok(decision) => (StatusCode::OK, Json(json!(decision))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
