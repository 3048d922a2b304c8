//! Callback-style moderation surface.
//!
//! External moderation frontends (e.g. a chat bot's inline-keyboard
//! callback) post their verdicts here. The payload reduces to the same
//! `ModeratorAction` the admin endpoints build, and routes into the same
//! idempotent resolution call — two surfaces, one balance mutation per
//! real-world approval.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tessera_core::workflow::{DepositDecision, ModeratorAction};
use tessera_shared::types::EntryId;

use super::{ledger_error_response, EntryResponse};
use crate::AppState;

/// Creates the moderation hook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/hooks/moderation", post(moderation_callback))
}

/// Callback payload from an external moderation frontend.
#[derive(Debug, Deserialize)]
pub struct ModerationCallback {
    /// The deposit entry the verdict is for.
    pub entry_id: Uuid,
    /// `approve` or `reject`.
    pub decision: String,
    /// Reference to the acting moderator (e.g. chat user ID).
    pub actor_ref: String,
    /// Reason, required for rejections.
    pub reason: Option<String>,
}

/// POST `/hooks/moderation` - Resolve a deposit from a callback verdict.
async fn moderation_callback(
    State(state): State<AppState>,
    Json(payload): Json<ModerationCallback>,
) -> impl IntoResponse {
    let Some(decision) = DepositDecision::parse(&payload.decision) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "UNKNOWN_DECISION",
                "message": format!("Unknown decision: {}", payload.decision)
            })),
        )
            .into_response();
    };

    info!(
        entry_id = %payload.entry_id,
        decision = %decision,
        actor = %payload.actor_ref,
        "moderation callback received"
    );

    match state
        .ledger()
        .resolve_deposit(ModeratorAction {
            entry_id: EntryId::from_uuid(payload.entry_id),
            decision,
            actor_ref: payload.actor_ref,
            reason: payload.reason,
        })
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(EntryResponse::from(entry))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
