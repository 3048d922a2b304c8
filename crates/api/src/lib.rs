//! HTTP API layer with Axum routes.
//!
//! Every surface here — admin endpoints, the moderation callback hook, the
//! content access check — is a thin shell over the repositories; the ledger
//! semantics live entirely in `tessera-core` and `tessera-db`.

pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tessera_core::events::EventSink;
use tessera_db::{AccountRepository, EntitlementRepository, LedgerRepository};
use tessera_shared::config::LedgerConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Sink for ledger notification events.
    pub events: Arc<dyn EventSink>,
    /// Retry configuration for contended ledger operations.
    pub ledger_config: LedgerConfig,
}

impl AppState {
    /// Builds a ledger repository over the shared pool.
    #[must_use]
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(
            (*self.db).clone(),
            self.ledger_config.clone(),
            Arc::clone(&self.events),
        )
    }

    /// Builds an account repository over the shared pool.
    #[must_use]
    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new((*self.db).clone())
    }

    /// Builds an entitlement repository over the shared pool.
    #[must_use]
    pub fn entitlements(&self) -> EntitlementRepository {
        EntitlementRepository::new((*self.db).clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
