//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use sha2::{Digest, Sha256};
use tower_http::trace::TraceLayer;

use crate::config::LedgerSettings;
use crate::store::LedgerStore;

pub use routes::create_router;

/// Shared state handed to every route and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub settings: LedgerSettings,
    /// Hex SHA-256 of the gateway key, when one is configured
    pub gateway_key_digest: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self {
            store,
            settings,
            gateway_key_digest: None,
        }
    }

    pub fn with_gateway_key(mut self, key: Option<&str>) -> Self {
        self.gateway_key_digest = key.map(digest_key);
        self
    }
}

pub(crate) fn digest_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run last-added first: logging -> principal -> handler
    let api_router = create_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::principal_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
