//! API module for the ledger server

pub mod error;
pub mod handlers;
pub mod invocation;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness of this ledger peer
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub node_name: String,
    /// Committed world state keys, nodes and tokens together
    pub world_state_keys: usize,
    /// Accepted distance between caller timestamps and transaction time
    pub max_clock_skew_secs: i64,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: true,
        node_name: state.config.node_name.clone(),
        world_state_keys: state.store.len(),
        max_clock_skew_secs: state.config.max_clock_skew_secs,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/v1/transactions", post(handlers::submit_transaction))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
