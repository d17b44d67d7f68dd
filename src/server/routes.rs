//! Router configuration for the web server.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Aggregation views
        .route("/api/trends", get(handlers::api_trends))
        .route("/api/phrases", get(handlers::api_phrases))
        .route("/api/network", get(handlers::api_network))
        // Run ledger
        .route("/api/runs", get(handlers::api_runs))
        .route("/api/runs/:run_id", get(handlers::api_run_detail))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
