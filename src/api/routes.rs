//! HTTP API route definitions.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{get_message, health, metrics, not_found, openapi, process, AppState};
use super::pipeline::{track_requests, METRICS_PATH};

/// Create the API router with the instrumentation stage applied to every
/// route, including the fallback.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .route("/message/:id", get(get_message))
        .route(METRICS_PATH, get(metrics))
        .route("/openapi.json", get(openapi))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .with_state(state)
}
