//! HTTP API handlers.

use std::time::Instant;

use axum::extract::rejection::PathRejection;
use axum::extract::{FromRef, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::doc::ApiDoc;
use super::extract::{DbSession, ValidatedJson};
use crate::error::{ApiError, Result};
use crate::metrics::{Metrics, EXPOSITION_CONTENT_TYPE};
use crate::store::{Message, MessageStore};

/// Operation label for message lookups in the db-duration histogram.
pub const OP_GET_MESSAGE: &str = "get_message";

/// Detail returned when a message id does not exist.
pub const MESSAGE_NOT_FOUND: &str = "Message not found";

/// Detail returned for paths no route matches.
pub const ROUTE_NOT_FOUND: &str = "Not Found";

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Message table handle.
    pub store: MessageStore,
    /// Process-wide metrics registry.
    pub metrics: Metrics,
}

impl AppState {
    /// Create new app state.
    pub fn new(store: MessageStore, metrics: Metrics) -> Self {
        Self { store, metrics }
    }
}

impl FromRef<AppState> for MessageStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Metrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
}

/// Body of `POST /process`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProcessRequest {
    /// Data to process.
    #[validate(length(min = 1, message = "data must contain at least 1 character"))]
    #[schema(min_length = 1)]
    pub data: String,
    /// Priority 1-5.
    #[serde(default = "default_priority")]
    #[validate(range(min = 1, max = 5, message = "priority must be between 1 and 5"))]
    #[schema(minimum = 1, maximum = 5, default = 1)]
    pub priority: i64,
}

fn default_priority() -> i64 {
    1
}

/// Result of `POST /process`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    /// Fresh identifier, unique per call.
    pub request_id: String,
    /// Always `"completed"`.
    pub status: String,
    /// `processed-<priority>`.
    pub result: String,
    /// Number of characters in `data`.
    pub data_length: usize,
}

impl ProcessResponse {
    /// Run the synthetic transform for an already validated request.
    pub fn for_request(request: &ProcessRequest) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: "completed".to_string(),
            result: format!("processed-{}", request.priority),
            data_length: request.data.chars().count(),
        }
    }
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Synthetic processing handler.
#[utoipa::path(
    post,
    path = "/process",
    tag = "process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Processed", body = ProcessResponse),
        (status = 422, description = "Validation error")
    )
)]
pub async fn process(
    State(metrics): State<Metrics>,
    ValidatedJson(payload): ValidatedJson<ProcessRequest>,
) -> Json<ProcessResponse> {
    let start = Instant::now();
    let response = ProcessResponse::for_request(&payload);
    metrics.record_process_duration(start);
    Json(response)
}

/// Message lookup handler.
#[utoipa::path(
    get,
    path = "/message/{id}",
    tag = "message",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message found", body = Message),
        (status = 404, description = "Message not found"),
        (status = 422, description = "Id is not an integer")
    )
)]
pub async fn get_message(
    id: std::result::Result<Path<i64>, PathRejection>,
    State(metrics): State<Metrics>,
    DbSession(mut session): DbSession,
) -> Result<Json<Message>> {
    let Path(id) = id?;

    let start = Instant::now();
    let found = session.get_by_id(id).await;
    metrics.record_db_duration(OP_GET_MESSAGE, start);

    found?
        .map(Json)
        .ok_or(ApiError::NotFound(MESSAGE_NOT_FOUND))
}

/// Prometheus scrape handler.
pub async fn metrics(State(metrics): State<Metrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        metrics.render(),
    )
}

/// OpenAPI document handler.
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound(ROUTE_NOT_FOUND)
}
