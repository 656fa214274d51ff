//! Unified error types for the service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures that prevent the service from coming up.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store could not be opened, migrated or seeded.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Metrics registry could not be built.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// IO error (listener bind, serve).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message store errors raised outside the request path (startup, seeding).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not open the connection pool.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema migration failed.
    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A message with empty text was offered for insertion.
    #[error("message text must not be empty")]
    EmptyText,

    /// Any other query failure.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// One field-level validation failure, reported in a 422 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Location of the offending value, e.g. `["body", "priority"]`.
    pub loc: Vec<String>,
    /// Human-readable description.
    pub msg: String,
    /// Machine-readable error kind.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// Error located in the request body.
    pub fn body(field: Option<&str>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        let mut loc = vec!["body".to_string()];
        if let Some(field) = field {
            loc.push(field.to_string());
        }
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Error located in the URL path.
    pub fn path(field: &str, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: vec!["path".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Errors surfaced by request handlers.
///
/// Every variant is terminal for the request that raised it only.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Database unreachable or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": errors })),
            )
                .into_response(),
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Database(e) => {
                // Full detail goes to the log, never to the client.
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value for {field}"));
                    FieldError::body(Some(field.as_str()), msg, e.code.to_string())
                })
            })
            .collect();
        // HashMap iteration order is unspecified.
        fields.sort_by(|a, b| a.loc.cmp(&b.loc));
        ApiError::Validation(fields)
    }
}

/// Convenient Result type alias for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
