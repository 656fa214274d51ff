//! Per-request instrumentation stage.
//!
//! Wraps every routed request: times it from receipt until the handler has
//! produced a response, then records the request counter and emits one
//! `request` log event, in that order.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use crate::metrics::Metrics;
use crate::utils::round_to;

/// Path of the scrape endpoint. Requests to it are logged but not counted.
pub const METRICS_PATH: &str = "/metrics";

/// Middleware recording metrics and a structured log line per request.
pub async fn track_requests(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    // The counter's endpoint label is the route template (`/message/:id`),
    // not the literal path, so label cardinality stays bounded. Unmatched
    // requests fall back to the literal path. See "Counter `endpoint` label"
    // in DESIGN.md. The log line always carries the literal path.
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    if path != METRICS_PATH {
        metrics.increment_request_counter(
            method.as_str(),
            endpoint.as_deref().unwrap_or(&path),
            status,
        );
    }

    info!(
        method = %method,
        path = %path,
        status,
        duration = round_to(duration, 4),
        "request"
    );

    response
}
