//! HTTP API module: health, processing, message lookup and metrics endpoints.

pub mod doc;
pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
