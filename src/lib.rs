//! Observability demo service.
//!
//! A small HTTP service with three business endpoints, every request
//! instrumented with Prometheus metrics and one structured log line.
//!
//! ```text
//! GET  /health          {"status":"ok"}
//! POST /process         {"data": "...", "priority": 1..=5}
//! GET  /message/{id}    seeded message lookup
//! GET  /metrics         Prometheus exposition
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Message table, schema and seed data
//! - [`metrics`]: Metrics registry and exposition
//! - [`api`]: Handlers, request pipeline and routes
//! - [`app`]: Startup and serving
//! - [`utils`]: Utility functions

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, StartupError, StoreError};
