//! # httplog
//!
//! Structured request logging middleware for axum and tower services.
//!
//! [`RequestLogLayer`](middleware::RequestLogLayer) wraps a handler chain
//! and emits exactly one event per request, named with Datadog's HTTP
//! attribute conventions, at a severity derived from the response status.
//! Bodies can be captured under a size cap, and panics in the chain are
//! logged with a simplified stack and answered with a plain `500`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use httplog::prelude::*;
//!
//! let app = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .route("/health", get(|| async { "ok" }))
//!     .layer(RequestLogLayer::new(
//!         RequestLogConfig::new().policy(SkipPaths::new(["/health"])),
//!     ));
//! ```
//!
//! ## Modules
//!
//! - [`middleware`] - The request logging layer and its parts
//! - [`config`] - Environment configuration for the demo server
//! - [`telemetry`] - `tracing` subscriber setup
//! - [`api`], [`routes`], [`server`] - The `httplog-demo` server

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use error::AppError;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::middleware::{
        Decision, DecisionPolicy, LogEvent, LogFields, LogRequestBody, LogSink, MemorySink,
        Operation, RequestLogConfig, RequestLogContext, RequestLogLayer, Severity, SkipPaths,
        TracingSink,
    };
}
