//! Top-level router: demo routes wrapped in the request logging layer.
//!
//! # Middleware
//!
//! - **Request logging** - One structured event per request, panic containment
//! - **Path normalization** - Trailing slash handling

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::middleware::{RequestLogConfig, RequestLogLayer};

/// Demo routes with the request logging layer applied.
///
/// The layer sits outermost so panics in any route are contained.
pub fn router(config: RequestLogConfig) -> Router {
    api::routes::routes().layer(RequestLogLayer::new(config))
}

/// Constructs the application router served by the demo binary.
pub fn app_router(config: RequestLogConfig) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(config))
}
