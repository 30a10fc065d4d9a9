//! Demo route table and the logging policy that goes with it.
//!
//! # Endpoints
//!
//! - `GET  /`           - Greeting
//! - `GET  /health`     - Liveness probe (not logged)
//! - `POST /echo`       - Echoes the body (both bodies logged)
//! - `GET  /users/{id}` - User lookup (labelled operation, custom fields)
//! - `GET  /panic`      - Always panics

use axum::Router;
use axum::extract::Request;
use axum::routing::{get, post};

use crate::api::handlers::{
    echo_handler, health_handler, index_handler, panic_handler, user_handler,
};
use crate::middleware::Decision;

/// Paths that bypass request logging entirely.
pub const UNLOGGED_PATHS: &[&str] = &["/health"];

/// Creates the demo routes, without any middleware.
pub fn routes() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/echo", post(echo_handler))
        .route("/users/{id}", get(user_handler))
        .route("/panic", get(panic_handler))
}

/// Logging decision for the demo routes.
///
/// Probes are skipped, `/echo` is logged with both bodies, everything else
/// gets the default treatment.
pub fn log_policy(req: &Request) -> Decision {
    let path = req.uri().path();

    if UNLOGGED_PATHS.iter().any(|p| path.starts_with(p)) {
        Decision::skip()
    } else if path == "/echo" {
        Decision::log_everything()
    } else {
        Decision::log()
    }
}
