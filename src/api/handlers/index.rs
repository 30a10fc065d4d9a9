//! Handler for the root endpoint.

use axum::Extension;

use crate::middleware::RequestLogContext;

/// Greets the caller and echoes the request id when one was sent.
///
/// # Endpoint
///
/// `GET /`
pub async fn index_handler(log: Option<Extension<RequestLogContext>>) -> String {
    match log {
        Some(Extension(ctx)) if !ctx.request_id().is_empty() => {
            format!("hello (request {})\n", ctx.request_id())
        }
        _ => "hello\n".to_string(),
    }
}
