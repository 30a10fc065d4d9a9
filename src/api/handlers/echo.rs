//! Handler for the echo endpoint.

use axum::body::Bytes;
use axum::http::header;
use axum::response::IntoResponse;
use serde_json::json;

use crate::error::AppError;

/// Sends the request body back unchanged.
///
/// # Endpoint
///
/// `POST /echo`
///
/// The router logs both bodies for this route, so the handler reading the
/// body here shows that capture leaves it intact.
///
/// # Errors
///
/// - **400 Bad Request**: Empty body
pub async fn echo_handler(body: Bytes) -> Result<impl IntoResponse, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request(
            "Request body is empty",
            json!({ "hint": "send any payload" }),
        ));
    }

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body))
}
