//! Handler for user lookups.

use axum::response::IntoResponse;
use axum::{Extension, Json, extract::Path};
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;
use crate::middleware::fields::USER_ID;
use crate::middleware::{LogFields, Operation};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
}

/// Largest id the demo store knows about.
const KNOWN_USERS: u64 = 100;

/// Looks a user up by id.
///
/// # Endpoint
///
/// `GET /users/{id}`
///
/// Labels the log event with the `get_user` operation and attaches the
/// looked-up id as `usr.id`.
///
/// # Errors
///
/// - **404 Not Found**: No user with that id
pub async fn user_handler(Path(id): Path<u64>) -> impl IntoResponse {
    let fields = LogFields::new().with(USER_ID, id);
    let operation = Operation::new("get_user");

    let result = if (1..=KNOWN_USERS).contains(&id) {
        Ok(Json(UserResponse {
            id,
            name: format!("user-{id}"),
        }))
    } else {
        Err(AppError::not_found("User not found", json!({ "id": id })))
    };

    (Extension(operation), Extension(fields), result)
}
