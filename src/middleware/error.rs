//! Error types produced inside the request logging middleware.

use std::any::Any;
use std::error::Error as StdError;

/// Failure while reading a request body for capture.
///
/// Never surfaced to the handler chain or the client; it ends up as the
/// `request.error` field of the log event.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// A panic raised by the wrapped handler chain, normalized into an error.
#[derive(Debug, thiserror::Error)]
pub enum HandlerPanic {
    /// `panic!("...")` with a message.
    #[error("{0}: internal error")]
    Message(String),

    /// `std::panic::panic_any` with an error value.
    #[error("{0}")]
    Error(#[source] Box<dyn StdError + Send + Sync>),

    /// Any other payload.
    #[error("internal error")]
    Internal,
}

impl HandlerPanic {
    /// Normalizes a panic payload as returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<String>() {
            Ok(msg) => return Self::Message(*msg),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<&'static str>() {
            Ok(msg) => return Self::Message((*msg).to_string()),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
            Ok(err) => return Self::Error(*err),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<anyhow::Error>() {
            Ok(err) => return Self::Error((*err).into()),
            Err(payload) => payload,
        };
        match payload.downcast::<std::io::Error>() {
            Ok(err) => Self::Error(err),
            Err(_) => Self::Internal,
        }
    }
}
