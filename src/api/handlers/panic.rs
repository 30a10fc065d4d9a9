//! Handler that always panics.

/// Panics with `"boom"`.
///
/// # Endpoint
///
/// `GET /panic`
///
/// The request log layer turns the panic into an error event and a plain
/// `500`; the server keeps serving.
pub async fn panic_handler() -> &'static str {
    panic!("boom");
}
