//! Header helpers: request id extraction and redacted header dumps.

use http::{HeaderMap, HeaderName};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Header the request id is read from unless configured otherwise.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers whose values never reach the logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "proxy-authorization",
    "x-api-key",
    "x-auth-token",
];

const REDACTED: &str = "[REDACTED]";

/// Turns request headers into a loggable value.
pub type HeaderDump = Arc<dyn Fn(&HeaderMap) -> Value + Send + Sync>;

/// Reads the request id header; empty when missing or not valid text.
pub fn extract_request_id(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Dumps headers as a JSON object with sensitive values redacted.
///
/// Repeated headers are joined with `", "`. Values that are not valid text
/// are logged lossily.
pub fn redacted_headers(headers: &HeaderMap) -> Value {
    let mut out = Map::new();

    for name in headers.keys() {
        let key = name.as_str();
        let value = if SENSITIVE_HEADERS.contains(&key) {
            REDACTED.to_string()
        } else {
            headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.insert(key.to_string(), Value::String(value));
    }

    Value::Object(out)
}
