//! Log field names and the append-only per-request field set.
//!
//! Names follow the Datadog HTTP attribute naming convention so events can be
//! faceted without remapping:
//! <https://docs.datadoghq.com/logs/log_configuration/attributes_naming_convention/#http-requests>

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Request duration in nanoseconds.
pub const DURATION: &str = "duration";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL_DETAILS_PATH: &str = "http.url_details.path";
pub const HTTP_REQUEST_ID: &str = "http.request_id";
pub const HTTP_HEADERS: &str = "http.headers";
pub const NETWORK_BYTES_WRITTEN: &str = "network.bytes_written";
/// Original (untruncated) request body size.
pub const NETWORK_BYTES_READ: &str = "network.bytes_read";
/// Original (untruncated) response body size.
pub const NETWORK_BYTES_RESPONSE: &str = "network.bytes_response";
pub const OPERATION: &str = "op";
pub const REQUEST: &str = "request";
pub const REQUEST_ERROR: &str = "request.error";
pub const REQUEST_TRUNCATED: &str = "request.truncated";
pub const RESPONSE: &str = "response";
pub const RESPONSE_TRUNCATED: &str = "response.truncated";
pub const ERROR: &str = "error";
pub const STACK: &str = "error.stack";
/// Id of the authenticated user, for handlers to attach.
pub const USER_ID: &str = "usr.id";
/// Distributed trace id, for handlers to attach.
pub const TRACE_ID: &str = "trace_id";

/// Ordered key/value pairs attached to a request's log event.
///
/// Fields are only ever appended. When a key is pushed twice the later value
/// wins on lookup and serialization, but both stay in insertion order.
///
/// Handlers can return a `LogFields` as a response extension to add their own
/// fields to the event:
///
/// ```rust,ignore
/// async fn get_user(Path(id): Path<u64>) -> impl IntoResponse {
///     let fields = LogFields::new().with(fields::USER_ID, id);
///     (Extension(fields), Json(load(id)))
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFields {
    entries: Vec<(Cow<'static, str>, Value)>,
}

impl LogFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn push(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder form of [`LogFields::push`].
    pub fn with(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends every field of `other`, keeping its order.
    pub fn extend(&mut self, other: LogFields) {
        self.entries.extend(other.entries);
    }

    /// Returns the most recent value pushed for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Entries with shadowed keys removed, in first-insertion order.
    fn effective(&self) -> Vec<(&str, &Value)> {
        let mut out: Vec<(&str, &Value)> = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match out.iter_mut().find(|(k, _)| *k == key.as_ref()) {
                Some(slot) => slot.1 = value,
                None => out.push((key.as_ref(), value)),
            }
        }
        out
    }
}

impl Serialize for LogFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let effective = self.effective();
        let mut map = serializer.serialize_map(Some(effective.len()))?;
        for (key, value) in effective {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for LogFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}
