//! The structured record emitted once per logged request.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::time::Duration;

use super::capture::CapturedBody;
use super::fields::{self, LogFields};
use super::policy::Severity;

/// One request's log record.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub severity: Severity,
    pub message: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub bytes_written: u64,
    /// Empty request ids are left out.
    pub request_id: Option<String>,
    pub operation: Option<String>,
    pub headers: Option<Value>,
    pub request_body: Option<CapturedBody>,
    pub response_body: Option<CapturedBody>,
    pub error: Option<String>,
    /// Simplified call stack, only set for recovered panics.
    pub stack: Vec<String>,
    /// Extra fields attached by handlers.
    pub fields: LogFields,
}

impl LogEvent {
    /// Serializes the event with the flat field names of [`fields`](super::fields).
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Looks a field up by its flat name, custom fields included.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self.to_json() {
            Value::Object(mut map) => map.remove(name),
            _ => None,
        }
    }
}

impl Serialize for LogEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", &self.severity)?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry(fields::HTTP_METHOD, &self.method)?;
        map.serialize_entry(fields::HTTP_URL_DETAILS_PATH, &self.path)?;
        map.serialize_entry(fields::HTTP_STATUS_CODE, &self.status)?;
        map.serialize_entry(fields::DURATION, &duration_nanos(self.duration))?;
        map.serialize_entry(fields::NETWORK_BYTES_WRITTEN, &self.bytes_written)?;

        if let Some(id) = &self.request_id {
            map.serialize_entry(fields::HTTP_REQUEST_ID, id)?;
        }
        if let Some(op) = &self.operation {
            map.serialize_entry(fields::OPERATION, op)?;
        }
        if let Some(headers) = &self.headers {
            map.serialize_entry(fields::HTTP_HEADERS, headers)?;
        }
        if let Some(body) = &self.request_body {
            map.serialize_entry(fields::NETWORK_BYTES_READ, &body.original_size())?;
            match body.error() {
                Some(err) => map.serialize_entry(fields::REQUEST_ERROR, err)?,
                None => {
                    map.serialize_entry(fields::REQUEST, &body.text())?;
                    if body.is_truncated() {
                        map.serialize_entry(fields::REQUEST_TRUNCATED, &true)?;
                    }
                }
            }
        }
        if let Some(body) = &self.response_body {
            map.serialize_entry(fields::NETWORK_BYTES_RESPONSE, &body.original_size())?;
            map.serialize_entry(fields::RESPONSE, &body.text())?;
            if body.is_truncated() {
                map.serialize_entry(fields::RESPONSE_TRUNCATED, &true)?;
            }
        }
        if let Some(err) = &self.error {
            map.serialize_entry(fields::ERROR, err)?;
        }
        if !self.stack.is_empty() {
            map.serialize_entry(fields::STACK, &self.stack)?;
        }
        for (key, value) in self.fields.iter() {
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

pub(crate) fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
