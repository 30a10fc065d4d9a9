//! Per-request logging context and the clock it is timed with.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::capture::CapturedBody;
use super::fields::LogFields;

/// Source of monotonic timestamps for request timing.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The process clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// State carried by one request from entry to log emission.
///
/// Owned by the request's own task; it moves into the response body wrapper
/// and is dropped when the event is emitted.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub fields: LogFields,
    pub headers: Option<serde_json::Value>,
    pub request_body: Option<CapturedBody>,
    pub start: Instant,
}

impl RequestContext {
    pub fn new(request_id: String, start: Instant) -> Self {
        Self {
            request_id,
            fields: LogFields::new(),
            headers: None,
            request_body: None,
            start,
        }
    }

    /// Snapshot handed to the handler chain as a request extension.
    pub fn handle(&self) -> RequestLogContext {
        RequestLogContext {
            request_id: self.request_id.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// Logging context visible to handlers through the request extensions.
///
/// Present only on requests that are being logged.
///
/// ```rust,ignore
/// async fn handler(Extension(log): Extension<RequestLogContext>) -> String {
///     format!("request {}", log.request_id())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestLogContext {
    request_id: String,
    fields: LogFields,
}

impl RequestLogContext {
    /// Correlation id taken from the request id header, empty if absent.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Fields attached before the handler ran.
    pub fn fields(&self) -> &LogFields {
        &self.fields
    }
}

/// Operation label for the log event, returned by a handler as a response
/// extension. Replaces the default `"<status> <method> <url>"` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation(pub String);

impl Operation {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}
