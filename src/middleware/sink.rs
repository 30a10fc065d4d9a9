//! Destinations for request log events.

use std::sync::{Arc, Mutex};
use tracing::Level;

use super::event::{LogEvent, duration_nanos};
use super::policy::Severity;

/// Receives the finished event of each logged request.
///
/// Called from the task serving the request, after the response body is done.
/// Implementations must not block for long.
pub trait LogSink: Send + Sync + 'static {
    fn emit(&self, event: &LogEvent);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, event: &LogEvent) {
        (**self).emit(event)
    }
}

/// Emits events through `tracing`, one event per request under the
/// `httplog` target, at the event's severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! tracing_event {
    ($level:expr, $e:expr, $v:expr) => {
        tracing::event!(
            target: "httplog",
            $level,
            http.method = %$e.method,
            http.url_details.path = %$e.path,
            http.status_code = $e.status,
            duration = duration_nanos($e.duration),
            network.bytes_written = $e.bytes_written,
            http.request_id = $e.request_id.as_deref(),
            op = $e.operation.as_deref(),
            http.headers = $v.headers.as_deref(),
            network.bytes_read = $v.request_size,
            request = $v.request.as_deref(),
            request.error = $v.request_error,
            request.truncated = $v.request_truncated,
            network.bytes_response = $v.response_size,
            response = $v.response.as_deref(),
            response.truncated = $v.response_truncated,
            error = $e.error.as_deref(),
            error.stack = $v.stack.as_deref(),
            fields = $v.fields.as_deref(),
            "{}",
            $e.message
        )
    };
}

/// Optional event parts pre-rendered to types `tracing` can record.
struct Rendered<'a> {
    headers: Option<String>,
    request_size: Option<u64>,
    request: Option<String>,
    request_error: Option<&'a str>,
    request_truncated: Option<bool>,
    response_size: Option<u64>,
    response: Option<String>,
    response_truncated: Option<bool>,
    stack: Option<String>,
    fields: Option<String>,
}

impl<'a> Rendered<'a> {
    fn new(event: &'a LogEvent) -> Self {
        let request = event.request_body.as_ref();
        let response = event.response_body.as_ref();
        Self {
            headers: event.headers.as_ref().map(|h| h.to_string()),
            request_size: request.map(|b| b.original_size()),
            request: request
                .filter(|b| b.error().is_none())
                .map(|b| b.text().into_owned()),
            request_error: request.and_then(|b| b.error()),
            request_truncated: request.filter(|b| b.is_truncated()).map(|_| true),
            response_size: response.map(|b| b.original_size()),
            response: response.map(|b| b.text().into_owned()),
            response_truncated: response.filter(|b| b.is_truncated()).map(|_| true),
            stack: (!event.stack.is_empty()).then(|| event.stack.join("\n")),
            fields: (!event.fields.is_empty()).then(|| event.fields.to_string()),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, event: &LogEvent) {
        let v = Rendered::new(event);
        match event.severity {
            Severity::Error => tracing_event!(Level::ERROR, event, v),
            Severity::Warn => tracing_event!(Level::WARN, event, v),
            Severity::Info => tracing_event!(Level::INFO, event, v),
            Severity::Debug => tracing_event!(Level::DEBUG, event, v),
            Severity::Trace => tracing_event!(Level::TRACE, event, v),
        }
    }
}

/// Keeps every event in memory. Clones share the same store.
///
/// Meant for tests and for embedding the middleware where events are
/// forwarded in batches.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: &LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
