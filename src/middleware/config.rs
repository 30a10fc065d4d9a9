//! Per-instance settings of the request logging middleware.

use http::HeaderName;
use std::fmt;
use std::sync::Arc;

use super::capture::DEFAULT_MAX_BODY_LOG;
use super::context::{Clock, SystemClock};
use super::headers::{DEFAULT_REQUEST_ID_HEADER, HeaderDump, redacted_headers};
use super::panic::DEFAULT_STACK_SKIP;
use super::policy::{DecisionPolicy, LogDefault};
use super::sink::{LogSink, TracingSink};

/// Settings for [`RequestLogLayer`](super::RequestLogLayer).
///
/// Read-only once the layer is built; every clone of the layer shares it.
///
/// # Example
///
/// ```rust,ignore
/// let config = RequestLogConfig::new()
///     .max_body_log(4 * 1024)
///     .policy(SkipPaths::new(["/health"]).then(LogRequestBody));
///
/// let app = Router::new()
///     .route("/", get(index))
///     .layer(RequestLogLayer::new(config));
/// ```
#[derive(Clone)]
pub struct RequestLogConfig {
    pub(crate) max_body_log: usize,
    pub(crate) stack_skip: usize,
    pub(crate) request_id_header: HeaderName,
    pub(crate) header_dump: Option<HeaderDump>,
    pub(crate) policy: Arc<dyn DecisionPolicy>,
    pub(crate) sink: Arc<dyn LogSink>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl RequestLogConfig {
    pub fn new() -> Self {
        let header_dump: HeaderDump = Arc::new(redacted_headers);
        Self {
            max_body_log: DEFAULT_MAX_BODY_LOG,
            stack_skip: DEFAULT_STACK_SKIP,
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            header_dump: Some(header_dump),
            policy: Arc::new(LogDefault),
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
        }
    }

    /// Maximum body bytes attached to an event. Longer bodies are cut; their
    /// real size is still logged.
    pub fn max_body_log(mut self, bytes: usize) -> Self {
        self.max_body_log = bytes;
        self
    }

    /// Innermost stack frames dropped from panic traces.
    pub fn stack_skip(mut self, frames: usize) -> Self {
        self.stack_skip = frames;
        self
    }

    /// Header the request id is read from.
    pub fn request_id_header(mut self, name: HeaderName) -> Self {
        self.request_id_header = name;
        self
    }

    /// Replaces the default redacting header dump.
    pub fn header_dump<F>(mut self, dump: F) -> Self
    where
        F: Fn(&http::HeaderMap) -> serde_json::Value + Send + Sync + 'static,
    {
        let dump: HeaderDump = Arc::new(dump);
        self.header_dump = Some(dump);
        self
    }

    /// Leaves request headers out of the events.
    pub fn without_headers(mut self) -> Self {
        self.header_dump = None;
        self
    }

    pub fn policy<P: DecisionPolicy>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn sink<S: LogSink>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn max_body_log_bytes(&self) -> usize {
        self.max_body_log
    }

    pub fn stack_skip_frames(&self) -> usize {
        self.stack_skip
    }
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogConfig")
            .field("max_body_log", &self.max_body_log)
            .field("stack_skip", &self.stack_skip)
            .field("request_id_header", &self.request_id_header)
            .field("log_headers", &self.header_dump.is_some())
            .finish_non_exhaustive()
    }
}
