//! HTTP request logging middleware.
//!
//! [`RequestLogLayer`] wraps a handler chain and emits one structured
//! [`LogEvent`] per request at a severity derived from the response status.
//! Panics raised by the chain are logged with a simplified stack and answered
//! with a generic `500` instead of tearing the connection down.
//!
//! - [`observer`] - status and byte accounting, bounded response tee
//! - [`capture`] - request body capture that leaves the body readable
//! - [`policy`] - per-request decisions and severity mapping
//! - [`panic`] - panic containment
//! - [`sink`] - where events go (`tracing` by default)

pub mod access_log;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fields;
pub mod headers;
pub mod observer;
pub mod panic;
pub mod policy;
pub mod sink;

pub use access_log::{RequestLogLayer, RequestLogService};
pub use capture::{CapturedBody, DEFAULT_MAX_BODY_LOG, capture_request};
pub use config::RequestLogConfig;
pub use context::{Clock, ManualClock, Operation, RequestLogContext, SystemClock};
pub use error::{CaptureError, HandlerPanic};
pub use event::LogEvent;
pub use fields::LogFields;
pub use observer::{ResponseObserver, TeeBuffer};
pub use panic::DEFAULT_STACK_SKIP;
pub use policy::{
    Decision, DecisionPolicy, LogDefault, LogEverything, LogRequestBody, RequestHead, Severity,
    SkipPaths, default_severity,
};
pub use sink::{LogSink, MemorySink, TracingSink};
