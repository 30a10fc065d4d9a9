//! Per-request logging decisions.
//!
//! A [`DecisionPolicy`] runs once per request, before anything else, and
//! decides whether the request is logged, which bodies are captured and how
//! the final status maps to a [`Severity`].
//!
//! # Example
//!
//! ```rust,ignore
//! use httplog::middleware::{Decision, RequestLogConfig};
//!
//! // Capture bodies on the webhook route only.
//! let config = RequestLogConfig::new().policy(|req: &Request| {
//!     if req.uri().path().starts_with("/webhooks") {
//!         Decision::log_everything()
//!     } else {
//!         Decision::default()
//!     }
//! });
//! ```

use axum::extract::Request;
use http::{Method, StatusCode, Uri};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Importance of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// `>= 500` is an error, `4xx` a warning, everything else info.
    ///
    /// Non-standard codes above 599 count as errors too.
    pub fn from_status(status: StatusCode) -> Self {
        let code = status.as_u16();
        if code >= 500 {
            Severity::Error
        } else if code >= 400 {
            Severity::Warn
        } else {
            Severity::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a request still available once it has been handed off.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
}

impl RequestHead {
    pub fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
        }
    }
}

/// Maps a request and its final status to a severity.
pub type SeverityFn = Arc<dyn Fn(&RequestHead, StatusCode) -> Severity + Send + Sync>;

/// Default severity mapping, see [`Severity::from_status`].
pub fn default_severity(_head: &RequestHead, status: StatusCode) -> Severity {
    Severity::from_status(status)
}

/// Outcome of a [`DecisionPolicy`] for one request. Immutable once computed.
#[derive(Clone)]
pub struct Decision {
    pub log: bool,
    pub log_request_body: bool,
    pub log_response_body: bool,
    pub severity: SeverityFn,
}

impl Decision {
    /// Logs the request without bodies.
    pub fn log() -> Self {
        Self {
            log: true,
            log_request_body: false,
            log_response_body: false,
            severity: Arc::new(default_severity),
        }
    }

    /// Bypasses logging entirely.
    pub fn skip() -> Self {
        Self {
            log: false,
            ..Self::log()
        }
    }

    /// Logs the request and its body.
    pub fn log_request_body() -> Self {
        Self {
            log_request_body: true,
            ..Self::log()
        }
    }

    /// Logs the request with both bodies.
    pub fn log_everything() -> Self {
        Self {
            log_request_body: true,
            log_response_body: true,
            ..Self::log()
        }
    }

    /// Replaces the severity mapping for this request.
    pub fn with_severity<F>(mut self, severity: F) -> Self
    where
        F: Fn(&RequestHead, StatusCode) -> Severity + Send + Sync + 'static,
    {
        self.severity = Arc::new(severity);
        self
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::log()
    }
}

impl fmt::Debug for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decision")
            .field("log", &self.log)
            .field("log_request_body", &self.log_request_body)
            .field("log_response_body", &self.log_response_body)
            .finish_non_exhaustive()
    }
}

/// Decides how a request is logged.
///
/// Implemented for any `Fn(&Request) -> Decision`, so closures work directly.
pub trait DecisionPolicy: Send + Sync + 'static {
    fn decide(&self, req: &Request) -> Decision;
}

impl<F> DecisionPolicy for F
where
    F: Fn(&Request) -> Decision + Send + Sync + 'static,
{
    fn decide(&self, req: &Request) -> Decision {
        self(req)
    }
}

/// Logs every request, never captures bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDefault;

impl DecisionPolicy for LogDefault {
    fn decide(&self, _req: &Request) -> Decision {
        Decision::log()
    }
}

/// Logs every request with its request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestBody;

impl DecisionPolicy for LogRequestBody {
    fn decide(&self, _req: &Request) -> Decision {
        Decision::log_request_body()
    }
}

/// Logs every request with both bodies. Avoid on large or streaming routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEverything;

impl DecisionPolicy for LogEverything {
    fn decide(&self, _req: &Request) -> Decision {
        Decision::log_everything()
    }
}

/// Skips requests whose path starts with one of the given prefixes and
/// defers to another policy for the rest.
pub struct SkipPaths<P = LogDefault> {
    prefixes: Vec<String>,
    inner: P,
}

impl SkipPaths<LogDefault> {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            inner: LogDefault,
        }
    }
}

impl<P> SkipPaths<P> {
    /// Uses `inner` for requests that are not skipped.
    pub fn then<Q: DecisionPolicy>(self, inner: Q) -> SkipPaths<Q> {
        SkipPaths {
            prefixes: self.prefixes,
            inner,
        }
    }
}

impl<P: DecisionPolicy> DecisionPolicy for SkipPaths<P> {
    fn decide(&self, req: &Request) -> Decision {
        let path = req.uri().path();
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            Decision::skip()
        } else {
            self.inner.decide(req)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(path: &str) -> Request {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[test]
    fn default_severity_follows_status_class() {
        let head = RequestHead::from_request(&request("/"));

        assert_eq!(
            default_severity(&head, StatusCode::SERVICE_UNAVAILABLE),
            Severity::Error
        );
        assert_eq!(default_severity(&head, StatusCode::NOT_FOUND), Severity::Warn);
        assert_eq!(default_severity(&head, StatusCode::OK), Severity::Info);
        assert_eq!(
            default_severity(&head, StatusCode::PERMANENT_REDIRECT),
            Severity::Info
        );
    }

    #[test]
    fn nonstandard_codes_above_599_are_errors() {
        for code in [600, 999] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(Severity::from_status(status), Severity::Error, "{code}");
        }
        let status = StatusCode::from_u16(499).unwrap();
        assert_eq!(Severity::from_status(status), Severity::Warn);
    }

    #[test]
    fn presets_set_body_flags() {
        let req = request("/");

        let d = LogDefault.decide(&req);
        assert!(d.log && !d.log_request_body && !d.log_response_body);

        let d = LogRequestBody.decide(&req);
        assert!(d.log && d.log_request_body && !d.log_response_body);

        let d = LogEverything.decide(&req);
        assert!(d.log && d.log_request_body && d.log_response_body);
    }

    #[test]
    fn skip_paths_bypasses_matching_prefixes() {
        let policy = SkipPaths::new(["/health", "/metrics"]).then(LogEverything);

        assert!(!policy.decide(&request("/health")).log);
        assert!(!policy.decide(&request("/metrics/prom")).log);

        let d = policy.decide(&request("/api/users"));
        assert!(d.log && d.log_response_body);
    }

    #[test]
    fn custom_severity_overrides_default() {
        let decision = Decision::log().with_severity(|head, status| {
            if head.uri.path() == "/probe" && status == StatusCode::NOT_FOUND {
                Severity::Debug
            } else {
                Severity::from_status(status)
            }
        });

        let probe = RequestHead::from_request(&request("/probe"));
        let other = RequestHead::from_request(&request("/other"));
        assert_eq!((decision.severity)(&probe, StatusCode::NOT_FOUND), Severity::Debug);
        assert_eq!((decision.severity)(&other, StatusCode::NOT_FOUND), Severity::Warn);
    }

    #[test]
    fn closures_are_policies() {
        let policy = |req: &Request| {
            if req.method() == Method::POST {
                Decision::log_request_body()
            } else {
                Decision::skip()
            }
        };

        assert!(!policy.decide(&request("/")).log);
    }
}
