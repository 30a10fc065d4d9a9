//! Request logging layer.
//!
//! For every request that passes the policy gate:
//!
//! 1. the request id, headers and (optionally) the request body are attached
//!    to a fresh [`RequestContext`],
//! 2. the inner service runs inside a `request` span and a panic boundary,
//! 3. the response body is wrapped so status and bytes are counted (and
//!    optionally teed) as the client receives them,
//! 4. exactly one [`LogEvent`] is emitted when the body ends, fails or is
//!    dropped.
//!
//! Requests the policy skips go straight to the inner service with nothing
//! wrapped.

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::StatusCode;
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tower::{BoxError, Layer, Service};
use tracing::Instrument;

use super::capture::{self, CapturedBody};
use super::config::RequestLogConfig;
use super::context::{Operation, RequestContext};
use super::event::LogEvent;
use super::fields::LogFields;
use super::headers::extract_request_id;
use super::observer::{ResponseObserver, TeeBuffer};
use super::panic::{self, Fault};
use super::policy::{Decision, RequestHead, Severity, SeverityFn};

/// Layer that logs one structured event per request and contains handler
/// panics.
///
/// # Example
///
/// ```rust,ignore
/// use httplog::middleware::{LogRequestBody, RequestLogConfig, RequestLogLayer, SkipPaths};
///
/// let app = Router::new()
///     .route("/orders", post(create_order))
///     .route("/health", get(health))
///     .layer(RequestLogLayer::new(
///         RequestLogConfig::new().policy(SkipPaths::new(["/health"]).then(LogRequestBody)),
///     ));
/// ```
#[derive(Clone, Debug)]
pub struct RequestLogLayer {
    config: Arc<RequestLogConfig>,
}

impl RequestLogLayer {
    pub fn new(config: RequestLogConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RequestLogConfig {
        &self.config
    }
}

impl Default for RequestLogLayer {
    fn default() -> Self {
        Self::new(RequestLogConfig::default())
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner: S,
    config: Arc<RequestLogConfig>,
}

impl<S, ResBody> Service<Request> for RequestLogService<S>
where
    S: Service<Request, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Display + Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError> + Display,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // The clone is not guaranteed to be ready; keep the one that is.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(serve(config, inner, req))
    }
}

async fn serve<S, ResBody>(
    config: Arc<RequestLogConfig>,
    mut inner: S,
    mut req: Request,
) -> Result<Response, S::Error>
where
    S: Service<Request, Response = Response<ResBody>>,
    S::Error: Display,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError> + Display,
{
    let request_id = extract_request_id(req.headers(), &config.request_id_header);
    let mut ctx = RequestContext::new(request_id, config.clock.now());
    let head = RequestHead::from_request(&req);
    let decision = config.policy.decide(&req);

    if !decision.log {
        return match panic::catch(|| inner.call(req), config.stack_skip).await {
            Ok(result) => result.map(|res| res.map(Body::new)),
            Err(fault) => Ok(recover(&config, &head, ctx, fault)),
        };
    }

    if let Some(dump) = &config.header_dump {
        ctx.headers = Some(dump(req.headers()));
    }

    if decision.log_request_body {
        let (restored, captured) = capture::capture_request(req, config.max_body_log).await;
        req = restored;
        ctx.request_body = Some(captured);
    }

    req.extensions_mut().insert(ctx.handle());

    let span = tracing::info_span!(
        target: "httplog",
        "request",
        http.request_id = %ctx.request_id,
        http.method = %head.method,
        http.url_details.path = %head.uri.path(),
    );

    let outcome = panic::catch(|| inner.call(req), config.stack_skip)
        .instrument(span)
        .await;

    match outcome {
        Err(fault) => Ok(recover(&config, &head, ctx, fault)),
        Ok(Err(err)) => {
            let mut recorder = Recorder::new(ResponseObserver::new(), config, head, ctx, decision);
            recorder.observer.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            recorder.error = Some(err.to_string());
            recorder.finish();
            Err(err)
        }
        Ok(Ok(response)) => {
            let (mut parts, body) = response.into_parts();

            let mut observer = ResponseObserver::new();
            observer.write_header(parts.status);
            if decision.log_response_body {
                observer.tee(TeeBuffer::with_limit(config.max_body_log));
            }

            if let Some(fields) = parts.extensions.remove::<LogFields>() {
                ctx.fields.extend(fields);
            }
            let operation = parts.extensions.remove::<Operation>();

            let mut recorder = Recorder::new(observer, config, head, ctx, decision);
            if let Some(pending) = recorder.pending.as_mut() {
                pending.operation = operation;
            }

            let body = ObservedBody {
                inner: body,
                recorder,
            };
            Ok(Response::from_parts(parts, Body::new(body)))
        }
    }
}

/// Logs a recovered panic and builds the fallback response.
fn recover(
    config: &RequestLogConfig,
    head: &RequestHead,
    ctx: RequestContext,
    fault: Fault,
) -> Response {
    let event = LogEvent {
        severity: Severity::Error,
        message: "Panic".to_string(),
        method: head.method.to_string(),
        path: head.uri.path().to_string(),
        status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        duration: config.clock.now().saturating_duration_since(ctx.start),
        bytes_written: 0,
        request_id: non_empty(ctx.request_id),
        operation: None,
        headers: ctx.headers,
        request_body: ctx.request_body,
        response_body: None,
        error: Some(fault.error.to_string()),
        stack: fault.stack,
        fields: ctx.fields,
    };
    emit(config, &event);

    panic::internal_error_response()
}

fn emit(config: &RequestLogConfig, event: &LogEvent) {
    panic::guard(|| config.sink.emit(event));
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// What is needed to build the event once the response is done.
struct Pending {
    config: Arc<RequestLogConfig>,
    head: RequestHead,
    ctx: RequestContext,
    severity: SeverityFn,
    operation: Option<Operation>,
}

/// Owns the observer of one response and emits its event exactly once:
/// on end of stream, on a body error, or when dropped early.
struct Recorder {
    observer: ResponseObserver,
    error: Option<String>,
    pending: Option<Pending>,
}

impl Recorder {
    fn new(
        observer: ResponseObserver,
        config: Arc<RequestLogConfig>,
        head: RequestHead,
        ctx: RequestContext,
        decision: Decision,
    ) -> Self {
        Self {
            observer,
            error: None,
            pending: Some(Pending {
                config,
                head,
                ctx,
                severity: decision.severity,
                operation: None,
            }),
        }
    }

    fn finish(&mut self) {
        let Some(Pending {
            config,
            head,
            ctx,
            severity,
            operation,
        }) = self.pending.take()
        else {
            return;
        };

        let status = self.observer.status();
        let operation = operation.map(|op| op.0);
        let message = match &operation {
            Some(op) => op.clone(),
            None => format!("{} {} {}", status.as_u16(), head.method, head.uri),
        };

        let event = LogEvent {
            severity: severity(&head, status),
            message,
            method: head.method.to_string(),
            path: head.uri.path().to_string(),
            status: status.as_u16(),
            duration: config.clock.now().saturating_duration_since(ctx.start),
            bytes_written: self.observer.bytes_written(),
            request_id: non_empty(ctx.request_id),
            operation,
            headers: ctx.headers,
            request_body: ctx.request_body,
            response_body: self.observer.take_tee().map(CapturedBody::from_tee),
            error: self.error.take(),
            stack: Vec::new(),
            fields: ctx.fields,
        };
        emit(&config, &event);
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.finish();
    }
}

pin_project! {
    /// Response body that reports every data frame to a [`Recorder`] while
    /// passing frames, trailers and size hints through untouched.
    struct ObservedBody<B> {
        #[pin]
        inner: B,
        recorder: Recorder,
    }
}

impl<B> HttpBody for ObservedBody<B>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Display,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let mut inner = this.inner;
        let polled = ready!(inner.as_mut().poll_frame(cx));

        match &polled {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.recorder.observer.write(data);
                }
                if inner.is_end_stream() {
                    this.recorder.finish();
                }
            }
            Some(Err(err)) => {
                this.recorder.error = Some(err.to_string());
                this.recorder.finish();
            }
            None => this.recorder.finish(),
        }

        Poll::Ready(polled)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::context::ManualClock;
    use crate::middleware::policy::LogEverything;
    use crate::middleware::sink::MemorySink;
    use futures_util::stream;
    use http_body_util::BodyExt;
    use std::convert::Infallible;
    use std::io;
    use std::time::Duration;
    use tower::{ServiceExt, service_fn};

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn streamed_body_is_counted_across_frames() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|_req: Request| async {
            let chunks: Vec<Result<Bytes, Infallible>> = vec![
                Ok(Bytes::from_static(b"ab")),
                Ok(Bytes::from_static(b"cde")),
                Ok(Bytes::from_static(b"f")),
            ];
            Ok::<_, Infallible>(Response::new(Body::from_stream(stream::iter(chunks))))
        }));

        let response = svc.oneshot(request("/stream")).await.unwrap();
        assert!(sink.is_empty(), "event must wait for the body");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"abcdef");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bytes_written, 6);
        assert_eq!(events[0].message, "200 GET /stream");
    }

    #[tokio::test]
    async fn dropped_body_still_emits_once() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|_req: Request| async {
            Ok::<_, Infallible>(Response::new(Body::from("never read")))
        }));

        let response = svc.oneshot(request("/gone")).await.unwrap();
        drop(response);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, 200);
        assert_eq!(events[0].bytes_written, 0);
    }

    #[tokio::test]
    async fn body_error_is_logged_with_partial_count() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|_req: Request| async {
            let chunks: Vec<Result<Bytes, io::Error>> = vec![
                Ok(Bytes::from_static(b"1234")),
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")),
            ];
            Ok::<_, Infallible>(Response::new(Body::from_stream(stream::iter(chunks))))
        }));

        let response = svc.oneshot(request("/pipe")).await.unwrap();
        assert!(response.into_body().collect().await.is_err());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bytes_written, 4);
        assert!(events[0].error.as_deref().unwrap().contains("broken pipe"));
    }

    #[tokio::test]
    async fn inner_error_is_logged_and_propagated() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|_req: Request| async {
            Err::<Response, _>(io::Error::other("backend down"))
        }));

        let Err(err) = svc.oneshot(request("/broken")).await else {
            panic!("inner error must propagate");
        };
        assert_eq!(err.to_string(), "backend down");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, 500);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].error.as_deref(), Some("backend down"));
    }

    #[tokio::test]
    async fn nonstandard_status_above_599_logs_as_error() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|_req: Request| async {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::from_u16(600).unwrap();
            Ok::<_, Infallible>(response)
        }));

        let response = svc.oneshot(request("/odd")).await.unwrap();
        response.into_body().collect().await.unwrap();

        let events = sink.events();
        assert_eq!(events[0].status, 600);
        assert_eq!(events[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn duration_uses_injected_clock() {
        let sink = MemorySink::new();
        let clock = ManualClock::new();
        let handler_clock = clock.clone();
        let layer = RequestLogLayer::new(
            RequestLogConfig::new()
                .sink(sink.clone())
                .clock(clock)
                .policy(LogEverything),
        );
        let svc = layer.layer(service_fn(move |_req: Request| {
            let clock = handler_clock.clone();
            async move {
                clock.advance(Duration::from_millis(25));
                Ok::<_, Infallible>(Response::new(Body::from("ok")))
            }
        }));

        let response = svc.oneshot(request("/timed")).await.unwrap();
        response.into_body().collect().await.unwrap();

        assert_eq!(sink.events()[0].duration, Duration::from_millis(25));
    }

    #[tokio::test]
    async fn request_id_header_is_logged() {
        let sink = MemorySink::new();
        let layer = RequestLogLayer::new(RequestLogConfig::new().sink(sink.clone()));
        let svc = layer.layer(service_fn(|req: Request| async move {
            let id = req
                .extensions()
                .get::<crate::middleware::RequestLogContext>()
                .map(|ctx| ctx.request_id().to_string())
                .unwrap_or_default();
            Ok::<_, Infallible>(Response::new(Body::from(id)))
        }));

        let req = Request::builder()
            .uri("/")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();

        assert_eq!(body.as_ref(), b"abc-123");
        assert_eq!(sink.events()[0].request_id.as_deref(), Some("abc-123"));
    }
}
