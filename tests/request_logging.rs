mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{Extension, Router};
use httplog::middleware::fields::USER_ID;
use httplog::middleware::{
    LogRequestBody, MemorySink, RequestLogConfig, RequestLogContext, Severity, SkipPaths,
};
use serde_json::json;

#[tokio::test]
async fn test_one_event_per_request_with_byte_count() {
    let (server, sink) = common::create_demo_server();

    let response = server.get("/users/7").await;

    response.assert_status_ok();
    let body_len = response.as_bytes().len();

    let event = common::single_event(&sink);
    assert_eq!(event.method, "GET");
    assert_eq!(event.path, "/users/7");
    assert_eq!(event.status, 200);
    assert_eq!(event.bytes_written, body_len as u64);
    assert_eq!(event.severity, Severity::Info);
}

#[tokio::test]
async fn test_unset_status_is_logged_as_200() {
    let (server, sink) = common::create_demo_server();

    server.get("/").await.assert_status_ok();

    let event = common::single_event(&sink);
    assert_eq!(event.status, 200);
    assert_eq!(event.message, "200 GET /");
    assert_eq!(event.field("http.status_code"), Some(json!(200)));
}

#[tokio::test]
async fn test_request_body_is_truncated_but_handler_sees_it_whole() {
    let (server, sink) = common::create_demo_server_with(RequestLogConfig::new().max_body_log(10));
    let payload = "abcdefghijklmnopqrst";

    let response = server.post("/echo").text(payload).await;

    response.assert_status_ok();
    assert_eq!(response.text(), payload);

    let event = common::single_event(&sink);
    let request = event.request_body.as_ref().unwrap();
    assert_eq!(request.text(), "abcdefghij");
    assert_eq!(request.original_size(), 20);
    assert!(request.is_truncated());
    assert_eq!(event.field("request.truncated"), Some(json!(true)));
    assert_eq!(event.field("network.bytes_read"), Some(json!(20)));

    let response_body = event.response_body.as_ref().unwrap();
    assert_eq!(response_body.bytes().len(), 10);
    assert_eq!(response_body.original_size(), 20);
    assert_eq!(event.bytes_written, 20);
}

#[tokio::test]
async fn test_captured_body_is_restored_for_handler() {
    let (server, sink) = common::create_demo_server();

    let response = server.post("/echo").text("hello").await;

    assert_eq!(response.text(), "hello");

    let event = common::single_event(&sink);
    assert_eq!(event.field("request"), Some(json!("hello")));
    assert_eq!(event.field("response"), Some(json!("hello")));
    assert_eq!(event.field("request.truncated"), None);
}

#[tokio::test]
async fn test_skipped_request_is_not_observed() {
    let mut sink = common::MockSink::new();
    sink.expect_emit().times(0);

    let routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/probe",
            get(|ctx: Option<Extension<RequestLogContext>>| async move {
                if ctx.is_some() { "wrapped" } else { "bare" }
            }),
        );
    let config = RequestLogConfig::new()
        .policy(SkipPaths::new(["/health", "/probe"]))
        .sink(sink);
    let server = common::create_server(routes, config);

    let health = server.get("/health").await;
    health.assert_status_ok();
    health.assert_text("ok");

    server.get("/probe").await.assert_text("bare");
}

#[tokio::test]
async fn test_demo_health_is_not_logged() {
    let (server, sink) = common::create_demo_server();

    server.get("/health").await.assert_status_ok();

    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_severity_follows_status() {
    let sink = MemorySink::new();
    let routes = Router::new()
        .route(
            "/unavailable",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/fine", get(|| async { "ok" }));
    let server = common::create_server(routes, RequestLogConfig::new().sink(sink.clone()));

    server
        .get("/unavailable")
        .expect_failure()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get("/missing")
        .expect_failure()
        .await
        .assert_status_not_found();
    server.get("/fine").await.assert_status_ok();

    let severities: Vec<(u16, Severity)> = sink
        .events()
        .iter()
        .map(|e| (e.status, e.severity))
        .collect();
    assert_eq!(
        severities,
        vec![
            (503, Severity::Error),
            (404, Severity::Warn),
            (200, Severity::Info),
        ]
    );
}

#[tokio::test]
async fn test_operation_and_fields_from_handler() {
    let (server, sink) = common::create_demo_server();

    server
        .get("/users/9000")
        .expect_failure()
        .await
        .assert_status_not_found();

    let event = common::single_event(&sink);
    assert_eq!(event.operation.as_deref(), Some("get_user"));
    assert_eq!(event.message, "get_user");
    assert_eq!(event.severity, Severity::Warn);
    assert_eq!(event.field("op"), Some(json!("get_user")));
    assert_eq!(event.field(USER_ID), Some(json!(9000)));
    assert_eq!(event.field("usr.id"), Some(json!(9000)));
}

#[tokio::test]
async fn test_handler_error_response_is_logged_as_warning() {
    let (server, sink) = common::create_demo_server();

    let response = server.post("/echo").expect_failure().await;

    response.assert_status_bad_request();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "validation_error");

    let event = common::single_event(&sink);
    assert_eq!(event.status, 400);
    assert_eq!(event.severity, Severity::Warn);
    let logged = event.response_body.as_ref().unwrap();
    assert!(logged.text().contains("validation_error"));
}

#[tokio::test]
async fn test_request_id_and_redacted_headers() {
    let (server, sink) = common::create_demo_server();

    let response = server
        .get("/")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-1"),
        )
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer secret"),
        )
        .await;

    response.assert_text("hello (request req-1)\n");

    let event = common::single_event(&sink);
    assert_eq!(event.request_id.as_deref(), Some("req-1"));
    assert_eq!(event.field("http.request_id"), Some(json!("req-1")));

    let headers = event.headers.unwrap();
    assert_eq!(headers["authorization"], json!("[REDACTED]"));
    assert_eq!(headers["x-request-id"], json!("req-1"));
}

#[tokio::test]
async fn test_custom_request_id_header() {
    let sink = MemorySink::new();
    let routes = Router::new().route("/", get(|| async { "ok" }));
    let config = RequestLogConfig::new()
        .request_id_header(HeaderName::from_static("x-correlation-id"))
        .without_headers()
        .sink(sink.clone());
    let server = common::create_server(routes, config);

    server
        .get("/")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static("corr-7"),
        )
        .await
        .assert_status_ok();

    let event = common::single_event(&sink);
    assert_eq!(event.request_id.as_deref(), Some("corr-7"));
    assert!(event.headers.is_none());
}

#[tokio::test]
async fn test_request_body_only_policy_leaves_response_out() {
    let sink = MemorySink::new();
    let routes = Router::new().route("/", axum::routing::post(|body: String| async move { body }));
    let config = RequestLogConfig::new().policy(LogRequestBody).sink(sink.clone());
    let server = common::create_server(routes, config);

    server.post("/").text("payload").await.assert_text("payload");

    let event = common::single_event(&sink);
    assert_eq!(event.field("request"), Some(json!("payload")));
    assert!(event.response_body.is_none());
    assert_eq!(event.field("response"), None);
}
