mod common;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::routing::get;
use httplog::middleware::{LogSink, LogEvent, MemorySink, RequestLogConfig, Severity};

#[tokio::test]
async fn test_panic_is_logged_and_answered_with_500() {
    let (server, sink) = common::create_demo_server();

    let response = server.get("/panic").expect_failure().await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("Internal Server Error\n");
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");

    let event = common::single_event(&sink);
    assert_eq!(event.severity, Severity::Error);
    assert_eq!(event.message, "Panic");
    assert_eq!(event.status, 500);
    assert!(event.error.as_deref().unwrap().contains("boom"));
    assert!(!event.stack.is_empty());
}

#[tokio::test]
async fn test_server_keeps_serving_after_panic() {
    let (server, sink) = common::create_demo_server();

    server.get("/panic").expect_failure().await;
    sink.clear();

    server.get("/users/1").await.assert_status_ok();

    let event = common::single_event(&sink);
    assert_eq!(event.status, 200);
    assert!(event.stack.is_empty());
}

#[tokio::test]
async fn test_panic_on_unlogged_route_is_contained() {
    let sink = MemorySink::new();
    let routes = Router::new().route(
        "/health",
        get(|| async {
            panic!("probe failed");
            #[allow(unreachable_code)]
            ()
        }),
    );
    let config = RequestLogConfig::new()
        .policy(httplog::middleware::SkipPaths::new(["/health"]))
        .sink(sink.clone());
    let server = common::create_server(routes, config);

    server
        .get("/health")
        .expect_failure()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    assert!(sink.events()[0].error.as_deref().unwrap().contains("probe failed"));
}

#[inline(never)]
fn unrelated_marker() {
    panic!("elsewhere");
}

async fn caught_elsewhere() -> &'static str {
    match std::panic::catch_unwind(unrelated_marker) {
        Ok(()) => "not caught",
        Err(_) => "caught",
    }
}

async fn resumed() -> &'static str {
    std::panic::resume_unwind(Box::new("boom"))
}

#[tokio::test]
async fn test_resumed_panic_does_not_carry_earlier_stack() {
    let sink = MemorySink::new();
    let routes = Router::new()
        .route("/a", get(caught_elsewhere))
        .route("/b", get(resumed));
    let server = common::create_server(routes, RequestLogConfig::new().sink(sink.clone()));

    server.get("/a").await.assert_text("caught");
    sink.clear();

    server
        .get("/b")
        .expect_failure()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let event = common::single_event(&sink);
    assert_eq!(event.error.as_deref(), Some("boom: internal error"));
    assert!(
        event.stack.iter().all(|f| !f.contains("unrelated_marker")),
        "stale frames: {:?}",
        event.stack
    );
}

#[tokio::test]
async fn test_panic_stack_starts_past_panic_runtime() {
    let (server, sink) = common::create_demo_server();

    server.get("/panic").expect_failure().await;

    let event = common::single_event(&sink);
    let first = &event.stack[0];
    assert!(!first.starts_with("std::backtrace"), "{first}");
    assert!(!first.starts_with("std::panicking"), "{first}");
    assert!(!first.starts_with("core::panicking"), "{first}");
}

struct ExplodingSink;

impl LogSink for ExplodingSink {
    fn emit(&self, _event: &LogEvent) {
        panic!("sink exploded");
    }
}

#[tokio::test]
async fn test_panicking_sink_does_not_break_response() {
    let routes = Router::new().route("/", get(|| async { "still here" }));
    let server = common::create_server(routes, RequestLogConfig::new().sink(ExplodingSink));

    let response = server.get("/").await;

    response.assert_status_ok();
    response.assert_text("still here");
}
