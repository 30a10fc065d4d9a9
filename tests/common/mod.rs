#![allow(dead_code)]

use axum::Router;
use axum_test::TestServer;
use httplog::api::routes::log_policy;
use httplog::middleware::{LogEvent, LogSink, MemorySink, RequestLogConfig, RequestLogLayer};
use httplog::routes::router;
use mockall::mock;

mock! {
    pub Sink {}

    impl LogSink for Sink {
        fn emit(&self, event: &LogEvent);
    }
}

/// Demo router logging into a fresh in-memory sink.
pub fn create_demo_server() -> (TestServer, MemorySink) {
    create_demo_server_with(RequestLogConfig::new())
}

/// Demo router with the demo policy on top of `config`.
pub fn create_demo_server_with(config: RequestLogConfig) -> (TestServer, MemorySink) {
    let sink = MemorySink::new();
    let app = router(config.policy(log_policy).sink(sink.clone()));
    (TestServer::new(app).unwrap(), sink)
}

/// Wraps an ad-hoc router in the logging layer.
pub fn create_server(routes: Router, config: RequestLogConfig) -> TestServer {
    TestServer::new(routes.layer(RequestLogLayer::new(config))).unwrap()
}

/// The only event recorded, failing the test when there is not exactly one.
pub fn single_event(sink: &MemorySink) -> LogEvent {
    let mut events = sink.events();
    assert_eq!(events.len(), 1, "expected exactly one event: {events:?}");
    events.remove(0)
}
