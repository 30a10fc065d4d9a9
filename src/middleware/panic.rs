//! Panic containment for the wrapped handler chain.
//!
//! A panic inside the handler is caught, normalized into a [`HandlerPanic`],
//! logged with a simplified stack and answered with a plain `500`.
//!
//! The stack is recorded by a process panic hook (installed once, chaining
//! the previous hook) into a thread-local slot. `catch_unwind` runs on the
//! thread that panicked, so the slot is read back right after unwinding.
//! The slot is cleared before every poll of the handler: a panic raised with
//! [`std::panic::resume_unwind`] skips the hook, and must not pick up the
//! trace of an unrelated panic caught earlier on the same thread.

use axum::body::Body;
use axum::response::Response;
use futures_util::FutureExt;
use http::{StatusCode, header};
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::{Future, poll_fn};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::sync::Once;

use super::error::HandlerPanic;

/// Innermost frames dropped from a captured stack by default: the frames of
/// the capture itself (`force_capture` and the hook).
pub const DEFAULT_STACK_SKIP: usize = 3;

/// Symbol prefixes of frames that belong to the capture or to the std panic
/// runtime. A leading run of these is removed from every stack.
const MACHINERY_PREFIXES: &[&str] = &[
    "std::backtrace",
    "std::backtrace_rs::",
    "httplog::middleware::panic::install_hook",
    "httplog::middleware::panic::take_trace",
    "httplog::middleware::panic::Fault",
    "httplog::middleware::panic::catch",
    "<alloc::boxed::Box<F,A> as core::ops::function::Fn",
    "<alloc::boxed::Box<F, A> as core::ops::function::Fn",
    "std::panicking::",
    "std::panic::resume_unwind",
    "std::panic::panic_any",
    "std::sys::backtrace::",
    "std::sys_common::backtrace::",
    "rust_begin_unwind",
    "__rustc::rust_begin_unwind",
    "core::panicking::",
    "__rust_start_panic",
    "rust_panic",
];

thread_local! {
    static LAST_PANIC_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the trace-recording panic hook. Idempotent.
///
/// The hook only walks the stack; symbols are resolved when a caught panic
/// is rendered into an event.
pub fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture();
            LAST_PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn clear_trace() {
    LAST_PANIC_TRACE.with(|slot| slot.borrow_mut().take());
}

/// The trace recorded by the hook, or one taken here when the panic
/// bypassed the hook.
fn take_trace() -> Backtrace {
    LAST_PANIC_TRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(Backtrace::force_capture)
}

fn is_machinery(frame: &str) -> bool {
    MACHINERY_PREFIXES.iter().any(|p| frame.starts_with(p))
}

/// Splits a rendered backtrace into one descriptor per frame, drops the
/// `skip` innermost ones, then drops any capture or panic runtime frames
/// still leading the stack.
///
/// A descriptor is the symbol, followed by ` at <file:line>` when the
/// location is known.
pub fn simplify_stack(trace: &str, skip: usize) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();

    for line in trace.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" at ");
                last.push_str(location);
            }
            continue;
        }
        if let Some((index, symbol)) = line.split_once(": ")
            && !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
        {
            frames.push(symbol.to_string());
        }
    }

    frames
        .into_iter()
        .skip(skip)
        .skip_while(|frame| is_machinery(frame))
        .collect()
}

/// A panic caught at the containment boundary.
#[derive(Debug)]
pub struct Fault {
    pub error: HandlerPanic,
    pub stack: Vec<String>,
}

impl Fault {
    fn from_payload(payload: Box<dyn std::any::Any + Send>, skip: usize) -> Self {
        let trace = take_trace().to_string();
        Self {
            error: HandlerPanic::from_payload(payload),
            stack: simplify_stack(&trace, skip),
        }
    }
}

/// Runs `call` and awaits the future it returns, catching panics from both.
pub async fn catch<F, Fut>(call: F, skip: usize) -> Result<Fut::Output, Fault>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    install_hook();

    clear_trace();
    let fut = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(fut) => fut,
        Err(payload) => return Err(Fault::from_payload(payload, skip)),
    };

    let mut fut = pin!(fut);
    let polled = poll_fn(move |cx| {
        clear_trace();
        fut.as_mut().poll(cx)
    });

    AssertUnwindSafe(polled)
        .catch_unwind()
        .await
        .map_err(|payload| Fault::from_payload(payload, skip))
}

/// Runs `f`, swallowing any panic. Used around the log sink so the
/// middleware's own logging can never take the request down.
pub(crate) fn guard<F: FnOnce()>(f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        clear_trace();
        let err = HandlerPanic::from_payload(payload);
        tracing::error!(target: "httplog", error = %err, "log sink panicked");
    }
}

/// The generic response sent after a recovered panic.
pub fn internal_error_response() -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let text = status.canonical_reason().unwrap_or("Internal Server Error");

    let mut response = Response::new(Body::from(format!("{text}\n")));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    response
}
