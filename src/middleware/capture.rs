//! Request and response body capture for logging.

use axum::body::Body;
use axum::extract::Request;
use bytes::{Bytes, BytesMut};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use std::borrow::Cow;
use std::fmt::Display;
use std::pin::pin;

use super::error::CaptureError;
use super::observer::TeeBuffer;

/// Default cap on body bytes attached to a log event (24 KiB).
pub const DEFAULT_MAX_BODY_LOG: usize = 24 * 1024;

/// A body as attached to a log event.
///
/// `bytes` never exceeds the cap it was built with; `original_size` always
/// holds the real length so truncation is visible in the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBody {
    bytes: Bytes,
    original_size: u64,
    truncated: bool,
    error: Option<String>,
}

impl CapturedBody {
    /// Wraps a complete body, cutting it to `max_bytes`.
    pub fn new(full: Bytes, max_bytes: usize) -> Self {
        let original_size = full.len() as u64;
        if full.len() > max_bytes {
            Self {
                bytes: full.slice(..max_bytes),
                original_size,
                truncated: true,
                error: None,
            }
        } else {
            Self {
                bytes: full,
                original_size,
                truncated: false,
                error: None,
            }
        }
    }

    /// A capture that failed after `read` bytes; no content is attached.
    pub fn failed(err: &CaptureError, read: u64) -> Self {
        Self {
            bytes: Bytes::new(),
            original_size: read,
            truncated: false,
            error: Some(err.to_string()),
        }
    }

    /// Builds a capture from a response tee.
    pub fn from_tee(tee: TeeBuffer) -> Self {
        let original_size = tee.offered();
        let truncated = tee.is_truncated();
        Self {
            bytes: tee.freeze(),
            original_size,
            truncated,
            error: None,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The captured bytes as text, invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Reads every data frame of `body`.
///
/// On a read error the bytes received so far are returned along with the
/// error; trailers are dropped.
pub async fn read_body<B>(body: B) -> (Bytes, Option<CaptureError>)
where
    B: HttpBody<Data = Bytes>,
    B::Error: Display,
{
    let mut body = pin!(body);
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    buf.extend_from_slice(&data);
                }
            }
            Err(err) => return (buf.freeze(), Some(CaptureError::Read(err.to_string()))),
        }
    }

    (buf.freeze(), None)
}

/// Captures the body of `req` for logging and hands back a request whose body
/// replays the original, untruncated bytes.
///
/// Downstream handlers read the body exactly as if it had never been touched.
/// When reading fails, they get whatever arrived before the failure and the
/// returned capture carries the error instead of content.
pub async fn capture_request(req: Request, max_bytes: usize) -> (Request, CapturedBody) {
    let (parts, body) = req.into_parts();
    let (bytes, err) = read_body(body).await;

    let captured = match err {
        Some(err) => {
            tracing::debug!(error = %err, "request body capture failed");
            CapturedBody::failed(&err, bytes.len() as u64)
        }
        None => CapturedBody::new(bytes.clone(), max_bytes),
    };

    (Request::from_parts(parts, Body::from(bytes)), captured)
}
