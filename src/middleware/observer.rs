//! Response status and byte accounting.
//!
//! [`ResponseObserver`] is the write-side bookkeeping for one response: it
//! never buffers the payload itself, it only counts. An optional
//! [`TeeBuffer`] keeps a bounded copy of the written bytes for logging.

use bytes::{Bytes, BytesMut};
use http::StatusCode;

/// Bounded secondary copy of a response body.
///
/// Appends are O(1) amortized and stop copying once `limit` bytes are held;
/// the total number of bytes offered is still tracked so truncation is
/// observable.
#[derive(Debug)]
pub struct TeeBuffer {
    buf: BytesMut,
    limit: usize,
    offered: u64,
}

impl TeeBuffer {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
            offered: 0,
        }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.offered += data.len() as u64;
        let room = self.limit.saturating_sub(self.buf.len());
        if room > 0 {
            let take = room.min(data.len());
            self.buf.extend_from_slice(&data[..take]);
        }
    }

    /// Bytes copied so far, at most `limit`.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total bytes offered, including the ones past the limit.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_truncated(&self) -> bool {
        self.offered > self.buf.len() as u64
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Records the status and byte count of one response.
///
/// The status is captured once: the first [`write_header`](Self::write_header)
/// or [`write`](Self::write) fixes it, because headers that went out cannot
/// be changed. Later calls leave it alone. The byte counter only grows.
#[derive(Debug, Default)]
pub struct ResponseObserver {
    status: Option<StatusCode>,
    bytes_written: u64,
    tee: Option<TeeBuffer>,
}

impl ResponseObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `status` unless a status was already recorded.
    pub fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Accounts for `data` being written to the client.
    ///
    /// An implicit `200 OK` is recorded if no status was set yet.
    pub fn write(&mut self, data: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.bytes_written += data.len() as u64;
        if let Some(tee) = self.tee.as_mut() {
            tee.append(data);
        }
    }

    /// Attaches a capture buffer. Only writes made after this call are copied.
    pub fn tee(&mut self, buffer: TeeBuffer) {
        self.tee = Some(buffer);
    }

    /// Detaches the capture buffer, if any.
    pub fn take_tee(&mut self) -> Option<TeeBuffer> {
        self.tee.take()
    }

    /// The recorded status, `200 OK` if nothing was recorded.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
