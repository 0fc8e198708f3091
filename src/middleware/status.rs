//! Status capture.

use std::io;

use http::{HeaderMap, StatusCode};

use crate::writer::{BoxWriter, ResponseWriter};

/// A chain layer that records the status code the response ends up with.
///
/// An explicit [`write_status`](ResponseWriter::write_status) is recorded and
/// may be overwritten until the first body write. A body write with no status
/// recorded yet implies `200 OK`, as HTTP does.
pub struct StatusWriter {
    inner: BoxWriter,
    status: Option<StatusCode>,
    wrote_body: bool,
}

impl StatusWriter {
    pub fn new(inner: BoxWriter) -> Self {
        Self { inner, status: None, wrote_body: false }
    }

    /// The captured status, or `None` if nothing has been written yet.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl ResponseWriter for StatusWriter {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        if !self.wrote_body {
            self.status = Some(status);
        }
        self.inner.write_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.wrote_body = true;
        self.inner.write(buf)
    }

    fn inner(&self) -> Option<&dyn ResponseWriter> {
        Some(self.inner.as_ref())
    }

    fn inner_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
        Some(self.inner.as_mut())
    }
}
