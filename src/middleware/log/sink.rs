//! Where rendered log lines go.

use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::{info, warn};

use super::printf::FormatError;

/// Destination for access log lines.
///
/// Shared by every in-flight request, hence `Send + Sync`.
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, line: &str);

    /// Called instead of [`log`](Self::log) when the format does not fit its
    /// tokens. The request itself is unaffected.
    fn fail(&self, err: &FormatError) {
        warn!(error = %err, "access log line could not be rendered");
    }
}

/// Emits each line as a `tracing` event on target `wisp::access`.
///
/// This is the sink a [`LogOptions`](super::LogOptions) starts with.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        info!(target: "wisp::access", "{line}");
    }
}

/// Writes one line per request to any [`io::Write`], e.g. stdout or a file.
pub struct WriterSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
    fn log(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "access log write failed");
        }
    }
}
