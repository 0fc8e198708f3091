//! Access logging.
//!
//! [`LogHandler`] times each request, installs a [`StatusWriter`] so the
//! final status is known, and writes one line per request to a [`LogSink`].
//!
//! ```rust,no_run
//! use wisp::middleware::log::{LogHandler, LogOptions, WriterSink};
//! use wisp::{Request, Router, Server};
//!
//! # async fn hello(_: Request) -> &'static str { "hi" }
//! # #[tokio::main]
//! # async fn main() {
//! let options = LogOptions::new("_short_").sink(WriterSink::stdout());
//! let app = LogHandler::new(Router::new().get("/", hello), options);
//! Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! # }
//! ```
//!
//! # One line per request
//!
//! Before doing anything the handler searches the writer chain for a
//! `StatusWriter`. If one is already there, an enclosing `LogHandler` owns
//! this request and the inner one just forwards, so nesting loggers (for
//! example on a sub-router) never doubles the output.
//!
//! Unless [`LogOptions::immediate`] is set, the line is written when the
//! downstream handler is done with the request by any path: normal return,
//! panic, or the request future being dropped.

mod format;
mod printf;
mod sink;
mod token;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Local};
use tracing::debug;

use crate::handler::{BoxFuture, Handler};
use crate::middleware::status::StatusWriter;
use crate::request::Request;
use crate::writer::{BoxWriter, ResponseWriter, find_layer, wrap};

pub use format::{DateFormat, Format};
pub use printf::{FormatError, TokenValue};
pub use sink::{LogSink, TracingSink, WriterSink};
pub use token::{Token, UNKNOWN};

use token::RequestContext;

/// A caller-supplied token: reads whatever it needs from the writer chain and
/// the request.
pub type CustomToken = Arc<dyn Fn(&dyn ResponseWriter, &Request) -> String + Send + Sync>;

/// Access log configuration.
///
/// Built once, then frozen inside a [`LogHandler`] and read concurrently by
/// every request it serves.
#[derive(Clone)]
pub struct LogOptions {
    sink: Arc<dyn LogSink>,
    format: Format,
    tokens: Vec<Token>,
    custom: HashMap<String, CustomToken>,
    immediate: bool,
    date_format: DateFormat,
}

impl LogOptions {
    /// Options for `format`: one of `"_default_"`, `"_short_"`, `"_tiny_"`,
    /// or a literal printf-style string.
    ///
    /// Lines go to [`TracingSink`] and dates render as RFC 3339 until
    /// configured otherwise.
    pub fn new(format: impl Into<Format>) -> Self {
        Self {
            sink: Arc::new(TracingSink),
            format: format.into(),
            tokens: Vec::new(),
            custom: HashMap::new(),
            immediate: false,
            date_format: DateFormat::default(),
        }
    }

    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Token order for a literal format. Ignored by the predefined formats.
    pub fn tokens<I>(mut self, tokens: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Registers a token resolved by calling `f` when the line is rendered.
    ///
    /// Built-in names and `req[..]`/`res[..]` take precedence, so a custom
    /// token can never shadow them.
    pub fn custom_token<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn ResponseWriter, &Request) -> String + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(f));
        self
    }

    /// Log as soon as the request arrives instead of after it is handled.
    ///
    /// The line then shows whatever status and timing exist at that moment,
    /// typically `0` and a few microseconds.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    fn emit(&self, writer: &dyn ResponseWriter, request: &Request, elapsed: Duration) {
        let ctx = RequestContext {
            writer,
            request,
            options: self,
            elapsed,
            now: DateTime::<FixedOffset>::from(Local::now()),
        };
        match format::render(&ctx) {
            Ok(line) => self.sink.log(&line),
            Err(e) => self.sink.fail(&e),
        }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::new(Format::Default)
    }
}

impl fmt::Debug for LogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogOptions")
            .field("format", &self.format)
            .field("tokens", &self.tokens)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("immediate", &self.immediate)
            .field("date_format", &self.date_format)
            .finish_non_exhaustive()
    }
}

// ── LogHandler ───────────────────────────────────────────────────────────────

/// Middleware writing one access log line per request.
pub struct LogHandler<H> {
    inner: H,
    options: Arc<LogOptions>,
}

impl<H: Handler> LogHandler<H> {
    pub fn new(inner: H, options: impl Into<Arc<LogOptions>>) -> Self {
        Self { inner, options: options.into() }
    }
}

impl<H: Handler> Handler for LogHandler<H> {
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            if find_layer::<StatusWriter>(w.as_ref()).is_some() {
                debug!(path = req.path(), "status already captured upstream, forwarding");
                return self.inner.serve(w, req).await;
            }

            wrap(w, StatusWriter::new);
            let mut line = PendingLine {
                options: &self.options,
                writer: w,
                request: req,
                start: Instant::now(),
                emitted: false,
            };
            if self.options.immediate {
                line.emit();
            }
            self.inner.serve(&mut *line.writer, req).await;
        })
    }
}

/// The log line of one request, written at the latest when dropped.
struct PendingLine<'a> {
    options: &'a LogOptions,
    writer: &'a mut BoxWriter,
    request: &'a Request,
    start: Instant,
    emitted: bool,
}

impl PendingLine<'_> {
    fn emit(&mut self) {
        if !self.emitted {
            self.emitted = true;
            self.options.emit(self.writer.as_ref(), self.request, self.start.elapsed());
        }
    }
}

impl Drop for PendingLine<'_> {
    fn drop(&mut self) {
        self.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use crate::writer::ResponseBuffer;
    use bytes::Bytes;
    use http::StatusCode;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<String>>>);

    impl LogSink for Lines {
        fn log(&self, line: &str) {
            self.0.lock().push(line.to_owned());
        }
    }

    impl Lines {
        fn taken(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    fn request(uri: &str) -> Request {
        let req = http::Request::builder().uri(uri).body(Bytes::new()).unwrap();
        Request::new(req, "127.0.0.1:5555".parse().unwrap())
    }

    async fn missing(_: Request) -> Response {
        Response::builder().status(StatusCode::NOT_FOUND).text("gone")
    }

    #[tokio::test]
    async fn logs_the_final_status_after_the_handler() {
        let lines = Lines::default();
        let options = LogOptions::new("%s %s %d %s").tokens(["method", "url", "status", "res[Content-Length]"]);
        let handler = LogHandler::new(missing, options.sink(lines.clone()));

        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        handler.serve(&mut w, &request("/old")).await;

        assert_eq!(lines.taken(), ["GET /old 404 4"]);
        assert_eq!(ResponseBuffer::take_from(w.as_mut()).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logged_status_matches_the_sent_status_after_an_empty_write() {
        struct EmptyThenMissing;

        impl Handler for EmptyThenMissing {
            fn serve<'a>(&'a self, w: &'a mut BoxWriter, _req: &'a Request) -> BoxFuture<'a> {
                Box::pin(async move {
                    w.write(b"").unwrap();
                    w.write_status(StatusCode::NOT_FOUND);
                })
            }
        }

        let lines = Lines::default();
        let options = LogOptions::new("%d").tokens(["status"]).sink(lines.clone());
        let handler = LogHandler::new(EmptyThenMissing, options);

        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        handler.serve(&mut w, &request("/empty")).await;

        assert_eq!(ResponseBuffer::take_from(w.as_mut()).status(), StatusCode::OK);
        assert_eq!(lines.taken(), ["200"]);
    }

    #[tokio::test]
    async fn oversized_width_is_reported_not_fatal() {
        #[derive(Clone, Default)]
        struct Failures(Arc<Mutex<Vec<FormatError>>>);

        impl LogSink for Failures {
            fn log(&self, _line: &str) {}
            fn fail(&self, err: &FormatError) {
                self.0.lock().push(err.clone());
            }
        }

        let failures = Failures::default();
        let options = LogOptions::new("%99999999999999999999999s").tokens(["method"]).sink(failures.clone());
        let handler = LogHandler::new(missing, options);

        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        handler.serve(&mut w, &request("/wide")).await;

        assert_eq!(*failures.0.lock(), [FormatError::TooWide { offset: 0 }]);
        assert_eq!(ResponseBuffer::take_from(w.as_mut()).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn immediate_mode_logs_before_the_status_exists() {
        let lines = Lines::default();
        let options = LogOptions::new("%s %d").tokens(["url", "status"]).immediate(true);
        let handler = LogHandler::new(missing, options.sink(lines.clone()));

        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        handler.serve(&mut w, &request("/early")).await;

        assert_eq!(lines.taken(), ["/early 0"]);
    }

    #[tokio::test]
    async fn render_failures_go_to_the_sink_not_the_response() {
        #[derive(Clone, Default)]
        struct Failures(Arc<Mutex<Vec<FormatError>>>);

        impl LogSink for Failures {
            fn log(&self, _line: &str) {}
            fn fail(&self, err: &FormatError) {
                self.0.lock().push(err.clone());
            }
        }

        let failures = Failures::default();
        let options = LogOptions::new("%s %s").tokens(["method"]).sink(failures.clone());
        let handler = LogHandler::new(missing, options);

        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        handler.serve(&mut w, &request("/x")).await;

        assert_eq!(*failures.0.lock(), [FormatError::Missing { offset: 3 }]);
        assert_eq!(ResponseBuffer::take_from(w.as_mut()).body(), b"gone");
    }

    #[test]
    fn options_debug_lists_custom_token_names() {
        let options = LogOptions::new(Format::Tiny).custom_token("tenant", |_, _| String::new());
        let debug = format!("{options:?}");
        assert!(debug.contains("Tiny"));
        assert!(debug.contains("tenant"));
    }
}
