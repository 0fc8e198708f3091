//! Value-style responses and the [`IntoResponse`] conversion trait.
//!
//! Plain `async fn` handlers return a [`Response`] instead of writing through
//! a [`ResponseWriter`]. The handler adapter writes the value into the chain
//! afterwards, so middleware observes it exactly like a hand-written one.

use std::io;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};
use tracing::warn;

use crate::writer::ResponseWriter;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub(crate) fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::Text        => "text/plain; charset=utf-8",
        })
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response built as a value.
///
/// ```rust
/// use wisp::{ContentType, Response};
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .bytes(ContentType::Html, b"<p>ok</p>".to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Writes headers, an explicit `content-length`, the status, then the body.
    pub(crate) fn write_into(self, w: &mut dyn ResponseWriter) -> io::Result<()> {
        let headers = w.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        w.write_status(self.status);
        if !self.body.is_empty() {
            w.write(&self.body)?;
        }
        Ok(())
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method — you always know what you're sending.
pub struct ResponseBuilder {
    headers: Vec<(HeaderName, HeaderValue)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Adds a header. Invalid names or values are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into())
    }

    /// Terminate with a typed body. Use this for HTML or any body the shorthands do not cover.
    pub fn bytes(mut self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.headers.insert(0, (CONTENT_TYPE, content_type.header_value()));
        Response { body: body.into(), headers: self.headers, status: self.status }
    }

    /// Terminate with no body (e.g. `204 No Content`, `301 Moved Permanently`).
    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ResponseBuffer;

    #[test]
    fn writes_itself_into_a_writer() {
        let mut buffer = ResponseBuffer::new();
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(r#"{"id":99}"#)
            .write_into(&mut buffer)
            .unwrap();

        assert_eq!(buffer.status(), StatusCode::CREATED);
        assert_eq!(buffer.body(), br#"{"id":99}"#);
        assert_eq!(buffer.headers()["content-type"], "application/json");
        assert_eq!(buffer.headers()["location"], "/users/99");
        assert_eq!(buffer.headers()["content-length"], "9");
    }

    #[test]
    fn bodyless_status_keeps_its_code() {
        let mut buffer = ResponseBuffer::new();
        StatusCode::NO_CONTENT.into_response().write_into(&mut buffer).unwrap();
        assert_eq!(buffer.status(), StatusCode::NO_CONTENT);
        assert_eq!(buffer.headers()["content-length"], "0");
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let response = Response::builder().header("bad header", "x").no_body();
        assert!(response.headers.is_empty());
    }
}
