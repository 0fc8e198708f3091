//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body fully read.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: SocketAddr,
    params: HashMap<String, String>,
}

impl Request {
    /// Builds a request from its `http` representation and the peer address.
    ///
    /// The server calls this for every connection; tests and embedders can
    /// call it to drive handlers without a socket.
    pub fn new(req: http::Request<Bytes>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr,
            params: HashMap::new(),
        }
    }

    /// A copy of this request carrying the path parameters of a matched route.
    pub(crate) fn with_params(&self, params: HashMap<String, String>) -> Self {
        Self { params, ..self.clone() }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Header lookup. Names are case-insensitive; non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Referer` header, or `""` when absent.
    pub fn referrer(&self) -> &str {
        self.header("referer").unwrap_or("")
    }

    /// The `User-Agent` header, or `""` when absent.
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
