//! The response-writer chain.
//!
//! Handlers never build an HTTP response directly. They write through a
//! [`ResponseWriter`], and middleware decorates that writer by wrapping it in
//! another one. The result is a linear chain of layers, each owning the next:
//!
//! ```text
//! TemplateWriter ─▶ StatusWriter ─▶ ResponseBuffer
//!   (outermost)                       (innermost, installed by the server)
//! ```
//!
//! A layer that wraps another exposes it through [`ResponseWriter::inner`].
//! That single optional capability is enough for any middleware to ask "is a
//! layer like mine already somewhere in this chain?" with [`find`] or
//! [`find_layer`], without knowing which other middleware are installed.

use std::any::Any;
use std::io;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// The owned head of a writer chain.
///
/// Handlers receive `&mut BoxWriter` rather than `&mut dyn ResponseWriter` so
/// that middleware can move the current head into a new wrapping layer with
/// [`wrap`].
pub type BoxWriter = Box<dyn ResponseWriter>;

/// The channel through which a handler emits status, headers, and body bytes.
pub trait ResponseWriter: Any + Send + 'static {
    /// Headers that will be sent with the response.
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status. Ignored once body bytes have been written.
    fn write_status(&mut self, status: StatusCode);

    /// Writes body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// The writer this layer wraps, if any.
    fn inner(&self) -> Option<&dyn ResponseWriter> {
        None
    }

    fn inner_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
        None
    }
}

// ── Chain traversal ──────────────────────────────────────────────────────────

/// Iterates over every layer of the chain, outermost first.
pub fn layers<'a>(w: &'a dyn ResponseWriter) -> impl Iterator<Item = &'a dyn ResponseWriter> {
    std::iter::successors(Some(w), |layer| layer.inner())
}

/// Returns the first layer, outermost first, that satisfies `pred`.
///
/// Each layer is tested at most once, and traversal stops at the first match
/// or at the first layer that does not wrap another writer.
pub fn find<'a, P>(w: &'a dyn ResponseWriter, mut pred: P) -> Option<&'a dyn ResponseWriter>
where
    P: FnMut(&dyn ResponseWriter) -> bool,
{
    layers(w).find(|layer| pred(*layer))
}

/// Returns the first layer of concrete type `T`.
pub fn find_layer<T: ResponseWriter>(w: &dyn ResponseWriter) -> Option<&T> {
    let layer = find(w, |layer| (layer as &dyn Any).is::<T>())?;
    (layer as &dyn Any).downcast_ref::<T>()
}

/// Mutable counterpart of [`find_layer`].
pub fn find_layer_mut<T: ResponseWriter>(w: &mut dyn ResponseWriter) -> Option<&mut T> {
    if (&*w as &dyn Any).is::<T>() {
        return (w as &mut dyn Any).downcast_mut::<T>();
    }
    w.inner_mut().and_then(find_layer_mut::<T>)
}

/// Replaces the head of the chain with a layer built around it.
///
/// `layer` receives ownership of the current head, so the new layer is the
/// sole owner of everything beneath it.
pub fn wrap<W, F>(slot: &mut BoxWriter, layer: F)
where
    W: ResponseWriter,
    F: FnOnce(BoxWriter) -> W,
{
    let inner = std::mem::replace(slot, Box::new(Detached::default()));
    *slot = Box::new(layer(inner));
}

/// Stand-in head while [`wrap`] moves the real one into its new owner.
#[derive(Default)]
struct Detached(HeaderMap);

impl ResponseWriter for Detached {
    fn headers(&self) -> &HeaderMap { &self.0 }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.0 }
    fn write_status(&mut self, _status: StatusCode) {}
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { Ok(buf.len()) }
}

// ── ResponseBuffer ───────────────────────────────────────────────────────────

/// The innermost writer: collects everything a handler writes.
///
/// The server installs one per request and turns it into the HTTP response
/// once the handler chain has returned.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    wrote: bool,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status to send. `200 OK` if none was ever set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Pulls the buffer out of a finished chain.
    ///
    /// Returns an empty `200 OK` buffer if no layer of the chain is a
    /// `ResponseBuffer`.
    pub fn take_from(w: &mut dyn ResponseWriter) -> Self {
        find_layer_mut::<Self>(w).map(std::mem::take).unwrap_or_default()
    }

    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if !self.wrote {
            self.status = Some(status);
        }
    }

    /// Any write, even an empty one, commits the status.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.wrote = true;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pass-through layer with no behaviour of its own.
    struct Layer(BoxWriter);

    impl ResponseWriter for Layer {
        fn headers(&self) -> &HeaderMap { self.0.headers() }
        fn headers_mut(&mut self) -> &mut HeaderMap { self.0.headers_mut() }
        fn write_status(&mut self, status: StatusCode) { self.0.write_status(status) }
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.0.write(buf) }
        fn inner(&self) -> Option<&dyn ResponseWriter> { Some(self.0.as_ref()) }
        fn inner_mut(&mut self) -> Option<&mut dyn ResponseWriter> { Some(self.0.as_mut()) }
    }

    /// Marker layer used as a search target.
    struct Marker(BoxWriter);

    impl ResponseWriter for Marker {
        fn headers(&self) -> &HeaderMap { self.0.headers() }
        fn headers_mut(&mut self) -> &mut HeaderMap { self.0.headers_mut() }
        fn write_status(&mut self, status: StatusCode) { self.0.write_status(status) }
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.0.write(buf) }
        fn inner(&self) -> Option<&dyn ResponseWriter> { Some(self.0.as_ref()) }
        fn inner_mut(&mut self) -> Option<&mut dyn ResponseWriter> { Some(self.0.as_mut()) }
    }

    fn chain(depth: usize, marker_at: Option<usize>) -> BoxWriter {
        // Built inside out; depth counts every layer including the buffer.
        let mut w: BoxWriter = Box::new(ResponseBuffer::new());
        for level in (0..depth - 1).rev() {
            if marker_at == Some(level) {
                wrap(&mut w, Marker);
            } else {
                wrap(&mut w, Layer);
            }
        }
        w
    }

    #[test]
    fn finds_layer_in_k_steps() {
        let w = chain(6, Some(2));
        let mut visited = 0;
        let found = find(w.as_ref(), |layer| {
            visited += 1;
            (layer as &dyn Any).is::<Marker>()
        });
        assert!(found.is_some());
        assert_eq!(visited, 3);
    }

    #[test]
    fn exhausts_chain_when_absent() {
        let w = chain(6, None);
        let mut visited = 0;
        let found = find(w.as_ref(), |layer| {
            visited += 1;
            (layer as &dyn Any).is::<Marker>()
        });
        assert!(found.is_none());
        assert_eq!(visited, 6);
        assert_eq!(layers(w.as_ref()).count(), 6);
    }

    #[test]
    fn typed_search_reaches_the_innermost_buffer() {
        let mut w = chain(4, Some(0));
        assert!(find_layer::<Marker>(w.as_ref()).is_some());

        w.write(b"hello").unwrap();
        let buffer = find_layer_mut::<ResponseBuffer>(w.as_mut()).unwrap();
        assert_eq!(buffer.body(), b"hello");

        let taken = ResponseBuffer::take_from(w.as_mut());
        assert_eq!(taken.body(), b"hello");
        assert!(find_layer::<ResponseBuffer>(w.as_ref()).unwrap().body().is_empty());
    }

    #[test]
    fn buffer_status_is_fixed_by_first_write() {
        let mut buffer = ResponseBuffer::new();
        buffer.write_status(StatusCode::CREATED);
        buffer.write_status(StatusCode::ACCEPTED);
        buffer.write(b"x").unwrap();
        buffer.write_status(StatusCode::NOT_FOUND);
        assert_eq!(buffer.status(), StatusCode::ACCEPTED);

        let response = buffer.into_http();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn empty_write_commits_the_status() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(b"").unwrap();
        buffer.write_status(StatusCode::NOT_FOUND);
        assert_eq!(buffer.status(), StatusCode::OK);
    }

    #[test]
    fn untouched_buffer_defaults_to_ok() {
        assert_eq!(ResponseBuffer::new().status(), StatusCode::OK);
    }
}
