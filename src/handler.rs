//! The handler trait.
//!
//! # Two ways to handle a request
//!
//! Application code usually writes a plain async function and returns a
//! value. Middleware instead needs to see (and decorate) the response writer,
//! so it implements [`Handler`] directly:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← value style
//!        ↓ blanket impl below
//! Handler::serve(&hello, &mut writer, &req)       ← writer style
//!        ↓
//! hello(req.clone()).await.write_into(writer)     ← one write through the chain
//! ```
//!
//! Both styles meet at [`Handler::serve`], so a middleware wraps either one
//! without knowing which it got.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::error;

use crate::request::Request;
use crate::response::IntoResponse;
use crate::writer::BoxWriter;

/// A heap-allocated, type-erased future borrowing the writer and request.
///
/// `Send` lets tokio move the future across worker threads.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// Serves one request by writing through the writer chain.
///
/// The handler receives the chain head by `&mut` so that it can install a new
/// layer with [`writer::wrap`](crate::writer::wrap) before calling the next
/// handler.
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a>;
}

/// Every `async fn(Request) -> impl IntoResponse` is a handler.
///
/// The request is cloned into the call because the function owns it, while
/// the caller keeps its copy for the layers above.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
        let fut = (self)(req.clone());
        Box::pin(async move {
            let response = fut.await.into_response();
            if let Err(e) = response.write_into(w.as_mut()) {
                error!(path = req.path(), "response write failed: {e}");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use crate::writer::{ResponseBuffer, ResponseWriter};
    use bytes::Bytes;
    use http::StatusCode;

    async fn created(req: Request) -> Response {
        Response::builder()
            .status(StatusCode::CREATED)
            .text(format!("made {}", req.path()))
    }

    #[tokio::test]
    async fn async_fn_writes_through_the_chain() {
        let req = Request::new(
            http::Request::builder().uri("/things").body(Bytes::new()).unwrap(),
            "127.0.0.1:4000".parse().unwrap(),
        );
        let mut w: BoxWriter = Box::new(ResponseBuffer::new());

        let handler: BoxedHandler = Arc::new(created);
        handler.serve(&mut w, &req).await;

        let buffer = ResponseBuffer::take_from(w.as_mut());
        assert_eq!(buffer.status(), StatusCode::CREATED);
        assert_eq!(buffer.body(), b"made /things");
        assert_eq!(buffer.headers()["content-length"], "12");
    }
}
