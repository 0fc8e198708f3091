//! Template rendering for downstream handlers.
//!
//! [`TemplateHandler`] puts a [`TemplateWriter`] carrying the shared
//! [`TemplateRegistry`] into the writer chain. Any handler below it calls
//! [`render`] with its writer; the registry is found by searching the chain,
//! the same way the access logger finds its status layer.

use std::io;
use std::path::Path;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxFuture, Handler};
use crate::request::Request;
use crate::response::ContentType;
use crate::template::TemplateRegistry;
use crate::writer::{BoxWriter, ResponseWriter, find_layer, wrap};

/// A pass-through chain layer that carries the template registry.
pub struct TemplateWriter {
    inner: BoxWriter,
    registry: Arc<TemplateRegistry>,
}

impl TemplateWriter {
    pub fn new(inner: BoxWriter, registry: Arc<TemplateRegistry>) -> Self {
        Self { inner, registry }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }
}

impl ResponseWriter for TemplateWriter {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.inner.write_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn inner(&self) -> Option<&dyn ResponseWriter> {
        Some(self.inner.as_ref())
    }

    fn inner_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
        Some(self.inner.as_mut())
    }
}

/// Middleware making a [`TemplateRegistry`] available to every handler below.
pub struct TemplateHandler<H> {
    inner: H,
    registry: Arc<TemplateRegistry>,
}

impl<H: Handler> TemplateHandler<H> {
    pub fn new(inner: H, registry: impl Into<Arc<TemplateRegistry>>) -> Self {
        Self { inner, registry: registry.into() }
    }
}

impl<H: Handler> Handler for TemplateHandler<H> {
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            if find_layer::<TemplateWriter>(w.as_ref()).is_none() {
                let registry = Arc::clone(&self.registry);
                wrap(w, |inner| TemplateWriter::new(inner, registry));
            } else {
                debug!(path = req.path(), "template layer already installed");
            }
            self.inner.serve(w, req).await;
        })
    }
}

/// Renders the template compiled from `path` through `w`.
///
/// Sets `content-type: text/html` unless the handler already chose one.
///
/// # Errors
///
/// [`Error::TemplateNotFound`] if no [`TemplateHandler`] is installed above
/// the caller or nothing was compiled from `path`; [`Error::Render`] if the
/// template itself fails.
pub fn render(w: &mut BoxWriter, path: impl AsRef<Path>, data: &Value) -> Result<(), Error> {
    let path = path.as_ref();
    let registry = find_layer::<TemplateWriter>(w.as_ref())
        .map(|layer| Arc::clone(layer.registry()))
        .ok_or_else(|| Error::TemplateNotFound(path.to_owned()))?;

    w.headers_mut()
        .entry(http::header::CONTENT_TYPE)
        .or_insert_with(|| ContentType::Html.header_value());
    registry.render(path, w.as_mut(), data)
}
