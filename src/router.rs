//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is itself a
//! [`Handler`], so middleware wraps a whole routing table as easily as a
//! single function.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::writer::{BoxWriter, ResponseWriter};

/// The application router.
///
/// Build it once at startup, wrap it in middleware, pass it to
/// [`Server::serve`](crate::Server::serve). Each registration returns `self`
/// so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use wisp::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for the same method.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(handler) as BoxedHandler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Whether any method has a route matching `path`.
    fn knows_path(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Handler for Router {
    fn serve<'a>(&'a self, w: &'a mut BoxWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            match self.lookup(req.method(), req.path()) {
                Some((handler, params)) => {
                    let req = req.with_params(params);
                    handler.serve(w, &req).await;
                }
                None if self.knows_path(req.path()) => {
                    w.write_status(StatusCode::METHOD_NOT_ALLOWED);
                }
                None => w.write_status(StatusCode::NOT_FOUND),
            }
        })
    }
}
