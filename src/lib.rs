//! # wisp
//!
//! A small HTTP toolkit built around one idea: middleware decorates the
//! response writer.
//!
//! ## The writer chain
//!
//! Handlers write their response through a [`ResponseWriter`]. A middleware
//! that needs to observe or alter the response wraps that writer in a layer of
//! its own before calling the next handler, so by the time a request reaches
//! application code the writer is a chain:
//!
//! ```text
//! TemplateWriter ─▶ StatusWriter ─▶ ResponseBuffer
//! ```
//!
//! Any layer can be found again by searching the chain. That is how the
//! access logger reads the final status, how a nested logger notices that a
//! request is already being logged, and how handlers reach the template
//! registry.
//!
//! What wisp provides:
//!
//! - Access logging: predefined and custom formats, custom tokens, immediate
//!   or deferred emission ([`middleware::log`])
//! - Status capture ([`middleware::status`])
//! - A compiled-template registry with pluggable engines ([`template`])
//! - Radix-tree routing via [`matchit`], served over hyper with graceful
//!   shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use wisp::middleware::{LogHandler, LogOptions};
//! use wisp::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user);
//!
//!     let app = LogHandler::new(app, LogOptions::new("_short_"));
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(r#"{"id":"99"}"#)
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod template;
pub mod writer;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use writer::{BoxWriter, ResponseBuffer, ResponseWriter};
