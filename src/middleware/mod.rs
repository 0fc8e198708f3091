//! Middleware layer.
//!
//! A middleware is a [`Handler`](crate::Handler) that wraps another handler
//! and, usually, the response writer too. It installs its own layer with
//! [`writer::wrap`](crate::writer::wrap) and passes the decorated chain down:
//!
//! ```text
//! LogHandler ─▶ TemplateHandler ─▶ Router ─▶ your handler
//!     │               │
//!     ▼               ▼
//! StatusWriter   TemplateWriter      (layers added to the writer chain)
//! ```
//!
//! Middleware never assume which other middleware run above them. When one
//! needs to know whether its layer is already present, or to reach a layer
//! another middleware installed, it searches the chain with
//! [`writer::find_layer`](crate::writer::find_layer).
//!
//! Built-in middleware:
//! - [`log`] — one access log line per request, in a predefined or custom format
//! - [`status`] — records the response status as it is written
//! - [`template`] — makes a compiled-template registry reachable from handlers

pub mod log;
pub mod status;
pub mod template;

pub use log::{LogHandler, LogOptions};
pub use status::StatusWriter;
pub use template::{TemplateHandler, TemplateWriter};
