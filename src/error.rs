//! Unified error type.

use std::fmt;
use std::path::PathBuf;

/// A boxed error from a pluggable collaborator, such as a template engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by wisp's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP responses,
/// not as `Error`s. This type surfaces infrastructure and configuration
/// failures: sockets, template compilation, invalid log settings.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A template compiler rejected the file at `path`.
    Compile { path: PathBuf, source: BoxError },
    /// Rendering was requested for a path with no compiled template.
    TemplateNotFound(PathBuf),
    /// A template failed while rendering.
    Render(BoxError),
    /// A log timestamp pattern that chrono cannot format.
    DateFormat(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Compile { path, source } => {
                write!(f, "compiling template {}: {source}", path.display())
            }
            Self::TemplateNotFound(path) => write!(f, "no template compiled for {}", path.display()),
            Self::Render(e) => write!(f, "rendering template: {e}"),
            Self::DateFormat(pattern) => write!(f, "invalid date format `{pattern}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Compile { source, .. } | Self::Render(source) => Some(source.as_ref()),
            Self::TemplateNotFound(_) | Self::DateFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
