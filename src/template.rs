//! Compiled-template registry.
//!
//! wisp ships no template engine. An engine plugs in as a
//! [`TemplateCompiler`] registered under a file extension; the registry
//! compiles files with it and keeps the results by path.
//!
//! The two maps are guarded by separate locks: registering a compiler never
//! blocks a request that is rendering, and compiling one file only excludes
//! readers for the moment the result is inserted.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{BoxError, Error};
use crate::writer::ResponseWriter;

/// A compiled template, ready to render any number of times concurrently.
pub trait Template: Send + Sync {
    fn render(&self, w: &mut dyn ResponseWriter, data: &Value) -> Result<(), BoxError>;
}

/// Turns a template file into a [`Template`].
///
/// A compiler may keep state between calls, such as a reusable parser, as
/// long as it stays `Sync`.
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, path: &Path) -> Result<Arc<dyn Template>, BoxError>;
}

/// Compilers by file extension and compiled templates by path.
#[derive(Default)]
pub struct TemplateRegistry {
    compilers: RwLock<HashMap<String, Arc<dyn TemplateCompiler>>>,
    templates: RwLock<HashMap<PathBuf, Arc<dyn Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `compiler` for files ending in `ext`.
    ///
    /// `"html"`, `".html"` and `".HTML"` all name the same extension. A later
    /// registration for the same extension replaces the earlier one.
    pub fn register_compiler(&self, ext: &str, compiler: impl TemplateCompiler + 'static) {
        let ext = ext.strip_prefix('.').unwrap_or(ext).to_lowercase();
        debug!(ext, "template compiler registered");
        self.compilers.write().insert(ext, Arc::new(compiler));
    }

    /// Compiles `path` with the compiler registered for its extension.
    ///
    /// A file whose extension has no compiler is skipped and stores nothing.
    /// Compile errors are returned as-is and nothing is retried.
    pub fn compile(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let Some(compiler) = self.compiler_for(path) else {
            debug!(path = %path.display(), "no compiler for extension, skipping");
            return Ok(());
        };

        let template = compiler.compile(path).map_err(|source| Error::Compile {
            path: path.to_owned(),
            source,
        })?;
        self.templates.write().insert(lowercase(path), template);
        debug!(path = %path.display(), "template compiled");
        Ok(())
    }

    /// Compiles every file in `dir`, descending into subdirectories when
    /// `recursive` is set. Returns how many templates were stored.
    ///
    /// Stops at the first compile or I/O error.
    pub fn compile_dir(&self, dir: impl AsRef<Path>, recursive: bool) -> Result<usize, Error> {
        let dir = dir.as_ref();
        let mut stored = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if recursive {
                    stored += self.compile_dir(&path, true)?;
                }
            } else if self.compiler_for(&path).is_some() {
                self.compile(&path)?;
                stored += 1;
            }
        }
        info!(dir = %dir.display(), stored, "template directory compiled");
        Ok(stored)
    }

    /// The template compiled from `path`, compared case-insensitively.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<dyn Template>> {
        self.templates.read().get(&lowercase(path.as_ref())).cloned()
    }

    /// Renders the template compiled from `path` into `w`.
    pub fn render(&self, path: impl AsRef<Path>, w: &mut dyn ResponseWriter, data: &Value) -> Result<(), Error> {
        let path = path.as_ref();
        // Clone the Arc out so the read lock is not held while rendering.
        let template = self.get(path).ok_or_else(|| Error::TemplateNotFound(path.to_owned()))?;
        template.render(w, data).map_err(Error::Render)
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compiler_for(&self, path: &Path) -> Option<Arc<dyn TemplateCompiler>> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        self.compilers.read().get(&ext).cloned()
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("compilers", &self.compilers.read().keys().collect::<Vec<_>>())
            .field("templates", &self.templates.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn lowercase(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}
