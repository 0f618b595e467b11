//! Template loading and parsing

use std::collections::HashMap;
use std::io;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use jinja_to_js_syntax::Template;

use crate::error::CompileError;

/// Resolves template names to template text.
pub trait Loader: Send + Sync {
    fn get_source(&self, name: &str) -> io::Result<String>;
}

/// Loads templates from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: Utf8PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl Loader for FileSystemLoader {
    fn get_source(&self, name: &str) -> io::Result<String> {
        let relative = Utf8Path::new(name);
        let escapes_root = relative
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
        if escapes_root {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "template names must be relative paths inside the template root",
            ));
        }

        let path = self.root.join(relative);
        tracing::trace!(%path, "reading template");
        std::fs::read_to_string(&path)
    }
}

/// Templates held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    templates: HashMap<String, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    /// Builder-style [`InMemoryLoader::add`].
    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.add(name, source);
        self
    }
}

impl Loader for InMemoryLoader {
    fn get_source(&self, name: &str) -> io::Result<String> {
        self.templates.get(name).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no template is registered under this name",
            )
        })
    }
}

/// Loader plus parser: everything the compiler needs to turn a template
/// name into a syntax tree.
pub struct Environment {
    loader: Box<dyn Loader>,
}

impl Environment {
    pub fn new(loader: impl Loader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
        }
    }

    pub fn get_source(&self, name: &str) -> Result<String, CompileError> {
        self.loader
            .get_source(name)
            .map_err(|source| CompileError::TemplateNotFound {
                name: name.to_string(),
                source,
            })
    }

    pub fn parse(&self, name: Option<&str>, text: &str) -> Result<Template, CompileError> {
        Ok(jinja_to_js_syntax::parse(name, text)?)
    }

    /// Load and parse a named template.
    pub fn load(&self, name: &str) -> Result<Template, CompileError> {
        let text = self.get_source(name)?;
        self.parse(Some(name), &text)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(InMemoryLoader::new())
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}
