//! Compilation options

use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;

/// Where the template text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Load the template through the environment's loader.
    Name(String),
    /// Compile this text directly. The generated function is named `template`.
    Literal(String),
}

/// Shape of the generated module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModuleFormat {
    /// A bare function declaration; the runtime is expected as the global `jinjaToJS`.
    #[default]
    Global,
    /// `define([...], function (...) { return ...; });`
    Amd,
    /// `require(...)` and `module.exports`
    CommonJs,
    /// `import ... from ...` and `export default`
    Es6,
}

impl ModuleFormat {
    pub const ALL: [ModuleFormat; 4] = [
        ModuleFormat::Global,
        ModuleFormat::Amd,
        ModuleFormat::CommonJs,
        ModuleFormat::Es6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleFormat::Global => "global",
            ModuleFormat::Amd => "amd",
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Es6 => "es6",
        }
    }

    /// Whether templates are linked through imports rather than the global runtime.
    pub fn is_module(self) -> bool {
        self != ModuleFormat::Global
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleFormat {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CompileError::InvalidModuleFormat {
                found: s.to_string(),
            })
    }
}

/// Everything that configures one compilation.
///
/// ```
/// use jinja_to_js::{CompileOptions, ModuleFormat};
///
/// let options = CompileOptions::new()
///     .template_name("pages/home.jinja")
///     .module_format(ModuleFormat::Es6)
///     .custom_filter("markdown");
/// assert_eq!(options.context_name, "context");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Template to compile; `None` fails with [`CompileError::MissingTemplateSource`]
    pub source: Option<TemplateSource>,
    pub module_format: ModuleFormat,
    /// Import path of the runtime library
    pub runtime_path: String,
    /// Prepended to include references
    pub include_prefix: String,
    /// Appended to include references after the template extension is stripped
    pub include_ext: String,
    /// Name of the render function's parameter
    pub context_name: String,
    /// Filters resolved at render time through `jinjaToJS.filters`
    pub custom_filters: Vec<String>,
    /// HTML-escape interpolated values unless marked safe
    pub autoescape: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source: None,
            module_format: ModuleFormat::default(),
            runtime_path: "jinja-to-js".to_string(),
            include_prefix: String::new(),
            include_ext: String::new(),
            context_name: "context".to_string(),
            custom_filters: Vec::new(),
            autoescape: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.source = Some(TemplateSource::Name(name.into()));
        self
    }

    pub fn template_source(mut self, text: impl Into<String>) -> Self {
        self.source = Some(TemplateSource::Literal(text.into()));
        self
    }

    pub fn module_format(mut self, format: ModuleFormat) -> Self {
        self.module_format = format;
        self
    }

    pub fn runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    pub fn include_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.include_prefix = prefix.into();
        self
    }

    pub fn include_ext(mut self, ext: impl Into<String>) -> Self {
        self.include_ext = ext.into();
        self
    }

    pub fn context_name(mut self, name: impl Into<String>) -> Self {
        self.context_name = name.into();
        self
    }

    pub fn custom_filter(mut self, name: impl Into<String>) -> Self {
        self.custom_filters.push(name.into());
        self
    }

    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.autoescape = enabled;
        self
    }
}
