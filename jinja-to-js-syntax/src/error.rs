//! Parse errors with source snippets

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Template text plus the name it is reported under.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub name: String,
    pub source: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, source: Arc<String>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, (*self.source).clone())
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unclosed(#[from] UnclosedError),
}

/// A token the grammar does not allow at this position.
#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected {found}")]
#[diagnostic(code(jinja_to_js::syntax::unexpected), help("Expected {expected}"))]
pub struct SyntaxError {
    /// Description of the offending token, e.g. "`}}`" or "end of input"
    pub found: String,
    pub expected: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A tag, comment, string or statement that reaches the end of input.
#[derive(Error, Debug, Diagnostic)]
#[error("Unclosed {kind}")]
#[diagnostic(
    code(jinja_to_js::syntax::unclosed),
    help("Add `{close_delim}` to close this {kind}")
)]
pub struct UnclosedError {
    /// `if`, `for`, `comment`, ...
    pub kind: String,
    /// Text that would have closed it, e.g. `{% endif %}`
    pub close_delim: String,
    #[label("opened here")]
    pub open_span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}
