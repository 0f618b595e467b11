//! Parser for Jinja-style templates.
//!
//! Produces the syntax tree consumed by the `jinja-to-js` compiler. The
//! accepted language is the subset that compiler understands: text, `{{ }}`
//! expressions with filters and tests, and the `if`, `for`, `set`, `with`,
//! `include`, `extends`, `block` and `macro` statements.
//!
//! # Example
//!
//! ```
//! use jinja_to_js_syntax::{Node, parse};
//!
//! let template = parse(Some("hello.jinja"), "Hello {{ name }}!").unwrap();
//! assert_eq!(template.body.len(), 3);
//! assert!(matches!(template.body[1], Node::Print(_)));
//! ```

mod ast;
mod error;
mod lexer;
mod parser;

use std::sync::Arc;

pub use ast::*;
pub use error::{ParseError, SyntaxError, TemplateSource, UnclosedError};

/// Parse template source. `name` is the loader name of the template and is
/// used in diagnostics; literal sources pass `None`.
pub fn parse(name: Option<&str>, source: &str) -> Result<Template, ParseError> {
    let text = Arc::new(source.to_string());
    let origin = TemplateSource::new(name.unwrap_or("<template>"), Arc::clone(&text));

    let tokens = lexer::Lexer::new(&origin).tokenize()?;
    tracing::trace!(template = %origin.name, tokens = tokens.len(), "lexed template");

    let body = parser::Parser::new(tokens, origin).parse_template()?;
    Ok(Template {
        name: name.map(str::to_string),
        source: text,
        body,
    })
}
