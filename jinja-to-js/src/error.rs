//! Compilation errors
//!
//! Every failure aborts the whole compilation; no partial output is ever
//! returned. Errors raised while walking the tree carry the span of the
//! offending node and the source of the template it came from, so they
//! render with a snippet through miette.

use jinja_to_js_syntax::ParseError;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    #[error("No template to compile")]
    #[diagnostic(
        code(jinja_to_js::missing_template_source),
        help("Set either a template name or a literal template source")
    )]
    MissingTemplateSource,

    #[error("Unknown module format `{found}`")]
    #[diagnostic(
        code(jinja_to_js::invalid_module_format),
        help("Use one of: global, amd, commonjs, es6")
    )]
    InvalidModuleFormat { found: String },

    #[error("Template `{name}` could not be loaded")]
    #[diagnostic(code(jinja_to_js::template_not_found))]
    TemplateNotFound {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("Cannot compile `{kind}` statements")]
    #[diagnostic(code(jinja_to_js::unknown_node_kind))]
    UnknownNodeKind {
        kind: &'static str,
        #[label("not supported")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unsupported filter `{name}`")]
    #[diagnostic(code(jinja_to_js::unsupported_filter))]
    UnsupportedFilter {
        name: String,
        #[help]
        help: Option<String>,
        #[label("this filter has no JavaScript translation")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unsupported test `{name}`")]
    #[diagnostic(code(jinja_to_js::unsupported_test))]
    UnsupportedTest {
        name: String,
        #[help]
        help: Option<String>,
        #[label("this test has no JavaScript translation")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Cannot unpack {count} loop variables")]
    #[diagnostic(
        code(jinja_to_js::unsupported_destructuring),
        help("Loops can bind one name, or two names for key/value pairs")
    )]
    UnsupportedDestructuring {
        count: usize,
        #[label("loop target")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("`extends` must be a top-level statement")]
    #[diagnostic(
        code(jinja_to_js::nested_extends),
        help("Move the `extends` out of the enclosing block, loop or condition")
    )]
    NestedExtends {
        #[label("nested here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("`super()` has no parent block to render")]
    #[diagnostic(
        code(jinja_to_js::super_outside_block),
        help("`super()` only works inside a block that overrides a block of an extended template")
    )]
    SuperOutsideBlock {
        #[label("called here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Chained comparisons are not supported")]
    #[diagnostic(
        code(jinja_to_js::multiple_comparison_operands_unsupported),
        help("Split the comparison, e.g. `a < b and b < c`")
    )]
    MultipleComparisonOperandsUnsupported {
        #[label("more than one comparison operator")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Slices with a step are not supported")]
    #[diagnostic(code(jinja_to_js::unsupported_slice_step))]
    UnsupportedSliceStep {
        #[label("step given here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}
