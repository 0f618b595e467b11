//! Filters and tests

use jinja_to_js_syntax::{Expr, FilterExpr, TestExpr};

use super::Compiler;
use super::scope::Scope;
use crate::error::CompileError;
use crate::module::{RUNTIME_BINDING, js_string};
use crate::runtime::Helper;

/// Built-in filters, in the order they are listed in diagnostics.
pub const SUPPORTED_FILTERS: &[&str] = &[
    "safe",
    "capitalize",
    "abs",
    "attr",
    "batch",
    "default",
    "first",
    "int",
    "last",
    "length",
    "lower",
    "slice",
    "title",
    "trim",
    "truncate",
    "upper",
];

/// Built-in tests, in the order they are listed in diagnostics.
pub const SUPPORTED_TESTS: &[&str] = &[
    "defined",
    "undefined",
    "callable",
    "divisibleby",
    "even",
    "odd",
    "none",
    "number",
    "upper",
    "lower",
    "string",
    "mapping",
];

impl Compiler<'_> {
    pub(super) fn emit_filter(
        &mut self,
        filter: &FilterExpr,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let name = filter.name.name.as_str();
        let value = &*filter.expr;
        let args = filter.args.as_slice();

        let helper = match name {
            "capitalize" => Some(Helper::Capitalize),
            "batch" => Some(Helper::Batch),
            "default" => Some(Helper::Default),
            "first" => Some(Helper::First),
            "int" => Some(Helper::Int),
            "last" => Some(Helper::Last),
            "length" => Some(Helper::Size),
            "slice" => Some(Helper::Slice),
            "title" => Some(Helper::Title),
            "truncate" => Some(Helper::Truncate),
            _ => None,
        };
        if let Some(helper) = helper {
            self.use_helper(helper);
            self.write(helper.name());
            self.write("(");
            self.emit_expr(value, scope)?;
            self.emit_trailing_args(args, scope)?;
            self.write(")");
            return Ok(());
        }

        match name {
            // only affects which interpolation region the print opens
            "safe" => self.emit_expr(value, scope)?,
            "abs" => {
                self.write("Math.abs(");
                self.emit_expr(value, scope)?;
                self.write(")");
            }
            "attr" => {
                let [attr] = args else {
                    return Err(CompileError::UnsupportedFilter {
                        name: name.to_string(),
                        help: Some("`attr` takes exactly one argument, the attribute name".into()),
                        span: filter.span,
                        src: self.named_source(),
                    });
                };
                self.emit_operand(value, scope)?;
                self.write("[");
                self.emit_expr(attr, scope)?;
                self.write("]");
            }
            "lower" | "upper" | "trim" => {
                let method = match name {
                    "lower" => ".toLowerCase()",
                    "upper" => ".toUpperCase()",
                    _ => ".trim()",
                };
                self.emit_operand(value, scope)?;
                self.write(method);
            }
            _ if self.config.custom_filters.iter().any(|f| f == name) => {
                tracing::trace!(filter = name, "custom filter");
                self.write(RUNTIME_BINDING);
                self.write(".filters");
                if is_identifier(name) {
                    self.write(".");
                    self.write(name);
                } else {
                    self.write("[");
                    self.write(&js_string(name));
                    self.write("]");
                }
                self.write("(");
                self.emit_expr(value, scope)?;
                self.emit_trailing_args(args, scope)?;
                self.write(")");
            }
            _ => {
                return Err(CompileError::UnsupportedFilter {
                    name: name.to_string(),
                    help: Some(suggestion(name, SUPPORTED_FILTERS, "filters")),
                    span: filter.name.span,
                    src: self.named_source(),
                });
            }
        }
        Ok(())
    }

    pub(super) fn emit_test(&mut self, test: &TestExpr, scope: &Scope) -> Result<(), CompileError> {
        let name = test.name.name.as_str();
        let value = &*test.expr;

        if test.negated {
            self.write("!");
        }

        match name {
            "defined" | "undefined" => {
                self.write("(typeof ");
                self.emit_operand(value, scope)?;
                self.write(if name == "defined" {
                    " !== \"undefined\")"
                } else {
                    " === \"undefined\")"
                });
            }
            "callable" | "string" | "mapping" => {
                let type_name = match name {
                    "callable" => "Function",
                    "string" => "String",
                    _ => "Object",
                };
                self.use_helper(Helper::Type);
                self.write("(__type(");
                self.emit_expr(value, scope)?;
                self.write(") === ");
                self.write(&js_string(type_name));
                self.write(")");
            }
            "number" => {
                self.use_helper(Helper::Type);
                self.write("(__type(");
                self.emit_expr(value, scope)?;
                self.write(") === \"Number\" && !isNaN(");
                self.emit_expr(value, scope)?;
                self.write("))");
            }
            "divisibleby" => {
                let [divisor] = test.args.as_slice() else {
                    return Err(CompileError::UnsupportedTest {
                        name: name.to_string(),
                        help: Some("`divisibleby` takes exactly one argument".into()),
                        span: test.span,
                        src: self.named_source(),
                    });
                };
                self.write("(");
                self.emit_operand(value, scope)?;
                self.write(" % ");
                self.emit_expr(divisor, scope)?;
                self.write(" === 0)");
            }
            "even" => {
                self.write("(");
                self.emit_operand(value, scope)?;
                self.write(" % 2 === 0)");
            }
            // `%` keeps the sign of the dividend in JavaScript
            "odd" => {
                self.write("(Math.abs(");
                self.emit_expr(value, scope)?;
                self.write(" % 2) === 1)");
            }
            "none" => {
                self.write("(");
                self.emit_operand(value, scope)?;
                self.write(" === null)");
            }
            "upper" | "lower" => {
                self.write("(");
                self.emit_operand(value, scope)?;
                self.write(if name == "upper" {
                    ".toUpperCase() === "
                } else {
                    ".toLowerCase() === "
                });
                self.emit_operand(value, scope)?;
                self.write(")");
            }
            _ => {
                return Err(CompileError::UnsupportedTest {
                    name: name.to_string(),
                    help: Some(suggestion(name, SUPPORTED_TESTS, "tests")),
                    span: test.name.span,
                    src: self.named_source(),
                });
            }
        }
        Ok(())
    }
}

/// Whether `expr` is `... | safe`, which prints without escaping.
pub(super) fn is_safe_filter(expr: &Expr) -> bool {
    matches!(expr, Expr::Filter(f) if f.name.name == "safe")
}

/// Help text for an unknown name: the closest match, or the full list.
fn suggestion(name: &str, known: &[&str], what: &str) -> String {
    let closest = known
        .iter()
        .filter_map(|candidate| {
            let dist = strsim::levenshtein(name, candidate);
            (dist <= 2).then_some((*candidate, dist))
        })
        .min_by_key(|(_, dist)| *dist)
        .map(|(candidate, _)| candidate);

    match closest {
        Some(candidate) => format!("Did you mean `{candidate}`?"),
        None => format!("Supported {what}: {}", known.join(", ")),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
