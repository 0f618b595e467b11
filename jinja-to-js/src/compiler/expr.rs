//! Expressions

use jinja_to_js_syntax::{
    BinaryExpr, BinaryOp, CallExpr, CompareExpr, CompareOp, DictExpr, Expr, FieldExpr,
    LiteralValue, SliceExpr, TernaryExpr, UnaryOp,
};

use super::Compiler;
use super::scope::Scope;
use crate::error::CompileError;
use crate::module::js_string;
use crate::runtime::Helper;

/// Dict methods whose call is dropped; `__each` iterates the dict itself.
const ITERATION_METHODS: &[&str] = &["items", "keys", "values", "iteritems"];

impl Compiler<'_> {
    /// Emit `expr`, opening an interpolation region if none is open.
    pub(super) fn emit_expr(&mut self, expr: &Expr, scope: &Scope) -> Result<(), CompileError> {
        let mut region = self.enter_interpolation(!self.config.autoescape);

        if scope.bool_coercion && coerces(expr) {
            self.use_helper(Helper::Ok);
            self.write("__ok(");
            self.emit_value(expr, &scope.with_bool(false))?;
            self.write(")");
        } else {
            self.emit_value(expr, scope)?;
        }

        self.exit(&mut region);
        Ok(())
    }

    /// Emit `expr` so that a property access can follow it.
    pub(super) fn emit_operand(&mut self, expr: &Expr, scope: &Scope) -> Result<(), CompileError> {
        if needs_parens(expr) {
            self.write("(");
            self.emit_expr(expr, scope)?;
            self.write(")");
            Ok(())
        } else {
            self.emit_expr(expr, scope)
        }
    }

    fn emit_value(&mut self, expr: &Expr, scope: &Scope) -> Result<(), CompileError> {
        let plain = scope.with_bool(false);
        match expr {
            Expr::Literal(lit) => {
                let code = literal(&lit.value);
                self.write(&code);
            }
            Expr::List(list) | Expr::Tuple(list) => {
                self.write("[");
                self.emit_list(&list.items, &plain)?;
                self.write("]");
            }
            Expr::Dict(dict) => self.emit_dict(dict, &plain)?,
            Expr::Var(ident) => self.emit_name(&ident.name),
            Expr::Field(field) => self.emit_field(field, &plain)?,
            Expr::Index(index) => {
                self.emit_operand(&index.base, &plain)?;
                self.write("[");
                self.emit_expr(&index.index, &plain)?;
                self.write("]");
            }
            Expr::Slice(slice) => self.emit_slice(slice, &plain)?,
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Not => {
                    self.write("!");
                    self.emit_expr(&unary.expr, &scope.with_bool(true))?;
                }
                UnaryOp::Neg | UnaryOp::Pos => {
                    self.write(if unary.op == UnaryOp::Neg { "(-" } else { "(+" });
                    self.emit_expr(&unary.expr, &plain)?;
                    self.write(")");
                }
            },
            Expr::Binary(binary) => self.emit_binary(binary, scope)?,
            Expr::Compare(compare) => self.emit_compare(compare, &plain)?,
            Expr::Filter(filter) => self.emit_filter(filter, &plain)?,
            Expr::Test(test) => self.emit_test(test, &plain)?,
            Expr::Call(call) => self.emit_call(call, &plain)?,
            Expr::Ternary(ternary) => self.emit_ternary(ternary, &plain)?,
        }
        Ok(())
    }

    fn emit_list(&mut self, items: &[Expr], scope: &Scope) -> Result<(), CompileError> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expr(item, scope)?;
        }
        Ok(())
    }

    /// Arguments of a call that already has a first argument written.
    pub(super) fn emit_trailing_args(
        &mut self,
        args: &[Expr],
        scope: &Scope,
    ) -> Result<(), CompileError> {
        for arg in args {
            self.write(", ");
            self.emit_expr(arg, scope)?;
        }
        Ok(())
    }

    fn emit_dict(&mut self, dict: &DictExpr, scope: &Scope) -> Result<(), CompileError> {
        self.write("{");
        for (i, (key, value)) in dict.entries.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match key.as_literal() {
                Some(LiteralValue::String(s)) => self.write(&js_string(s)),
                Some(LiteralValue::Int(i)) if *i >= 0 => self.write(&i.to_string()),
                _ => {
                    self.write("[");
                    self.emit_expr(key, scope)?;
                    self.write("]");
                }
            }
            self.write(": ");
            self.emit_expr(value, scope)?;
        }
        self.write("}");
        Ok(())
    }

    /// A local name as is, anything else through the context.
    fn emit_name(&mut self, name: &str) {
        if self.stored.contains(name) {
            self.write(name);
        } else {
            let code = format!("{}.{name}", self.config.context_name);
            self.write(&code);
        }
    }

    fn emit_field(&mut self, field: &FieldExpr, scope: &Scope) -> Result<(), CompileError> {
        if let Expr::Var(base) = &*field.base
            && base.name == "loop"
            && !self.stored.contains("loop")
            && let Some(vars) = &scope.loop_vars
            && let Some(code) = vars.metadata(&field.field.name)
        {
            self.write(&code);
            return Ok(());
        }

        self.emit_operand(&field.base, scope)?;
        self.write(".");
        self.write(&field.field.name);
        Ok(())
    }

    fn emit_slice(&mut self, slice: &SliceExpr, scope: &Scope) -> Result<(), CompileError> {
        if let Some(step) = &slice.step {
            return Err(CompileError::UnsupportedSliceStep {
                span: step.span(),
                src: self.named_source(),
            });
        }

        self.emit_operand(&slice.base, scope)?;
        self.write(".slice(");
        match &slice.start {
            Some(start) => self.emit_expr(start, scope)?,
            None => self.write("0"),
        }
        if let Some(stop) = &slice.stop {
            self.write(", ");
            self.emit_expr(stop, scope)?;
        }
        self.write(")");
        Ok(())
    }

    fn emit_binary(&mut self, binary: &BinaryExpr, scope: &Scope) -> Result<(), CompileError> {
        let plain = scope.with_bool(false);
        // `and`/`or` pass truthiness coercion on to their operands
        let (open, sep, close, operands) = match binary.op {
            BinaryOp::And => ("(", " && ", ")", scope),
            BinaryOp::Or => ("(", " || ", ")", scope),
            BinaryOp::Add => ("(", " + ", ")", &plain),
            BinaryOp::Sub => ("(", " - ", ")", &plain),
            BinaryOp::Mul => ("(", " * ", ")", &plain),
            BinaryOp::Div => ("(", " / ", ")", &plain),
            BinaryOp::Mod => ("(", " % ", ")", &plain),
            BinaryOp::FloorDiv => ("Math.floor(", " / ", ")", &plain),
            BinaryOp::Pow => ("Math.pow(", ", ", ")", &plain),
            BinaryOp::Concat => ("(\"\" + ", " + ", ")", &plain),
        };
        self.write(open);
        self.emit_expr(&binary.left, operands)?;
        self.write(sep);
        self.emit_expr(&binary.right, operands)?;
        self.write(close);
        Ok(())
    }

    fn emit_compare(&mut self, compare: &CompareExpr, plain: &Scope) -> Result<(), CompileError> {
        let [(op, right)] = compare.ops.as_slice() else {
            return Err(CompileError::MultipleComparisonOperandsUnsupported {
                span: compare.span,
                src: self.named_source(),
            });
        };
        let left = &*compare.left;

        match op {
            CompareOp::Eq | CompareOp::Ne => {
                if left.as_literal().is_some() || right.as_literal().is_some() {
                    self.write("(");
                    self.emit_expr(left, plain)?;
                    self.write(if *op == CompareOp::Eq { " === " } else { " !== " });
                    self.emit_expr(right, plain)?;
                    self.write(")");
                } else {
                    self.use_helper(Helper::IsEqual);
                    self.write(if *op == CompareOp::Eq { "__isEqual(" } else { "!__isEqual(" });
                    self.emit_expr(left, plain)?;
                    self.write(", ");
                    self.emit_expr(right, plain)?;
                    self.write(")");
                }
            }
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                let sep = match op {
                    CompareOp::Lt => " < ",
                    CompareOp::Le => " <= ",
                    CompareOp::Gt => " > ",
                    _ => " >= ",
                };
                self.write("(");
                self.emit_expr(left, plain)?;
                self.write(sep);
                self.emit_expr(right, plain)?;
                self.write(")");
            }
            CompareOp::In | CompareOp::NotIn => {
                self.use_helper(Helper::Contains);
                self.write(if *op == CompareOp::In { "__contains(" } else { "!__contains(" });
                self.emit_expr(right, plain)?;
                self.write(", ");
                self.emit_expr(left, plain)?;
                self.write(")");
            }
        }
        Ok(())
    }

    fn emit_call(&mut self, call: &CallExpr, scope: &Scope) -> Result<(), CompileError> {
        if call.args.is_empty()
            && call.is_method_call(ITERATION_METHODS)
            && let Some(receiver) = call.receiver()
        {
            return self.emit_expr(receiver, scope);
        }

        if let Expr::Var(callee) = &*call.func
            && callee.name == "super"
            && !self.stored.contains("super")
        {
            return self.emit_super(call.span, scope);
        }

        self.emit_operand(&call.func, scope)?;
        self.write("(");
        self.emit_list(&call.args, scope)?;
        self.write(")");
        Ok(())
    }

    fn emit_ternary(&mut self, ternary: &TernaryExpr, scope: &Scope) -> Result<(), CompileError> {
        self.write("(");
        self.emit_expr(&ternary.condition, &scope.with_bool(true))?;
        self.write(" ? ");
        self.emit_expr(&ternary.value, scope)?;
        self.write(" : ");
        match &ternary.otherwise {
            Some(otherwise) => self.emit_expr(otherwise, scope)?,
            None => self.write("undefined"),
        }
        self.write(")");
        Ok(())
    }
}

/// JSON encoding of a constant, which is also valid JavaScript.
fn literal(value: &LiteralValue) -> String {
    let json = match value {
        LiteralValue::None => serde_json::Value::Null,
        LiteralValue::Bool(b) => serde_json::Value::Bool(*b),
        LiteralValue::Int(i) => serde_json::Value::from(*i),
        LiteralValue::Float(f) => serde_json::Value::from(*f),
        LiteralValue::String(s) => serde_json::Value::from(s.as_str()),
    };
    json.to_string()
}

/// Expressions that need `__ok` for Python truthiness. Comparisons, tests
/// and the logical operators already produce booleans. A conditional
/// expression yields one of its branches, so it is coerced as a whole.
fn coerces(expr: &Expr) -> bool {
    match expr {
        Expr::Compare(_) | Expr::Test(_) => false,
        Expr::Unary(u) => u.op != UnaryOp::Not,
        Expr::Binary(b) => !matches!(b.op, BinaryOp::And | BinaryOp::Or),
        _ => true,
    }
}

/// Whether the emitted code must be parenthesized before `.prop` or `[i]`.
fn needs_parens(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(lit) => matches!(lit.value, LiteralValue::Int(_) | LiteralValue::Float(_)),
        Expr::Unary(u) => u.op == UnaryOp::Not,
        Expr::Compare(_) | Expr::Test(_) => true,
        Expr::Filter(f) if f.name.name == "safe" => needs_parens(&f.expr),
        _ => false,
    }
}
