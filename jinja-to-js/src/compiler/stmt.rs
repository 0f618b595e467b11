//! Statements

use jinja_to_js_syntax::{Expr, ForNode, IfNode, IncludeNode, Node, PrintNode, SetNode, WithNode};

use super::filters::is_safe_filter;
use super::mode::Region;
use super::scope::{LoopVars, Scope};
use super::Compiler;
use crate::error::CompileError;
use crate::module::{self, RUNTIME_BINDING, js_string};
use crate::runtime::Helper;

impl Compiler<'_> {
    pub(super) fn process_text(&mut self, text: &str) {
        let code = format!("__result += {};\n", js_string(text));
        self.write(&code);
    }

    pub(super) fn process_print(
        &mut self,
        node: &PrintNode,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let safe =
            !self.config.autoescape || is_safe_filter(&node.expr) || is_super_call(&node.expr);
        let mut region = self.enter_interpolation(safe);
        self.emit_expr(&node.expr, scope)?;
        self.exit(&mut region);
        Ok(())
    }

    /// `chain` is the region of an enclosing `} else if (`, which stays open
    /// until this condition has been written.
    pub(super) fn process_if(
        &mut self,
        node: &IfNode,
        scope: &Scope,
        chain: Option<&mut Region>,
    ) -> Result<(), CompileError> {
        let mut region = self.enter_execution();
        self.write("if (");
        self.emit_expr(&node.test, &scope.with_bool(true))?;
        self.write(") {");
        self.exit(&mut region);
        if let Some(chain) = chain {
            self.exit(chain);
        }

        self.process_all(&node.body, scope)?;

        match node.otherwise.as_slice() {
            [] => self.write_statement("}"),
            [Node::If(elif)] => {
                let mut region = self.enter_execution();
                self.write("} else ");
                self.process_if(elif, scope, Some(&mut region))?;
                self.exit(&mut region);
            }
            otherwise => {
                self.write_statement("} else {");
                self.process_all(otherwise, scope)?;
                self.write_statement("}");
            }
        }
        Ok(())
    }

    pub(super) fn process_for(
        &mut self,
        node: &ForNode,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let saved = self.stored.snapshot();

        // `for key, value in ...` binds the value first in the callback
        let (value, key) = match &node.target {
            Expr::Var(name) => (name.name.clone(), None),
            Expr::Tuple(tuple) => match tuple.items.as_slice() {
                [Expr::Var(name)] => (name.name.clone(), None),
                [Expr::Var(key), Expr::Var(value)] => (value.name.clone(), Some(key.name.clone())),
                items => {
                    return Err(CompileError::UnsupportedDestructuring {
                        count: items.len(),
                        span: tuple.span,
                        src: self.named_source(),
                    });
                }
            },
            other => {
                return Err(CompileError::UnsupportedDestructuring {
                    count: 0,
                    span: other.span(),
                    src: self.named_source(),
                });
            }
        };
        let index = match &key {
            Some(key) => key.clone(),
            None => self.temps.next(),
        };
        let collection = self.temps.next();

        self.use_helper(Helper::Each);
        let mut region = self.enter_execution();
        self.write("__each(");
        self.emit_iterable(&node.iter, scope)?;
        let header = format!(", function ({value}, {index}, {collection}) {{");
        self.write(&header);
        self.exit(&mut region);

        let names: Vec<String> = std::iter::once(value).chain(key).collect();
        for name in &names {
            self.stored.insert(name);
        }

        let scope = scope.with_loop(LoopVars { index, collection });

        if let Some(filter) = &node.filter {
            let mut region = self.enter_execution();
            self.write("if (!(");
            self.emit_expr(filter, &scope.with_bool(true))?;
            self.write(")) {\nreturn;\n}");
            self.exit(&mut region);
        }

        // loop variables are visible to includes and `super()` bodies
        // through the context while the body runs
        let bindings = self.bind_context(&names);
        self.process_all(&node.body, &scope)?;
        self.unbind_context(&bindings);

        self.write_statement("});");
        self.stored.restore(saved);
        Ok(())
    }

    /// The collection of a loop. `keys()` needs the helper, the other dict
    /// iteration methods are dropped since `__each` walks the dict itself.
    fn emit_iterable(&mut self, iter: &Expr, scope: &Scope) -> Result<(), CompileError> {
        if let Expr::Call(call) = iter
            && call.args.is_empty()
            && call.is_method_call(&["keys"])
            && let Some(receiver) = call.receiver()
        {
            self.use_helper(Helper::Keys);
            self.write("__keys(");
            self.emit_expr(receiver, scope)?;
            self.write(")");
            return Ok(());
        }
        self.emit_expr(iter, scope)
    }

    pub(super) fn process_set(
        &mut self,
        node: &SetNode,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let name = node.target.name.as_str();
        let mut region = self.enter_execution();
        self.write("var ");
        self.write(name);
        self.write(" = ");
        self.emit_expr(&node.value, scope)?;
        self.write(";");
        self.exit(&mut region);
        self.stored.insert(name);
        Ok(())
    }

    /// A `with` block runs in its own function so its assignments stay local.
    /// Its direct assignments are also placed on the context for the
    /// duration of the block.
    pub(super) fn process_with(
        &mut self,
        node: &WithNode,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let saved = self.stored.snapshot();

        let assignments: Vec<&SetNode> = node
            .body
            .iter()
            .filter_map(|n| match n {
                Node::Set(set) => Some(set),
                _ => None,
            })
            .collect();

        let mut bindings = Vec::new();
        for set in &assignments {
            let temp = self.temps.next();
            let mut region = self.enter_execution();
            let code = format!(
                "var {temp} = {ctx}.{name};\n{ctx}.{name} = ",
                ctx = self.config.context_name,
                name = set.target.name,
            );
            self.write(&code);
            self.emit_expr(&set.value, scope)?;
            self.write(";");
            self.exit(&mut region);
            self.stored.remove(&set.target.name);
            bindings.push((set.target.name.clone(), temp));
        }

        self.write_statement("(function () {");
        for child in &node.body {
            if !matches!(child, Node::Set(_)) {
                self.process(child, scope)?;
            }
        }
        self.write_statement("})();");

        self.unbind_context(&bindings);
        self.stored.restore(saved);
        Ok(())
    }

    pub(super) fn process_include(&mut self, node: &IncludeNode) -> Result<(), CompileError> {
        let target = node.template.value.as_str();
        let mut region = self.enter_interpolation(true);

        if module::function_name(Some(target)) == self.function_name {
            // recursive include of the template being compiled
            let name = self.function_name.clone();
            self.write(&name);
        } else {
            let format = self.config.module_format;
            let reference = module::include_reference(
                target,
                self.origin.name.as_deref(),
                &self.config.include_prefix,
                &self.config.include_ext,
                format,
            );
            tracing::debug!(template = target, %reference, "include");

            if format.is_module() {
                let binding = self.add_dependency(reference, module::function_name(Some(target)));
                self.write(&binding);
            } else {
                let code = format!("{RUNTIME_BINDING}.include({})", js_string(&reference));
                self.write(&code);
            }
        }

        let call = format!("({})", self.config.context_name);
        self.write(&call);
        self.exit(&mut region);
        Ok(())
    }

    /// A statement on its own line.
    fn write_statement(&mut self, code: &str) {
        let mut region = self.enter_execution();
        self.write(code);
        self.exit(&mut region);
    }

    /// Shadow `names` on the context with the JavaScript locals of the same
    /// name, returning what is needed to undo it.
    fn bind_context(&mut self, names: &[String]) -> Vec<(String, String)> {
        let ctx = self.config.context_name.clone();
        names
            .iter()
            .map(|name| {
                let temp = self.temps.next();
                let code = format!("var {temp} = {ctx}.{name};\n{ctx}.{name} = {name};");
                self.write_statement(&code);
                (name.clone(), temp)
            })
            .collect()
    }

    fn unbind_context(&mut self, bindings: &[(String, String)]) {
        let ctx = self.config.context_name.clone();
        for (name, temp) in bindings {
            let code = format!("{ctx}.{name} = {temp};");
            self.write_statement(&code);
        }
    }
}

fn is_super_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call(call) if matches!(&*call.func, Expr::Var(v) if v.name == "super"))
}
