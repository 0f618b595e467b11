//! The tree walker
//!
//! One [`Compiler`] walks one template in a single forward pass, appending
//! JavaScript to its buffer. Statements are handled in `stmt`, expressions
//! in `expr`, filters and tests in `filters` and template inheritance in
//! `inherit`. Extending a template starts a fresh compiler for the parent
//! that shares the block map and the dependency list with this one.

mod expr;
mod filters;
mod inherit;
mod mode;
mod scope;
mod stmt;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use jinja_to_js_syntax::{BlockNode, Node, Template};
use miette::NamedSource;

use crate::environment::Environment;
use crate::error::CompileError;
use crate::module::{self, RUNTIME_BINDING};
use crate::options::CompileOptions;
use crate::runtime::Helper;

pub use filters::{SUPPORTED_FILTERS, SUPPORTED_TESTS};

use mode::Mode;
use scope::{Scope, StoredNames, TempNames};

/// The template a piece of syntax came from, for diagnostics and for
/// resolving relative includes.
#[derive(Debug)]
pub(crate) struct Origin {
    pub name: Option<String>,
    pub source: Arc<String>,
}

impl Origin {
    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(
            self.name.as_deref().unwrap_or("<template>"),
            (*self.source).clone(),
        )
    }
}

/// A block together with the template that defines it.
#[derive(Debug, Clone)]
pub(crate) struct BlockEntry {
    pub block: Arc<BlockNode>,
    pub origin: Arc<Origin>,
}

impl BlockEntry {
    fn is(&self, block: &BlockNode, origin: &Origin) -> bool {
        Arc::ptr_eq(&self.origin.source, &origin.source) && self.block.span == block.span
    }
}

/// State shared by every compiler taking part in one compilation.
#[derive(Debug)]
pub(crate) struct Shared {
    /// Block overrides by name, most derived first
    pub child_blocks: IndexMap<String, Vec<BlockEntry>>,
    /// Module path to import binding, runtime first
    pub dependencies: IndexMap<String, String>,
}

impl Shared {
    pub(crate) fn new(runtime_path: &str) -> Self {
        let mut dependencies = IndexMap::new();
        dependencies.insert(runtime_path.to_string(), RUNTIME_BINDING.to_string());
        Self {
            child_blocks: IndexMap::new(),
            dependencies,
        }
    }
}

/// Code produced for one template, before it is wrapped in a function.
#[derive(Debug)]
pub(crate) struct Output {
    pub code: String,
    pub helpers: IndexSet<Helper>,
}

pub(crate) struct Compiler<'a> {
    env: &'a Environment,
    config: &'a CompileOptions,
    shared: &'a mut Shared,
    template: &'a Template,
    /// Origin of `template`
    root: Arc<Origin>,
    /// Origin of the syntax being processed right now; differs from `root`
    /// while rendering a block defined in another template
    origin: Arc<Origin>,
    function_name: String,
    output: String,
    mode: Mode,
    stored: StoredNames,
    temps: TempNames,
    helpers: IndexSet<Helper>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        env: &'a Environment,
        config: &'a CompileOptions,
        shared: &'a mut Shared,
        template: &'a Template,
    ) -> Self {
        let root = Arc::new(Origin {
            name: template.name.clone(),
            source: Arc::clone(&template.source),
        });
        Self {
            env,
            config,
            shared,
            template,
            origin: Arc::clone(&root),
            root,
            function_name: module::function_name(template.name.as_deref()),
            output: String::new(),
            mode: Mode::Default,
            stored: StoredNames::default(),
            temps: TempNames::default(),
            helpers: IndexSet::new(),
        }
    }

    /// Walk the whole template.
    pub(crate) fn run(mut self) -> Result<Output, CompileError> {
        let template = self.template;
        let scope = Scope::default();
        for node in &template.body {
            // the parent renders everything after an `extends`
            if let Node::Extends(extends) = node {
                self.process_extends(extends)?;
                break;
            }
            self.process(node, &scope)?;
        }

        let mut helpers = self.helpers;
        helpers.sort_unstable();
        Ok(Output {
            code: self.output,
            helpers,
        })
    }

    fn process(&mut self, node: &Node, scope: &Scope) -> Result<(), CompileError> {
        tracing::trace!(kind = node.kind(), "processing node");
        match node {
            Node::Text(n) => {
                self.process_text(&n.text);
                Ok(())
            }
            Node::Print(n) => self.process_print(n, scope),
            Node::If(n) => self.process_if(n, scope, None),
            Node::For(n) => self.process_for(n, scope),
            Node::Set(n) => self.process_set(n, scope),
            Node::With(n) => self.process_with(n, scope),
            Node::Include(n) => self.process_include(n),
            Node::Extends(n) => Err(CompileError::NestedExtends {
                span: n.span,
                src: self.origin.named_source(),
            }),
            Node::Block(n) => self.process_block(n, scope),
            Node::Macro(n) => Err(CompileError::UnknownNodeKind {
                kind: node.kind(),
                span: n.span,
                src: self.origin.named_source(),
            }),
        }
    }

    fn process_all(&mut self, nodes: &[Node], scope: &Scope) -> Result<(), CompileError> {
        for node in nodes {
            self.process(node, scope)?;
        }
        Ok(())
    }

    fn write(&mut self, code: &str) {
        self.output.push_str(code);
    }

    /// Inject `helper` (and what it calls) into the render function.
    fn use_helper(&mut self, helper: Helper) {
        for dep in helper.dependencies() {
            self.use_helper(*dep);
        }
        if self.helpers.insert(helper) {
            tracing::debug!(helper = helper.name(), "injecting runtime helper");
        }
    }

    /// Register an import and return the binding to use for it.
    ///
    /// Different paths can map to the same name (`a/x` and `a_x`), so a
    /// taken binding gets a numeric suffix.
    fn add_dependency(&mut self, path: String, binding: String) -> String {
        if let Some(existing) = self.shared.dependencies.get(&path) {
            return existing.clone();
        }

        let mut unique = binding.clone();
        let mut suffix = 2;
        while unique == self.function_name
            || self.shared.dependencies.values().any(|b| *b == unique)
        {
            unique = format!("{binding}{suffix}");
            suffix += 1;
        }
        tracing::debug!(%path, binding = %unique, "adding module dependency");
        self.shared.dependencies.insert(path, unique.clone());
        unique
    }

    fn named_source(&self) -> NamedSource<String> {
        self.origin.named_source()
    }
}

/// The render function around compiled template code.
pub(crate) fn render_function(name: &str, context_name: &str, output: &Output) -> String {
    let mut f = String::new();
    f.push_str(&format!("function {name}({context_name}) {{\n"));
    f.push_str("    var __result = \"\";\n");
    f.push_str("    var __tmp;\n");

    let helper_lines = output.helpers.iter().flat_map(|h| h.source().lines());
    for line in helper_lines.chain(output.code.lines()) {
        if line.is_empty() {
            f.push('\n');
        } else {
            f.push_str(&format!("    {line}\n"));
        }
    }

    f.push_str("    return __result;\n}");
    f
}
