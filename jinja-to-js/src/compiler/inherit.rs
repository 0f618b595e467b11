//! Template inheritance
//!
//! A child template that `extends` a parent registers its blocks and then
//! hands over to a compiler for the parent. When the parent reaches a
//! block, the most derived definition is rendered; `super()` inside it
//! renders the next definition up the chain.

use std::sync::Arc;

use jinja_to_js_syntax::{BlockNode, ExtendsNode};
use miette::SourceSpan;

use super::scope::Scope;
use super::{BlockEntry, Compiler};
use crate::error::CompileError;

impl Compiler<'_> {
    /// Only called for top-level nodes; the caller stops after it.
    pub(super) fn process_extends(&mut self, node: &ExtendsNode) -> Result<(), CompileError> {
        let template = self.template;
        for block in template.blocks() {
            let entry = BlockEntry {
                block: Arc::new(block.clone()),
                origin: Arc::clone(&self.root),
            };
            self.shared
                .child_blocks
                .entry(block.name.name.clone())
                .or_default()
                .push(entry);
        }

        let parent_name = node.template.value.as_str();
        tracing::debug!(
            child = template.name.as_deref().unwrap_or("<template>"),
            parent = parent_name,
            "extends"
        );
        let parent = self.env.load(parent_name)?;

        let mut compiler = Compiler::new(self.env, self.config, &mut *self.shared, &parent);
        compiler.function_name = self.function_name.clone();
        let output = compiler.run()?;

        self.write(&output.code);
        self.helpers.extend(output.helpers);
        Ok(())
    }

    pub(super) fn process_block(
        &mut self,
        node: &BlockNode,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let mut chain = self
            .shared
            .child_blocks
            .get(&node.name.name)
            .cloned()
            .unwrap_or_default();

        if !chain.iter().any(|entry| entry.is(node, &self.origin)) {
            chain.push(BlockEntry {
                block: Arc::new(node.clone()),
                origin: Arc::clone(&self.origin),
            });
        }
        tracing::trace!(block = %node.name.name, definitions = chain.len(), "block");

        self.render_block_chain(&chain, scope)
    }

    /// Render the first definition in `chain`, with the rest available to
    /// `super()`.
    fn render_block_chain(
        &mut self,
        chain: &[BlockEntry],
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let Some((first, rest)) = chain.split_first() else {
            return Ok(());
        };
        let scope = scope.with_super(rest.to_vec().into());

        let previous = std::mem::replace(&mut self.origin, Arc::clone(&first.origin));
        let result = self.process_all(&first.block.body, &scope);
        self.origin = previous;
        result
    }

    /// `super()`: the parent definition of the current block, rendered into
    /// a string by an immediately invoked function.
    pub(super) fn emit_super(
        &mut self,
        span: SourceSpan,
        scope: &Scope,
    ) -> Result<(), CompileError> {
        let chain = match &scope.super_chain {
            Some(chain) if !chain.is_empty() => Arc::clone(chain),
            _ => {
                return Err(CompileError::SuperOutsideBlock {
                    span,
                    src: self.named_source(),
                });
            }
        };

        self.write("(function () {\nvar __result = \"\";\n");
        self.in_default_mode(|this| {
            let saved = this.stored.snapshot();
            let result = this.render_block_chain(&chain, scope);
            this.stored.restore(saved);
            result
        })?;
        self.write("return __result;\n})()");
        Ok(())
    }
}
