//! Lexical bookkeeping: scoped options, local names and temporaries

use std::collections::HashSet;
use std::sync::Arc;

use super::BlockEntry;

/// Options threaded through the walk. Overrides produce a modified copy, so
/// a change never outlives the subtree it was made for.
#[derive(Debug, Clone, Default)]
pub(super) struct Scope {
    /// Wrap values in `__ok(...)` for Python truthiness
    pub bool_coercion: bool,
    /// Ancestors of the block being rendered, nearest first
    pub super_chain: Option<Arc<[BlockEntry]>>,
    /// Callback parameters of the innermost loop
    pub loop_vars: Option<Arc<LoopVars>>,
}

impl Scope {
    pub(super) fn with_bool(&self, bool_coercion: bool) -> Scope {
        Scope {
            bool_coercion,
            ..self.clone()
        }
    }

    pub(super) fn with_super(&self, chain: Arc<[BlockEntry]>) -> Scope {
        Scope {
            super_chain: Some(chain),
            ..self.clone()
        }
    }

    pub(super) fn with_loop(&self, vars: LoopVars) -> Scope {
        Scope {
            loop_vars: Some(Arc::new(vars)),
            ..self.clone()
        }
    }
}

/// Names of the `index` and `collection` parameters of a loop callback.
#[derive(Debug)]
pub(super) struct LoopVars {
    pub index: String,
    pub collection: String,
}

impl LoopVars {
    /// JavaScript for `loop.<attr>`, if `attr` is loop metadata.
    pub(super) fn metadata(&self, attr: &str) -> Option<String> {
        let LoopVars { index: i, collection: c } = self;
        Some(match attr {
            "index" => format!("({i} + 1)"),
            "index0" => i.clone(),
            "first" => format!("({i} === 0)"),
            "last" => format!("({i} === {c}.length - 1)"),
            "length" => format!("{c}.length"),
            "revindex" => format!("({c}.length - {i})"),
            "revindex0" => format!("({c}.length - {i} - 1)"),
            _ => return None,
        })
    }
}

/// Names bound as JavaScript locals rather than looked up on the context.
#[derive(Debug, Clone, Default)]
pub(super) struct StoredNames(HashSet<String>);

impl StoredNames {
    pub(super) fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub(super) fn insert(&mut self, name: &str) {
        self.0.insert(name.to_string());
    }

    pub(super) fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }

    pub(super) fn snapshot(&self) -> StoredNames {
        self.clone()
    }

    pub(super) fn restore(&mut self, snapshot: StoredNames) {
        *self = snapshot;
    }
}

/// Source of `__$0`, `__$1`, ...
#[derive(Debug, Default)]
pub(super) struct TempNames {
    next: usize,
}

impl TempNames {
    pub(super) fn next(&mut self) -> String {
        let name = format!("__${}", self.next);
        self.next += 1;
        name
    }
}
