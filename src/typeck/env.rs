use std::collections::HashMap;

use super::types::{BaseSet, ExprType, Typification};

/// Global name to expression type, plus the registry of basic carrier sets.
#[derive(Debug, Clone, Default)]
pub struct TypeContext {
    globals: HashMap<String, ExprType>,
    bases: HashMap<String, BaseSet>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a basic set. The global itself gets type `ℬ(alias)`.
    pub fn add_base(&mut self, alias: &str, ordered: bool) {
        let base = BaseSet { alias: alias.to_string(), ordered };
        self.globals.insert(alias.to_string(), ExprType::Typed(Typification::bool(Typification::Basic(base.clone()))));
        self.bases.insert(alias.to_string(), base);
    }

    pub fn set(&mut self, alias: &str, typ: ExprType) {
        self.globals.insert(alias.to_string(), typ);
    }

    pub fn remove(&mut self, alias: &str) -> Option<ExprType> {
        self.bases.remove(alias);
        self.globals.remove(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&ExprType> {
        self.globals.get(alias)
    }

    pub fn base(&self, alias: &str) -> Option<&BaseSet> {
        self.bases.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.globals.contains_key(alias)
    }
}
