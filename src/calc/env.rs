use std::collections::HashMap;

use crate::parser::ast::Ast;

use super::value::Value;

/// Global name to concrete value.
#[derive(Debug, Clone, Default)]
pub struct ValueContext {
    values: HashMap<String, Value>,
}

impl ValueContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, alias: &str, value: Value) {
        self.values.insert(alias.to_string(), value);
    }

    pub fn remove(&mut self, alias: &str) -> Option<Value> {
        self.values.remove(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.values.get(alias)
    }
}

/// Function and predicate name to its normalized definition, inlined at call
/// sites by the calculator.
#[derive(Debug, Clone, Default)]
pub struct AstContext {
    definitions: HashMap<String, Ast>,
}

impl AstContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, alias: &str, ast: Ast) {
        self.definitions.insert(alias.to_string(), ast);
    }

    pub fn remove(&mut self, alias: &str) -> Option<Ast> {
        self.definitions.remove(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&Ast> {
        self.definitions.get(alias)
    }
}
