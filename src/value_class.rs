use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{ErrorCode, Reporter, RsError};
use crate::parser::ast::{Ast, NodeId, NodeKind, PredicateOp};

/// Whether an expression denotes a concrete enumerable value or only defines
/// a set by a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueClass {
    Value,
    Property,
}

impl ValueClass {
    fn join(self, other: ValueClass) -> ValueClass {
        if self == ValueClass::Value && other == ValueClass::Value { ValueClass::Value } else { ValueClass::Property }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueClass::Value => write!(f, "value"),
            ValueClass::Property => write!(f, "property"),
        }
    }
}

/// Global name to value class.
#[derive(Debug, Clone, Default)]
pub struct ValueClassContext {
    classes: HashMap<String, ValueClass>,
}

impl ValueClassContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, alias: &str, class: ValueClass) {
        self.classes.insert(alias.to_string(), class);
    }

    pub fn remove(&mut self, alias: &str) -> Option<ValueClass> {
        self.classes.remove(alias)
    }

    pub fn get(&self, alias: &str) -> Option<ValueClass> {
        self.classes.get(alias).copied()
    }
}

/// Classifies a well-typed AST as computable (`Value`) or not (`Property`).
pub struct ValueAuditor<'c> {
    context: &'c ValueClassContext,
    error: Option<RsError>,
}

impl<'c> ValueAuditor<'c> {
    pub fn new(context: &'c ValueClassContext) -> Self {
        Self { context, error: None }
    }

    pub fn run(&mut self, ast: &Ast, reporter: Option<Reporter<'_>>) -> Option<ValueClass> {
        self.error = None;
        if ast.has_error() {
            return None;
        }
        let result = self.visit(ast, ast.root);
        if let (Some(reporter), Some(err)) = (reporter, &self.error) {
            reporter(err);
        }
        result
    }

    pub fn error(&self) -> Option<&RsError> {
        self.error.as_ref()
    }

    fn fail<T>(&mut self, err: RsError) -> Option<T> {
        self.error = Some(err);
        None
    }

    /// Visit `id` and demand a concrete value.
    fn value(&mut self, ast: &Ast, id: NodeId) -> Option<()> {
        match self.visit(ast, id)? {
            ValueClass::Value => Some(()),
            ValueClass::Property => self.fail(RsError::at(ErrorCode::InvalidPropertyUsage, ast.span(id))),
        }
    }

    fn values(&mut self, ast: &Ast, ids: &[NodeId]) -> Option<ValueClass> {
        for &id in ids {
            self.value(ast, id)?;
        }
        Some(ValueClass::Value)
    }

    fn visit(&mut self, ast: &Ast, id: NodeId) -> Option<ValueClass> {
        use ValueClass::*;
        match ast.kind(id) {
            NodeKind::Error => None,
            NodeKind::Global(name) => match self.context.get(name) {
                Some(class) => Some(class),
                None => self.fail(RsError::with_param(ErrorCode::GlobalNoValue, ast.span(id), name.clone())),
            },
            NodeKind::Radical(_) | NodeKind::IntegerSet => Some(Property),
            NodeKind::Local(_) | NodeKind::Integer(_) | NodeKind::EmptySet => Some(Value),
            NodeKind::Declare(_) | NodeKind::TupleDeclaration(_) | NodeKind::EnumDeclaration(_) => Some(Value),

            NodeKind::Logic { lhs, rhs, .. } => self.values(ast, &[*lhs, *rhs]),
            NodeKind::Not(operand) => self.values(ast, &[*operand]),
            NodeKind::Predicate { op, lhs, rhs } => {
                self.value(ast, *lhs)?;
                // membership is decided without enumerating the right side
                if op.is_membership() || matches!(op, PredicateOp::SubsetOrEq | PredicateOp::Subset | PredicateOp::NotSubset) {
                    self.visit(ast, *rhs)?;
                } else {
                    self.value(ast, *rhs)?;
                }
                Some(Value)
            }
            NodeKind::Quantifier { domain, body, .. } => self.values(ast, &[*domain, *body]),

            NodeKind::Arithmetic { lhs, rhs, .. } => self.values(ast, &[*lhs, *rhs]),
            NodeKind::SetOperation { lhs, rhs, .. } => {
                let l = self.visit(ast, *lhs)?;
                let r = self.visit(ast, *rhs)?;
                Some(l.join(r))
            }
            NodeKind::Decart(factors) => {
                let mut class = Value;
                for &factor in factors {
                    class = class.join(self.visit(ast, factor)?);
                }
                Some(class)
            }
            NodeKind::Boolean(operand) => {
                self.visit(ast, *operand)?;
                Some(Property)
            }
            NodeKind::Tuple(items) | NodeKind::Enumeration(items) => self.values(ast, items),
            NodeKind::TextOp { operand, .. }
            | NodeKind::SmallProjection { operand, .. }
            | NodeKind::BigProjection { operand, .. } => self.values(ast, &[*operand]),
            NodeKind::Filter { params, operand, .. } => {
                for &param in params {
                    self.visit(ast, param)?;
                }
                self.values(ast, &[*operand])
            }

            NodeKind::Declarative { domain, condition, .. } => {
                let class = self.visit(ast, *domain)?;
                self.value(ast, *condition)?;
                Some(class)
            }
            NodeKind::Imperative { result, blocks } => {
                for &block in blocks {
                    match ast.kind(block) {
                        NodeKind::IterateBlock { domain, .. } => self.value(ast, *domain)?,
                        NodeKind::AssignBlock { value, .. } => self.value(ast, *value)?,
                        _ => self.value(ast, block)?,
                    }
                }
                self.values(ast, &[*result])
            }
            NodeKind::IterateBlock { domain, .. } => self.values(ast, &[*domain]),
            NodeKind::AssignBlock { value, .. } => self.values(ast, &[*value]),
            NodeKind::Recursion { init, condition, step, .. } => {
                self.value(ast, *init)?;
                if let Some(condition) = condition {
                    self.value(ast, *condition)?;
                }
                self.values(ast, &[*step])
            }

            NodeKind::FunctionDefinition { args, body } => {
                for &arg in args {
                    self.visit(ast, arg)?;
                }
                self.visit(ast, *body)
            }
            NodeKind::ArgDeclaration { domain, .. } => {
                self.visit(ast, *domain)?;
                Some(Value)
            }
            NodeKind::Call { callee, args } => {
                self.values(ast, args)?;
                let result = match ast.kind(*callee) {
                    NodeKind::Global(name) => self.context.get(name),
                    _ => None,
                };
                Some(result.unwrap_or(Value))
            }
        }
    }
}
