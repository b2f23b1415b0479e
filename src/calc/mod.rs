pub mod env;
mod imperative;
pub mod value;

use std::fmt;
use std::mem;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{BOOLEAN_BASE_CEILING, Limits};
use crate::diagnostics::{ErrorCode, Reporter, RsError};
use crate::parser::ast::{ArithmeticOp, Ast, LogicOp, NodeId, NodeKind, PredicateOp, QuantKind, SetOp, TextFn};
use crate::scope::LocalContext;
use crate::span::Span;
use env::{AstContext, ValueContext};
use value::{Odometer, Value};

/// Result of evaluating an expression: a value or a truth value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExpressionValue {
    Data(Value),
    Logic(bool),
}

impl fmt::Display for ExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionValue::Data(v) => write!(f, "{v}"),
            ExpressionValue::Logic(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalResult {
    pub success: bool,
    pub value: Option<ExpressionValue>,
    pub iterations: usize,
}

/// Membership test for the right side of `∈`, `∉` and `⊆`.
///
/// Power sets, products and `Z` answer membership structurally, so they
/// never have to be materialized.
enum Container {
    Finite(Vec<Value>),
    Integers,
    PowerSet(Box<Container>),
    Product(Vec<Container>),
}

impl Container {
    fn contains(&self, element: &Value) -> bool {
        match self {
            Container::Finite(set) => value::contains(set, element),
            Container::Integers => matches!(element, Value::Integer(_)),
            Container::PowerSet(base) => element.as_set().is_some_and(|items| items.iter().all(|i| base.contains(i))),
            Container::Product(factors) => match element {
                Value::Tuple(items) => {
                    items.len() == factors.len() && items.iter().zip(factors).all(|(i, f)| f.contains(i))
                }
                _ => false,
            },
        }
    }
}

/// Tree-walking evaluator over a type-checked AST.
pub struct Calculator<'c> {
    globals: &'c ValueContext,
    functions: &'c AstContext,
    limits: Limits,
    locals: LocalContext<Value>,
    iterations: usize,
    depth: usize,
    error: Option<RsError>,
    /// Outermost call being inlined; errors inside the body are reported here.
    call_site: Option<Span>,
}

impl<'c> Calculator<'c> {
    pub fn new(globals: &'c ValueContext, functions: &'c AstContext, limits: Limits) -> Self {
        Self {
            globals,
            functions,
            limits,
            locals: LocalContext::new(),
            iterations: 0,
            depth: 0,
            error: None,
            call_site: None,
        }
    }

    pub fn run(&mut self, ast: &Ast, reporter: Option<Reporter<'_>>) -> EvalResult {
        self.locals.clear();
        self.iterations = 0;
        self.depth = 0;
        self.error = None;
        self.call_site = None;

        let value = if ast.has_error() { None } else { self.eval(ast, ast.root) };
        if let (Some(reporter), Some(err)) = (reporter, &self.error) {
            reporter(err);
        }
        debug!(success = value.is_some(), iterations = self.iterations, "evaluation finished");
        EvalResult { success: value.is_some(), value, iterations: self.iterations }
    }

    /// First error of the last run.
    pub fn error(&self) -> Option<&RsError> {
        self.error.as_ref()
    }

    fn fail<T>(&mut self, code: ErrorCode, span: Span, params: Vec<String>) -> Option<T> {
        if self.error.is_none() {
            let position = self.call_site.unwrap_or(span);
            self.error = Some(RsError::with_params(code, position, params));
        }
        None
    }

    fn tick(&mut self, span: Span) -> Option<()> {
        self.iterations += 1;
        if self.iterations > self.limits.max_iterations {
            return self.fail(ErrorCode::ValueIterationsLimit, span, vec![self.limits.max_iterations.to_string()]);
        }
        Some(())
    }

    fn eval(&mut self, ast: &Ast, id: NodeId) -> Option<ExpressionValue> {
        match ast.kind(id) {
            NodeKind::Logic { .. } | NodeKind::Not(_) | NodeKind::Predicate { .. } | NodeKind::Quantifier { .. } => {
                Some(ExpressionValue::Logic(self.logic(ast, id)?))
            }
            NodeKind::Call { callee, args } => self.call(ast, id, *callee, args),
            _ => Some(ExpressionValue::Data(self.data(ast, id)?)),
        }
    }

    fn logic(&mut self, ast: &Ast, id: NodeId) -> Option<bool> {
        let span = ast.span(id);
        match ast.kind(id) {
            NodeKind::Logic { op, lhs, rhs } => {
                let l = self.logic(ast, *lhs)?;
                match op {
                    LogicOp::And if !l => Some(false),
                    LogicOp::Or if l => Some(true),
                    LogicOp::Implies if !l => Some(true),
                    LogicOp::Equiv => Some(l == self.logic(ast, *rhs)?),
                    _ => self.logic(ast, *rhs),
                }
            }
            NodeKind::Not(operand) => Some(!self.logic(ast, *operand)?),
            NodeKind::Predicate { op, lhs, rhs } => self.predicate(ast, *op, *lhs, *rhs),
            NodeKind::Quantifier { kind, binder, domain, body } => {
                self.quantifier(ast, span, *kind, *binder, *domain, *body)
            }
            NodeKind::Call { callee, args } => match self.call(ast, id, *callee, args)? {
                ExpressionValue::Logic(b) => Some(b),
                ExpressionValue::Data(_) => self.fail(ErrorCode::ExpectedLogic, span, vec!["value".to_string()]),
            },
            other => {
                let label = other.label();
                self.fail(ErrorCode::ExpectedLogic, span, vec![label])
            }
        }
    }

    fn data(&mut self, ast: &Ast, id: NodeId) -> Option<Value> {
        let span = ast.span(id);
        match ast.kind(id) {
            NodeKind::Error => None,
            NodeKind::Global(name) | NodeKind::Radical(name) => match self.globals.get(name) {
                Some(v) => Some(v.clone()),
                None => self.fail(ErrorCode::ValueGlobalMissing, span, vec![name.clone()]),
            },
            NodeKind::Local(name) => match self.locals.get(name) {
                Some(v) => Some(v.clone()),
                None => self.fail(ErrorCode::LocalUndeclared, span, vec![name.clone()]),
            },
            NodeKind::Integer(n) => Some(Value::Integer(*n)),
            NodeKind::IntegerSet => self.fail(ErrorCode::ValueIterateInfinity, span, Vec::new()),
            NodeKind::EmptySet => Some(Value::empty_set()),

            NodeKind::Arithmetic { op, lhs, rhs } => {
                let l = self.integer(ast, *lhs)?;
                let r = self.integer(ast, *rhs)?;
                let result = match op {
                    ArithmeticOp::Add => l.checked_add(r),
                    ArithmeticOp::Sub => l.checked_sub(r),
                    ArithmeticOp::Mul => l.checked_mul(r),
                };
                match result {
                    Some(n) => Some(Value::Integer(n)),
                    None => self.fail(ErrorCode::ValueArithmeticOverflow, span, Vec::new()),
                }
            }
            NodeKind::SetOperation { op, lhs, rhs } => {
                let a = self.elements(ast, *lhs)?;
                let b = self.elements(ast, *rhs)?;
                let result = match op {
                    SetOp::Union => value::union(&a, &b),
                    SetOp::Intersection => value::intersection(&a, &b),
                    SetOp::Difference => value::difference(&a, &b),
                    SetOp::SymDiff => value::symmetric_difference(&a, &b),
                };
                Some(Value::Set(result))
            }
            NodeKind::Decart(factors) => self.decart(ast, span, factors),
            NodeKind::Boolean(operand) => self.boolean(ast, span, *operand),
            NodeKind::Tuple(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for &item in items {
                    parts.push(self.data(ast, item)?);
                }
                Some(Value::Tuple(parts))
            }
            NodeKind::Enumeration(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for &item in items {
                    elements.push(self.data(ast, item)?);
                }
                Some(Value::set(elements))
            }
            NodeKind::TextOp { op, operand } => self.text_op(ast, span, *op, *operand),
            NodeKind::SmallProjection { indices, operand } => {
                let v = self.data(ast, *operand)?;
                match v.project(indices) {
                    Some(p) => Some(p),
                    None => self.fail(ErrorCode::InvalidProjectionTuple, span, vec![index_label(indices), v.to_string()]),
                }
            }
            NodeKind::BigProjection { indices, operand } => {
                let items = self.elements(ast, *operand)?;
                match items.iter().map(|t| t.project(indices)).collect::<Option<Vec<_>>>() {
                    Some(projected) => Some(Value::set(projected)),
                    None => self.fail(ErrorCode::InvalidProjectionSet, span, vec![index_label(indices)]),
                }
            }
            NodeKind::Filter { indices, params, operand } => {
                let mut containers = Vec::with_capacity(params.len());
                for &param in params {
                    containers.push(self.container(ast, param)?);
                }
                let items = self.elements(ast, *operand)?;
                // a subsequence of a canonical set is canonical
                let kept = items
                    .into_iter()
                    .filter(|t| {
                        indices.iter().zip(&containers).all(|(&i, c)| t.component(i).is_some_and(|v| c.contains(v)))
                    })
                    .collect();
                Some(Value::Set(kept))
            }

            NodeKind::Declarative { binder, domain, condition } => {
                let elements = self.elements(ast, *domain)?;
                self.locals.push_scope();
                let mut kept = Vec::new();
                for element in elements {
                    self.tick(span)?;
                    self.bind(ast, *binder, element.clone())?;
                    if self.logic(ast, *condition)? {
                        kept.push(element);
                    }
                }
                self.locals.pop_scope();
                Some(Value::set(kept))
            }
            NodeKind::Imperative { result, blocks } => self.imperative(ast, span, *result, blocks),
            NodeKind::Recursion { binder, init, condition, step } => {
                self.recursion(ast, span, *binder, *init, *condition, *step)
            }

            NodeKind::Call { callee, args } => match self.call(ast, id, *callee, args)? {
                ExpressionValue::Data(v) => Some(v),
                ExpressionValue::Logic(_) => self.fail(ErrorCode::ExpectedTyped, span, Vec::new()),
            },

            NodeKind::Logic { .. } | NodeKind::Not(_) | NodeKind::Predicate { .. } | NodeKind::Quantifier { .. } => {
                self.fail(ErrorCode::ExpectedTyped, span, Vec::new())
            }
            NodeKind::Declare(_)
            | NodeKind::TupleDeclaration(_)
            | NodeKind::EnumDeclaration(_)
            | NodeKind::IterateBlock { .. }
            | NodeKind::AssignBlock { .. }
            | NodeKind::ArgDeclaration { .. }
            | NodeKind::FunctionDefinition { .. } => {
                let label = ast.kind(id).label();
                self.fail(ErrorCode::UnexpectedExpressionType, span, vec!["value".to_string(), label])
            }
        }
    }

    fn integer(&mut self, ast: &Ast, id: NodeId) -> Option<i64> {
        let v = self.data(ast, id)?;
        match v.as_integer() {
            Some(n) => Some(n),
            None => self.fail(ErrorCode::ArithmeticNotSupported, ast.span(id), vec![v.to_string()]),
        }
    }

    /// Evaluate a set-valued operand into its sorted elements.
    fn elements(&mut self, ast: &Ast, id: NodeId) -> Option<Vec<Value>> {
        let v = self.data(ast, id)?;
        match v {
            Value::Set(items) => Some(items),
            other => self.fail(ErrorCode::InvalidTypeOperation, ast.span(id), vec![other.to_string()]),
        }
    }

    fn container(&mut self, ast: &Ast, id: NodeId) -> Option<Container> {
        match ast.kind(id) {
            NodeKind::IntegerSet => Some(Container::Integers),
            NodeKind::Boolean(inner) => Some(Container::PowerSet(Box::new(self.container(ast, *inner)?))),
            NodeKind::Decart(factors) => {
                let mut parts = Vec::with_capacity(factors.len());
                for &factor in factors {
                    parts.push(self.container(ast, factor)?);
                }
                Some(Container::Product(parts))
            }
            _ => Some(Container::Finite(self.elements(ast, id)?)),
        }
    }

    fn predicate(&mut self, ast: &Ast, op: PredicateOp, lhs: NodeId, rhs: NodeId) -> Option<bool> {
        match op {
            PredicateOp::Eq | PredicateOp::NotEq => {
                let l = self.data(ast, lhs)?;
                let r = self.data(ast, rhs)?;
                Some((l == r) == (op == PredicateOp::Eq))
            }
            PredicateOp::In | PredicateOp::NotIn => {
                let element = self.data(ast, lhs)?;
                let set = self.container(ast, rhs)?;
                Some(set.contains(&element) == (op == PredicateOp::In))
            }
            PredicateOp::SubsetOrEq | PredicateOp::NotSubset => {
                let items = self.elements(ast, lhs)?;
                let subset = match self.container(ast, rhs)? {
                    Container::Finite(superset) => value::is_subset(&items, &superset),
                    other => items.iter().all(|i| other.contains(i)),
                };
                Some(subset == (op == PredicateOp::SubsetOrEq))
            }
            PredicateOp::Subset => {
                let a = self.elements(ast, lhs)?;
                let b = self.elements(ast, rhs)?;
                Some(a.len() < b.len() && value::is_subset(&a, &b))
            }
            PredicateOp::Lt | PredicateOp::Gt | PredicateOp::LtEq | PredicateOp::GtEq => {
                let l = self.data(ast, lhs)?;
                let r = self.data(ast, rhs)?;
                Some(match op {
                    PredicateOp::Lt => l < r,
                    PredicateOp::Gt => l > r,
                    PredicateOp::LtEq => l <= r,
                    _ => l >= r,
                })
            }
        }
    }

    fn quantifier(
        &mut self,
        ast: &Ast,
        span: Span,
        kind: QuantKind,
        binder: NodeId,
        domain: NodeId,
        body: NodeId,
    ) -> Option<bool> {
        let elements = self.elements(ast, domain)?;
        // `∀a,b∈X` ranges over X×X
        let binders = match ast.kind(binder) {
            NodeKind::EnumDeclaration(items) => items.clone(),
            _ => vec![binder],
        };
        let stop_on = kind == QuantKind::Exists;
        let mut odometer = Odometer::new(vec![elements.len(); binders.len()]);

        self.locals.push_scope();
        let mut result = !stop_on;
        while let Some(digits) = odometer.current() {
            self.tick(span)?;
            for (&b, &d) in binders.iter().zip(digits) {
                self.bind(ast, b, elements[d].clone())?;
            }
            if self.logic(ast, body)? == stop_on {
                result = stop_on;
                break;
            }
            odometer.advance();
        }
        self.locals.pop_scope();
        Some(result)
    }

    fn decart(&mut self, ast: &Ast, span: Span, factors: &[NodeId]) -> Option<Value> {
        let mut sets = Vec::with_capacity(factors.len());
        for &factor in factors {
            sets.push(self.elements(ast, factor)?);
        }
        let limit = self.limits.max_set_cardinality;
        let cardinality = sets.iter().try_fold(1usize, |acc, s| acc.checked_mul(s.len()));
        if cardinality.is_none_or(|n| n > limit) {
            return self.fail(ErrorCode::ValueTypedOverflow, span, vec![limit.to_string()]);
        }

        // factors are sorted, so odometer order is canonical tuple order
        let mut tuples = Vec::with_capacity(cardinality.unwrap_or(0));
        let mut odometer = Odometer::new(sets.iter().map(Vec::len).collect());
        while let Some(digits) = odometer.current() {
            tuples.push(Value::Tuple(digits.iter().zip(&sets).map(|(&d, s)| s[d].clone()).collect()));
            odometer.advance();
        }
        Some(Value::Set(tuples))
    }

    fn boolean(&mut self, ast: &Ast, span: Span, operand: NodeId) -> Option<Value> {
        let base = self.elements(ast, operand)?;
        let limit = self.limits.max_boolean_base.min(BOOLEAN_BASE_CEILING);
        if base.len() > limit {
            return self.fail(ErrorCode::ValueBooleanLimit, span, vec![limit.to_string()]);
        }
        let subsets = (0..1u64 << base.len())
            .map(|mask| {
                let members = base.iter().enumerate().filter(|(i, _)| mask & (1u64 << i) != 0).map(|(_, v)| v.clone());
                Value::Set(members.collect())
            })
            .collect();
        Some(Value::set(subsets))
    }

    fn text_op(&mut self, ast: &Ast, span: Span, op: TextFn, operand: NodeId) -> Option<Value> {
        if op == TextFn::Bool {
            return Some(Value::singleton(self.data(ast, operand)?));
        }
        let items = self.elements(ast, operand)?;
        match op {
            TextFn::Card => match i64::try_from(items.len()) {
                Ok(n) => Some(Value::Integer(n)),
                Err(_) => self.fail(ErrorCode::ValueArithmeticOverflow, span, Vec::new()),
            },
            TextFn::Debool => {
                if items.len() != 1 {
                    return self.fail(ErrorCode::ValueInvalidDebool, span, vec![items.len().to_string()]);
                }
                items.into_iter().next()
            }
            _ => {
                let mut result = Vec::new();
                for item in &items {
                    match item.as_set() {
                        Some(inner) => result = value::union(&result, inner),
                        None => return self.fail(ErrorCode::InvalidReduce, span, vec![item.to_string()]),
                    }
                }
                Some(Value::Set(result))
            }
        }
    }

    fn recursion(
        &mut self,
        ast: &Ast,
        span: Span,
        binder: NodeId,
        init: NodeId,
        condition: Option<NodeId>,
        step: NodeId,
    ) -> Option<Value> {
        let mut current = self.data(ast, init)?;
        self.locals.push_scope();
        loop {
            self.tick(span)?;
            self.bind(ast, binder, current.clone())?;
            if let Some(condition) = condition {
                if !self.logic(ast, condition)? {
                    break;
                }
            }
            let next = self.data(ast, step)?;
            if condition.is_none() && next == current {
                break;
            }
            trace!(value = %next, "recursion step");
            current = next;
        }
        self.locals.pop_scope();
        Some(current)
    }

    /// Inline a function or predicate body with its arguments bound.
    fn call(&mut self, ast: &Ast, id: NodeId, callee: NodeId, args: &[NodeId]) -> Option<ExpressionValue> {
        let span = ast.span(id);
        let NodeKind::Global(name) = ast.kind(callee) else {
            let label = ast.kind(callee).label();
            return self.fail(ErrorCode::ValueFunctionMissing, span, vec![label]);
        };
        let functions = self.functions;
        let Some(definition) = functions.get(name) else {
            return self.fail(ErrorCode::ValueFunctionMissing, span, vec![name.clone()]);
        };
        let NodeKind::FunctionDefinition { args: params, body } = definition.kind(definition.root) else {
            return self.fail(ErrorCode::ValueFunctionMissing, span, vec![name.clone()]);
        };
        if params.len() != args.len() {
            let counts = vec![params.len().to_string(), args.len().to_string()];
            return self.fail(ErrorCode::InvalidArgsArity, span, counts);
        }

        let mut actual = Vec::with_capacity(args.len());
        for &arg in args {
            actual.push(self.data(ast, arg)?);
        }
        self.tick(span)?;
        if self.depth >= self.limits.max_call_depth {
            let limit = self.limits.max_call_depth.to_string();
            return self.fail(ErrorCode::ValueIterationsLimit, span, vec![limit]);
        }

        let outer = mem::take(&mut self.locals);
        let entered = self.call_site.is_none();
        if entered {
            self.call_site = Some(span);
        }
        self.locals.push_scope();
        self.depth += 1;

        let mut bound = Some(());
        for (&param, value) in params.iter().zip(actual) {
            bound = match definition.kind(param) {
                NodeKind::ArgDeclaration { binder, .. } => self.bind(definition, *binder, value),
                _ => self.fail(ErrorCode::ExpectedArgDeclaration, definition.span(param), Vec::new()),
            };
            if bound.is_none() {
                break;
            }
        }
        let result = bound.and_then(|()| self.eval(definition, *body));

        self.depth -= 1;
        self.locals = outer;
        if entered {
            self.call_site = None;
        }
        result
    }

    /// Bind the locals of `binder` to `value`, destructuring tuples.
    fn bind(&mut self, ast: &Ast, binder: NodeId, value: Value) -> Option<()> {
        let span = ast.span(binder);
        match ast.kind(binder) {
            NodeKind::Declare(name) => {
                if !self.locals.assign(name, value.clone()) {
                    self.locals.declare(name, value, span);
                }
                Some(())
            }
            NodeKind::TupleDeclaration(items) => {
                let parts = match value {
                    Value::Tuple(parts) if parts.len() == items.len() => parts,
                    other => return self.fail(ErrorCode::InvalidBinding, span, vec![other.to_string()]),
                };
                for (&item, part) in items.iter().zip(parts) {
                    self.bind(ast, item, part)?;
                }
                Some(())
            }
            NodeKind::EnumDeclaration(items) => {
                for &item in items {
                    self.bind(ast, item, value.clone())?;
                }
                Some(())
            }
            _ => self.fail(ErrorCode::ExpectedLocal, span, Vec::new()),
        }
    }
}

fn index_label(indices: &[usize]) -> String {
    indices.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}
