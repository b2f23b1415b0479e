pub mod env;
pub mod resolve;
pub mod types;

use std::collections::HashMap;

use tracing::trace;

use crate::diagnostics::{ErrorCode, Reporter, RsError};
use crate::parser::ast::{Ast, NodeId, NodeKind, PredicateOp, TextFn};
use crate::scope::{Declared, LocalContext};
use env::TypeContext;
use resolve::unify;
use types::{compatible, merge, Callable, CallableKind, ExprType, FunctionArg, Typification};

/// Static type checker over a normalized AST.
///
/// One auditor may be reused for several runs; all per-run state is reset at
/// the start of [`TypeAuditor::run`].
pub struct TypeAuditor<'c> {
    context: &'c TypeContext,
    recursion_retries: usize,
    locals: LocalContext<Typification>,
    node_types: Vec<Option<ExprType>>,
    errors: Vec<RsError>,
    call_sites: usize,
}

impl<'c> TypeAuditor<'c> {
    pub fn new(context: &'c TypeContext, recursion_retries: usize) -> Self {
        Self {
            context,
            recursion_retries,
            locals: LocalContext::new(),
            node_types: Vec::new(),
            errors: Vec::new(),
            call_sites: 0,
        }
    }

    /// Type the whole expression. Returns `None` after the first critical
    /// error; advisory errors are reported but do not fail the run.
    pub fn run(&mut self, ast: &Ast, reporter: Option<Reporter<'_>>) -> Option<ExprType> {
        self.locals.clear();
        self.errors.clear();
        self.call_sites = 0;
        self.node_types = vec![None; ast.nodes.len()];

        let result = if ast.has_error() { None } else { self.visit(ast, ast.root) };

        if let Some(reporter) = reporter {
            for err in &self.errors {
                reporter(err);
            }
        }
        result
    }

    /// Errors reported by the last run, in order.
    pub fn errors(&self) -> &[RsError] {
        &self.errors
    }

    /// Type assigned to `id` by the last run.
    pub fn type_of(&self, id: NodeId) -> Option<&ExprType> {
        self.node_types.get(id).and_then(Option::as_ref)
    }

    fn fail<T>(&mut self, err: RsError) -> Option<T> {
        self.errors.push(err);
        None
    }

    fn visit(&mut self, ast: &Ast, id: NodeId) -> Option<ExprType> {
        let result = self.visit_node(ast, id)?;
        self.node_types[id] = Some(result.clone());
        Some(result)
    }

    fn visit_node(&mut self, ast: &Ast, id: NodeId) -> Option<ExprType> {
        let span = ast.span(id);
        let context = self.context;
        match ast.kind(id) {
            NodeKind::Error => None,

            NodeKind::Global(name) => match context.get(name) {
                None => self.fail(RsError::with_param(ErrorCode::GlobalNotTyped, span, name.clone())),
                Some(ExprType::Callable(_)) => {
                    self.fail(RsError::with_param(ErrorCode::GlobalFuncWithoutArgs, span, name.clone()))
                }
                Some(typ) => Some(typ.clone()),
            },
            NodeKind::Radical(name) => {
                let in_args = ast.ancestors(id).any(|a| matches!(ast.kind(a), NodeKind::ArgDeclaration { .. }));
                if !in_args {
                    return self.fail(RsError::with_param(ErrorCode::RadicalUsage, span, name.clone()));
                }
                Some(Typification::bool(Typification::basic(name.clone())).into())
            }
            NodeKind::Local(name) => match self.locals.get(name).cloned() {
                Some(t) => Some(t.into()),
                None if self.locals.is_closed(name) => {
                    self.fail(RsError::with_param(ErrorCode::LocalOutOfScope, span, name.clone()))
                }
                None => self.fail(RsError::with_param(ErrorCode::LocalUndeclared, span, name.clone())),
            },
            NodeKind::Integer(_) => Some(Typification::Integer.into()),
            NodeKind::IntegerSet => Some(Typification::bool(Typification::Integer).into()),
            NodeKind::EmptySet => {
                if ast.parent(id).is_some_and(|p| forbids_empty_set(ast.kind(p), id)) {
                    return self.fail(RsError::at(ErrorCode::InvalidEmptySetUsage, span));
                }
                Some(Typification::empty_set().into())
            }

            // binders are typed by the construct that owns them
            NodeKind::Declare(_) | NodeKind::TupleDeclaration(_) | NodeKind::EnumDeclaration(_) => None,
            NodeKind::IterateBlock { .. } | NodeKind::AssignBlock { .. } | NodeKind::ArgDeclaration { .. } => None,

            NodeKind::Logic { lhs, rhs, .. } => {
                self.logic(ast, *lhs)?;
                self.logic(ast, *rhs)?;
                Some(ExprType::Logic)
            }
            NodeKind::Not(operand) => {
                self.logic(ast, *operand)?;
                Some(ExprType::Logic)
            }
            NodeKind::Predicate { op, lhs, rhs } => self.visit_predicate(ast, *op, *lhs, *rhs),
            NodeKind::Quantifier { binder, domain, body, .. } => {
                let (_, element) = self.collection(ast, *domain, ErrorCode::InvalidBinding)?;
                self.locals.push_scope();
                self.declare(ast, *binder, &element)?;
                self.logic(ast, *body)?;
                self.close_scope();
                Some(ExprType::Logic)
            }

            NodeKind::Arithmetic { lhs, rhs, .. } => {
                let l = self.typed(ast, *lhs)?;
                let r = self.typed(ast, *rhs)?;
                for (t, node) in [(&l, *lhs), (&r, *rhs)] {
                    if !t.is_arithmetic() {
                        return self.fail(RsError::with_param(ErrorCode::ArithmeticNotSupported, ast.span(node), t.to_string()));
                    }
                }
                match merge(&l, &r) {
                    Some(t) => Some(t.into()),
                    None => self.fail(RsError::with_params(ErrorCode::TypesNotCompatible, span, vec![l.to_string(), r.to_string()])),
                }
            }
            NodeKind::SetOperation { lhs, rhs, .. } => {
                let (l, _) = self.collection(ast, *lhs, ErrorCode::InvalidTypeOperation)?;
                let (r, _) = self.collection(ast, *rhs, ErrorCode::InvalidTypeOperation)?;
                match merge(&l, &r) {
                    Some(t) => Some(t.into()),
                    None => self.fail(RsError::with_params(ErrorCode::TypesNotEqual, span, vec![l.to_string(), r.to_string()])),
                }
            }
            NodeKind::Decart(factors) => {
                let mut elements = Vec::with_capacity(factors.len());
                for &factor in factors {
                    let (_, element) = self.collection(ast, factor, ErrorCode::InvalidDecart)?;
                    elements.push(element);
                }
                Some(Typification::bool(Typification::Tuple(elements)).into())
            }
            NodeKind::Boolean(operand) => {
                let (t, _) = self.collection(ast, *operand, ErrorCode::InvalidBoolean)?;
                Some(Typification::bool(t).into())
            }
            NodeKind::Tuple(items) => {
                let mut factors = Vec::with_capacity(items.len());
                for &item in items {
                    factors.push(self.typed(ast, item)?);
                }
                Some(Typification::Tuple(factors).into())
            }
            NodeKind::Enumeration(items) => {
                let mut element = Typification::Any;
                for &item in items {
                    let t = self.typed(ast, item)?;
                    element = match merge(&element, &t) {
                        Some(m) => m,
                        None => {
                            let params = vec![element.to_string(), t.to_string()];
                            return self.fail(RsError::with_params(ErrorCode::InvalidEnumeration, ast.span(item), params));
                        }
                    };
                }
                Some(Typification::bool(element).into())
            }
            NodeKind::TextOp { op, operand } => self.visit_text_op(ast, *op, *operand),
            NodeKind::SmallProjection { indices, operand } => {
                let t = self.typed(ast, *operand)?;
                match project(&t, indices) {
                    Some(p) => Some(p.into()),
                    None => self.fail(RsError::with_params(
                        ErrorCode::InvalidProjectionTuple,
                        span,
                        vec![index_label(indices), t.to_string()],
                    )),
                }
            }
            NodeKind::BigProjection { indices, operand } => {
                let t = self.typed(ast, *operand)?;
                match t.debool().and_then(|e| project(e, indices)) {
                    Some(p) => Some(Typification::bool(p).into()),
                    None => self.fail(RsError::with_params(
                        ErrorCode::InvalidProjectionSet,
                        span,
                        vec![index_label(indices), t.to_string()],
                    )),
                }
            }
            NodeKind::Filter { indices, params, operand } => self.visit_filter(ast, id, indices, params, *operand),

            NodeKind::Declarative { binder, domain, condition } => {
                let (set, element) = self.collection(ast, *domain, ErrorCode::InvalidBinding)?;
                self.locals.push_scope();
                self.declare(ast, *binder, &element)?;
                self.logic(ast, *condition)?;
                self.close_scope();
                Some(set.into())
            }
            NodeKind::Imperative { result, blocks } => {
                self.locals.push_scope();
                for &block in blocks {
                    match ast.kind(block) {
                        NodeKind::IterateBlock { binder, domain } => {
                            let (_, element) = self.collection(ast, *domain, ErrorCode::InvalidBinding)?;
                            self.declare(ast, *binder, &element)?;
                        }
                        NodeKind::AssignBlock { binder, value } => {
                            let t = self.typed(ast, *value)?;
                            self.declare(ast, *binder, &t)?;
                        }
                        _ => self.logic(ast, block)?,
                    }
                }
                let element = self.typed(ast, *result)?;
                self.close_scope();
                Some(Typification::bool(element).into())
            }
            NodeKind::Recursion { binder, init, condition, step } => {
                self.visit_recursion(ast, *binder, *init, *condition, *step)
            }

            NodeKind::FunctionDefinition { args, body } => {
                self.locals.push_scope();
                let mut signature = Vec::with_capacity(args.len());
                for &arg in args {
                    let NodeKind::ArgDeclaration { binder, domain } = ast.kind(arg) else {
                        return self.fail(RsError::at(ErrorCode::ExpectedArgDeclaration, ast.span(arg)));
                    };
                    let (_, element) = self.collection(ast, *domain, ErrorCode::InvalidBinding)?;
                    self.declare(ast, *binder, &element)?;
                    let alias = ast.declared_names(*binder).into_iter().map(|(n, _)| n).collect::<Vec<_>>().join(",");
                    signature.push(FunctionArg { alias, typ: element });
                }
                let callable = match self.visit(ast, *body)? {
                    ExprType::Logic => Callable { kind: CallableKind::Predicate, args: signature, result: None },
                    ExprType::Typed(t) => Callable { kind: CallableKind::Function, args: signature, result: Some(t) },
                    ExprType::Callable(_) => return self.fail(RsError::at(ErrorCode::ExpectedTyped, ast.span(*body))),
                };
                self.close_scope();
                Some(ExprType::Callable(callable))
            }
            NodeKind::Call { callee, args } => self.visit_call(ast, id, *callee, args),
        }
    }

    fn visit_predicate(&mut self, ast: &Ast, op: PredicateOp, lhs: NodeId, rhs: NodeId) -> Option<ExprType> {
        let span = ast.span(lhs).join(ast.span(rhs));
        let l = self.typed(ast, lhs)?;
        let r = self.typed(ast, rhs)?;

        if op.is_membership() {
            let fits = r.debool().is_some_and(|element| compatible(&l, element));
            if !fits {
                let params = vec![l.to_string(), r.to_string()];
                return self.fail(RsError::with_params(ErrorCode::InvalidElementPredicate, span, params));
            }
        } else if op.is_subset() {
            for (t, node) in [(&l, lhs), (&r, rhs)] {
                if t.debool().is_none() {
                    return self.fail(RsError::with_param(ErrorCode::InvalidTypeOperation, ast.span(node), t.to_string()));
                }
            }
            if !compatible(&l, &r) {
                return self.fail(RsError::with_params(ErrorCode::TypesNotEqual, span, vec![l.to_string(), r.to_string()]));
            }
        } else if op.is_ordering() {
            for (t, node) in [(&l, lhs), (&r, rhs)] {
                if !t.is_ordered() {
                    return self.fail(RsError::with_param(ErrorCode::OrderingNotSupported, ast.span(node), t.to_string()));
                }
            }
            if !compatible(&l, &r) {
                return self.fail(RsError::with_params(ErrorCode::TypesNotCompatible, span, vec![l.to_string(), r.to_string()]));
            }
        } else if !compatible(&l, &r) {
            return self.fail(RsError::with_params(ErrorCode::TypesNotEqual, span, vec![l.to_string(), r.to_string()]));
        }
        Some(ExprType::Logic)
    }

    fn visit_text_op(&mut self, ast: &Ast, op: TextFn, operand: NodeId) -> Option<ExprType> {
        let span = ast.span(operand);
        let t = self.typed(ast, operand)?;
        let result = match op {
            TextFn::Bool => Some(Typification::bool(t.clone())),
            TextFn::Card => t.debool().map(|_| Typification::Integer),
            TextFn::Debool => t.debool().cloned(),
            TextFn::Reduce => t.debool().and_then(|inner| inner.debool()).map(|e| Typification::bool(e.clone())),
        };
        match result {
            Some(r) => Some(r.into()),
            None => {
                let code = match op {
                    TextFn::Card => ErrorCode::InvalidCard,
                    TextFn::Debool => ErrorCode::InvalidDebool,
                    _ => ErrorCode::InvalidReduce,
                };
                self.fail(RsError::with_param(code, span, t.to_string()))
            }
        }
    }

    fn visit_filter(&mut self, ast: &Ast, id: NodeId, indices: &[usize], params: &[NodeId], operand: NodeId) -> Option<ExprType> {
        let span = ast.span(id);
        let t = self.typed(ast, operand)?;
        let factors = match t.debool() {
            Some(Typification::Tuple(factors)) if indices.iter().all(|&i| i >= 1 && i <= factors.len()) => factors.clone(),
            Some(Typification::Any) => Vec::new(),
            _ => {
                let params = vec![index_label(indices), t.to_string()];
                return self.fail(RsError::with_params(ErrorCode::InvalidFilterArgumentType, span, params));
            }
        };
        if params.len() != indices.len() {
            let counts = vec![indices.len().to_string(), params.len().to_string()];
            return self.fail(RsError::with_params(ErrorCode::InvalidFilterArity, span, counts));
        }
        for (&param, &index) in params.iter().zip(indices) {
            let (p, element) = self.collection(ast, param, ErrorCode::InvalidFilterArgumentType)?;
            let expected = factors.get(index - 1).cloned().unwrap_or(Typification::Any);
            if !compatible(&element, &expected) {
                let params = vec![index.to_string(), p.to_string()];
                return self.fail(RsError::with_params(ErrorCode::InvalidFilterArgumentType, ast.span(param), params));
            }
        }
        Some(t.into())
    }

    fn visit_recursion(
        &mut self,
        ast: &Ast,
        binder: NodeId,
        init: NodeId,
        condition: Option<NodeId>,
        step: NodeId,
    ) -> Option<ExprType> {
        let mut current = self.typed(ast, init)?;
        let snapshot = self.locals.clone();
        let reported = self.errors.len();

        for attempt in 0..=self.recursion_retries {
            self.locals.push_scope();
            self.declare(ast, binder, &current)?;
            if let Some(condition) = condition {
                self.logic(ast, condition)?;
            }
            let next = self.typed(ast, step)?;
            self.close_scope();

            let Some(merged) = merge(&current, &next) else {
                let params = vec![current.to_string(), next.to_string()];
                return self.fail(RsError::with_params(ErrorCode::TypesNotEqual, ast.span(step), params));
            };
            if merged == current || !current.is_partial() || attempt == self.recursion_retries {
                return Some(merged.into());
            }
            trace!(attempt, from = %current, to = %merged, "recursion type not yet stable");
            current = merged;
            // replay the body with the refined type
            self.locals = snapshot.clone();
            self.errors.truncate(reported);
        }
        Some(current.into())
    }

    fn visit_call(&mut self, ast: &Ast, id: NodeId, callee: NodeId, args: &[NodeId]) -> Option<ExprType> {
        let span = ast.span(id);
        let NodeKind::Global(name) = ast.kind(callee) else {
            return self.fail(RsError::with_param(ErrorCode::GlobalFuncMissing, ast.span(callee), ast.kind(callee).label()));
        };
        let Some(ExprType::Callable(signature)) = self.context.get(name).cloned() else {
            return self.fail(RsError::with_param(ErrorCode::GlobalFuncMissing, ast.span(callee), name.clone()));
        };
        self.node_types[callee] = Some(ExprType::Callable(signature.clone()));

        if signature.args.len() != args.len() {
            let counts = vec![signature.args.len().to_string(), args.len().to_string()];
            return self.fail(RsError::with_params(ErrorCode::InvalidArgsArity, span, counts));
        }

        self.call_sites += 1;
        let suffix = self.call_sites.to_string();
        let mut bindings = HashMap::new();
        for (i, (declared, &arg)) in signature.args.iter().zip(args).enumerate() {
            let actual = self.typed(ast, arg)?;
            let pattern = declared.typ.mangle(&suffix);
            if !unify(&pattern, &actual, &mut bindings) {
                let params = vec![(i + 1).to_string(), declared.typ.to_string(), actual.to_string()];
                return self.fail(RsError::with_params(ErrorCode::InvalidArgumentType, ast.span(arg), params));
            }
        }

        match signature.result {
            None => Some(ExprType::Logic),
            Some(result) => Some(result.mangle(&suffix).substitute(&bindings).erase_unbound().into()),
        }
    }

    // ---- helpers ---------------------------------------------------------

    fn typed(&mut self, ast: &Ast, id: NodeId) -> Option<Typification> {
        match self.visit(ast, id)? {
            ExprType::Typed(t) => Some(t),
            _ => self.fail(RsError::at(ErrorCode::ExpectedTyped, ast.span(id))),
        }
    }

    fn logic(&mut self, ast: &Ast, id: NodeId) -> Option<()> {
        match self.visit(ast, id)? {
            ExprType::Logic => Some(()),
            other => self.fail(RsError::with_param(ErrorCode::ExpectedLogic, ast.span(id), other.to_string())),
        }
    }

    /// Visit a set-valued operand, returning its type and element type.
    fn collection(&mut self, ast: &Ast, id: NodeId, code: ErrorCode) -> Option<(Typification, Typification)> {
        let t = self.typed(ast, id)?;
        match t.debool().cloned() {
            Some(element) => Some((t, element)),
            None => self.fail(RsError::with_param(code, ast.span(id), t.to_string())),
        }
    }

    /// Declare the locals of `binder` with elements of type `element`.
    fn declare(&mut self, ast: &Ast, binder: NodeId, element: &Typification) -> Option<()> {
        let span = ast.span(binder);
        match ast.kind(binder) {
            NodeKind::Declare(name) => {
                let code = match self.locals.declare(name, element.clone(), span) {
                    Declared::Fresh => None,
                    Declared::Reused => Some(ErrorCode::LocalReused),
                    Declared::Shadowing => Some(ErrorCode::LocalShadowing),
                    Declared::DoubleDeclare => Some(ErrorCode::LocalDoubleDeclare),
                };
                if let Some(code) = code {
                    let err = RsError::with_param(code, span, name.clone());
                    if err.is_critical() {
                        return self.fail(err);
                    }
                    self.errors.push(err);
                }
            }
            NodeKind::TupleDeclaration(items) => {
                let factors = match element {
                    Typification::Tuple(factors) if factors.len() == items.len() => factors.clone(),
                    Typification::Any => vec![Typification::Any; items.len()],
                    _ => return self.fail(RsError::with_param(ErrorCode::InvalidBinding, span, element.to_string())),
                };
                for (&item, factor) in items.iter().zip(&factors) {
                    self.declare(ast, item, factor)?;
                }
            }
            NodeKind::EnumDeclaration(items) => {
                for &item in items {
                    self.declare(ast, item, element)?;
                }
            }
            _ => return self.fail(RsError::at(ErrorCode::ExpectedLocal, span)),
        }
        self.node_types[binder] = Some(element.clone().into());
        Some(())
    }

    fn close_scope(&mut self) {
        for var in self.locals.pop_scope() {
            self.errors.push(RsError::with_param(ErrorCode::LocalNotUsed, var.position, var.name));
        }
    }
}

/// Operands whose element type must be known; `∅` is rejected there.
fn forbids_empty_set(parent: &NodeKind, child: NodeId) -> bool {
    match parent {
        NodeKind::Filter { operand, .. } => *operand == child,
        NodeKind::Boolean(_)
        | NodeKind::Decart(_)
        | NodeKind::BigProjection { .. }
        | NodeKind::TextOp { op: TextFn::Debool | TextFn::Reduce, .. } => true,
        _ => false,
    }
}

fn project(t: &Typification, indices: &[usize]) -> Option<Typification> {
    if matches!(t, Typification::Any) {
        return Some(Typification::Any);
    }
    let Typification::Tuple(factors) = t else { return None };
    let picked = indices
        .iter()
        .map(|&i| i.checked_sub(1).and_then(|i| factors.get(i)).cloned())
        .collect::<Option<Vec<_>>>()?;
    if picked.len() == 1 {
        picked.into_iter().next()
    } else {
        Some(Typification::Tuple(picked))
    }
}

fn index_label(indices: &[usize]) -> String {
    indices.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}
