//! The engine facade: global registration, checking and evaluation.
//!
//! An [`Engine`] owns the static contexts (types, value classes) and the
//! runtime contexts (values, function bodies). Each `check` or `evaluate`
//! call builds a fresh auditor or calculator, so one engine can serve any
//! number of sequential requests.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calc::env::{AstContext, ValueContext};
use crate::calc::value::Value;
use crate::calc::{Calculator, EvalResult, ExpressionValue};
use crate::config::{Environment, GlobalDecl, Limits};
use crate::diagnostics::{ErrorCode, Reporter, RsError};
use crate::normalize::normalize;
use crate::parser::ast::Ast;
use crate::parser::parse;
use crate::span::Span;
use crate::typeck::env::TypeContext;
use crate::typeck::resolve::resolve_typification;
use crate::typeck::types::{ExprType, TypeClass, Typification};
use crate::typeck::TypeAuditor;
use crate::value_class::{ValueAuditor, ValueClass, ValueClassContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Class the expression must have.
    pub expected: Option<TypeClass>,
    /// The expression defines a set (structure or term domain).
    pub is_domain: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub success: bool,
    #[serde(rename = "type", serialize_with = "display_opt")]
    pub ty: Option<ExprType>,
    pub value_class: Option<ValueClass>,
    pub errors: Vec<RsError>,
    #[serde(skip)]
    pub ast: Ast,
}

fn display_opt<S: serde::Serializer>(ty: &Option<ExprType>, s: S) -> Result<S::Ok, S::Error> {
    match ty {
        Some(t) => s.serialize_str(&t.to_string()),
        None => s.serialize_none(),
    }
}

/// Failure to load an environment file into an engine.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("{alias}: {source} in '{text}'")]
    Expression {
        alias: String,
        text: String,
        #[source]
        source: RsError,
    },
    #[error("{alias}: {message}")]
    Mismatch { alias: String, message: String },
}

#[derive(Debug)]
pub struct Engine {
    limits: Limits,
    types: TypeContext,
    classes: ValueClassContext,
    values: ValueContext,
    functions: AstContext,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Engine {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            types: TypeContext::new(),
            classes: ValueClassContext::new(),
            values: ValueContext::new(),
            functions: AstContext::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn values(&self) -> &ValueContext {
        &self.values
    }

    pub fn functions(&self) -> &AstContext {
        &self.functions
    }

    /// Register a basic set (`X1`) or an ordered constant set (`C1`).
    pub fn add_base(&mut self, alias: &str, ordered: bool) {
        self.types.add_base(alias, ordered);
        self.classes.set(alias, ValueClass::Value);
    }

    /// Set or clear the static facts of a global.
    pub fn set_global(&mut self, alias: &str, ty: Option<ExprType>, class: Option<ValueClass>) {
        match ty {
            Some(ty) => self.types.set(alias, ty),
            None => {
                self.types.remove(alias);
            }
        }
        match class {
            Some(class) => self.classes.set(alias, class),
            None => {
                self.classes.remove(alias);
            }
        }
    }

    pub fn set_value(&mut self, alias: &str, value: Value) {
        self.values.set(alias, value);
    }

    /// Check a function or predicate definition and register its signature,
    /// value class and body under `alias`.
    pub fn define(&mut self, alias: &str, text: &str) -> Result<ExprType, Vec<RsError>> {
        let options = CheckOptions::default();
        let result = self.check(text, options);
        if !result.success {
            return Err(result.errors);
        }
        match result.ty {
            Some(ty @ ExprType::Callable(_)) => {
                debug!(alias, signature = %ty, "definition registered");
                self.types.set(alias, ty.clone());
                self.classes.set(alias, result.value_class.unwrap_or(ValueClass::Value));
                self.functions.set(alias, result.ast);
                Ok(ty)
            }
            other => {
                let found = other.map(|t| t.class().to_string()).unwrap_or_default();
                let params = vec!["Function".to_string(), found];
                Err(vec![RsError::with_params(ErrorCode::UnexpectedExpressionType, Span::new(0, 0), params)])
            }
        }
    }

    /// Parse, type and classify an expression.
    ///
    /// Advisory errors are returned alongside a successful result. The value
    /// class is only computed for well-typed expressions.
    pub fn check(&self, text: &str, options: CheckOptions) -> CheckResult {
        let mut tree = parse(text);
        let ast = normalize(&mut tree, text);
        let mut errors = std::mem::take(&mut tree.errors);
        let failed = |errors: Vec<RsError>, ast: Ast| CheckResult { success: false, ty: None, value_class: None, errors, ast };

        if ast.has_error() || errors.iter().any(RsError::is_critical) {
            debug!(expression = text, errors = errors.len(), "syntax errors");
            return failed(errors, ast);
        }

        let mut auditor = TypeAuditor::new(&self.types, self.limits.recursion_type_retries);
        let ty = auditor.run(&ast, None);
        errors.extend_from_slice(auditor.errors());
        let Some(ty) = ty else {
            debug!(expression = text, "type check failed");
            return failed(errors, ast);
        };

        let root = ast.span(ast.root);
        if let Some(expected) = options.expected {
            if ty.class() != expected {
                let params = vec![expected.to_string(), ty.class().to_string()];
                errors.push(RsError::with_params(ErrorCode::UnexpectedExpressionType, root, params));
                return CheckResult { success: false, ty: Some(ty), value_class: None, errors, ast };
            }
        }
        if options.is_domain && !ty.typification().is_some_and(Typification::is_collection) {
            errors.push(RsError::with_param(ErrorCode::GlobalStructure, root, ty.to_string()));
            return CheckResult { success: false, ty: Some(ty), value_class: None, errors, ast };
        }

        let mut classifier = ValueAuditor::new(&self.classes);
        let value_class = classifier.run(&ast, None);
        errors.extend(classifier.error().cloned());

        debug!(expression = text, ty = %ty, ?value_class, "checked");
        CheckResult { success: value_class.is_some(), ty: Some(ty), value_class, errors, ast }
    }

    /// Evaluate a checked AST against explicit value and definition contexts.
    pub fn evaluate(
        &self,
        ast: &Ast,
        values: &ValueContext,
        functions: &AstContext,
        reporter: Option<Reporter<'_>>,
    ) -> EvalResult {
        Calculator::new(values, functions, self.limits).run(ast, reporter)
    }

    /// Check `text` and, if it is well-formed, evaluate it against the
    /// engine's own values and definitions.
    pub fn calculate(&self, text: &str) -> (CheckResult, Option<EvalResult>) {
        let mut check = self.check(text, CheckOptions::default());
        if !check.success || matches!(check.ty, Some(ExprType::Callable(_))) {
            return (check, None);
        }
        let mut runtime_error = None;
        let mut sink = |e: &RsError| runtime_error = Some(e.clone());
        let reporter: Reporter<'_> = &mut sink;
        let result = self.evaluate(&check.ast, &self.values, &self.functions, Some(reporter));
        check.errors.extend(runtime_error);
        (check, Some(result))
    }

    /// Read typification notation such as `ℬ(X1×Z)`.
    pub fn parse_typification(&self, text: &str) -> Result<Typification, RsError> {
        let ast = self.parse_clean(text)?;
        resolve_typification(&ast, ast.root, &self.types)
    }

    /// Evaluate a constant expression such as `{(1, 2), (2, 3)}`.
    pub fn parse_value(&self, text: &str) -> Result<Value, RsError> {
        let ast = self.parse_clean(text)?;
        let (values, functions) = (ValueContext::new(), AstContext::new());
        let mut calc = Calculator::new(&values, &functions, self.limits);
        let result = calc.run(&ast, None);
        match result.value {
            Some(ExpressionValue::Data(v)) => Ok(v),
            Some(ExpressionValue::Logic(_)) => {
                let params = vec!["value".to_string(), "Logic".to_string()];
                Err(RsError::with_params(ErrorCode::UnexpectedExpressionType, ast.span(ast.root), params))
            }
            None => Err(calc.error().cloned().unwrap_or_else(|| RsError::new(ErrorCode::UnknownSyntax, 0))),
        }
    }

    fn parse_clean(&self, text: &str) -> Result<Ast, RsError> {
        let mut tree = parse(text);
        let ast = normalize(&mut tree, text);
        if let Some(err) = tree.errors.into_iter().find(RsError::is_critical) {
            return Err(err);
        }
        if ast.has_error() {
            return Err(RsError::new(ErrorCode::UnknownSyntax, 0));
        }
        Ok(ast)
    }

    /// Build an engine from a loaded environment file.
    ///
    /// Bases come first, then plain globals, then definitions in name order,
    /// so a definition may call any definition with a smaller name.
    pub fn from_environment(env: &Environment) -> Result<Engine, EnvironmentError> {
        let mut engine = Engine::new(env.limits);
        for base in &env.base {
            engine.add_base(&base.alias, base.ordered);
            if let Some(text) = &base.value {
                let value = engine.parse_value(text).map_err(|source| expression_error(&base.alias, text, source))?;
                if value.as_set().is_none() {
                    return Err(EnvironmentError::Mismatch {
                        alias: base.alias.clone(),
                        message: format!("base value must be a set, found {value}"),
                    });
                }
                engine.set_value(&base.alias, value);
            }
        }

        let (definitions, plain): (Vec<_>, Vec<_>) =
            env.global.iter().partition(|(_, decl)| decl.definition.is_some());
        for (alias, decl) in plain {
            engine.load_global(alias, decl)?;
        }
        for (alias, decl) in definitions {
            let Some(text) = &decl.definition else { continue };
            engine.define(alias, text).map_err(|errors| {
                let source = errors.into_iter().find(RsError::is_critical).unwrap_or_else(|| RsError::new(ErrorCode::UnknownSyntax, 0));
                expression_error(alias, text, source)
            })?;
        }
        Ok(engine)
    }

    fn load_global(&mut self, alias: &str, decl: &GlobalDecl) -> Result<(), EnvironmentError> {
        let typification = match &decl.typification {
            Some(text) => Some(self.parse_typification(text).map_err(|source| expression_error(alias, text, source))?),
            None => None,
        };
        let value = match &decl.value {
            Some(text) => Some((text, self.parse_value(text).map_err(|source| expression_error(alias, text, source))?)),
            None => None,
        };
        let typification = match (typification, &value) {
            (Some(t), _) => Some(t),
            (None, Some((text, _))) => {
                // infer from the value expression itself
                let check = self.check(text, CheckOptions::default());
                check.ty.and_then(|t| t.typification().cloned())
            }
            (None, None) => None,
        };
        if typification.is_none() {
            warn!(alias, "global declared without a typification");
        }

        let class = decl.class.unwrap_or(if value.is_some() { ValueClass::Value } else { ValueClass::Property });
        self.set_global(alias, typification.map(ExprType::from), Some(class));
        if let Some((_, value)) = value {
            self.set_value(alias, value);
        }
        Ok(())
    }
}

fn expression_error(alias: &str, text: &str, source: RsError) -> EnvironmentError {
    EnvironmentError::Expression { alias: alias.to_string(), text: text.to_string(), source }
}
