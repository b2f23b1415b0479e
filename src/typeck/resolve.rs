use std::collections::HashMap;

use crate::diagnostics::{ErrorCode, RsError};
use crate::parser::ast::{Ast, NodeId, NodeKind};

use super::env::TypeContext;
use super::types::{merge, BaseSet, Typification};

/// Match a declared argument type (radicals as placeholders) against an
/// actual type, accumulating radical bindings.
///
/// A radical seen twice must be bound to compatible types; the binding is
/// narrowed to their merge.
pub(crate) fn unify(pattern: &Typification, concrete: &Typification, bindings: &mut HashMap<String, Typification>) -> bool {
    if matches!(concrete, Typification::Any) {
        return true;
    }
    match pattern {
        Typification::Basic(base) if base.is_radical() => {
            let resolved = match bindings.get(&base.alias) {
                Some(existing) => match merge(existing, concrete) {
                    Some(m) => m,
                    None => return false,
                },
                None => concrete.clone(),
            };
            bindings.insert(base.alias.clone(), resolved);
            true
        }
        Typification::Collection(p_inner) => {
            if let Typification::Collection(c_inner) = concrete {
                unify(p_inner, c_inner, bindings)
            } else {
                false
            }
        }
        Typification::Tuple(p_factors) => {
            if let Typification::Tuple(c_factors) = concrete {
                p_factors.len() == c_factors.len()
                    && p_factors.iter().zip(c_factors).all(|(p, c)| unify(p, c, bindings))
            } else {
                false
            }
        }
        _ => merge(pattern, concrete).is_some(),
    }
}

/// Read typification notation (`ℬ(X1×Z)`, `R1`, ...) from a normalized AST.
///
/// Basic sets keep the ordering flag they were registered with; unregistered
/// `X`/`C` names are accepted as plain bases.
pub fn resolve_typification(ast: &Ast, id: NodeId, context: &TypeContext) -> Result<Typification, RsError> {
    let invalid = |label: String| Err(RsError::with_param(ErrorCode::InvalidTypification, ast.span(id), label));
    match ast.kind(id) {
        NodeKind::Global(name) => match context.base(name) {
            Some(base) => Ok(Typification::Basic(base.clone())),
            None if name.starts_with(['X', 'C']) => Ok(Typification::Basic(BaseSet::new(name.clone()))),
            None => invalid(name.clone()),
        },
        NodeKind::Radical(name) => Ok(Typification::basic(name.clone())),
        NodeKind::IntegerSet => Ok(Typification::Integer),
        NodeKind::Boolean(inner) => Ok(Typification::bool(resolve_typification(ast, *inner, context)?)),
        NodeKind::Decart(factors) => {
            let factors = factors
                .iter()
                .map(|&f| resolve_typification(ast, f, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Typification::Tuple(factors))
        }
        other => invalid(other.label()),
    }
}
