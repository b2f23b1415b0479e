use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between a radical's name and the call site it was instantiated for.
const MANGLE_SEP: char = '#';

static ANY: Typification = Typification::Any;

/// A named carrier set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseSet {
    pub alias: String,
    /// Constant domains declared as ordered support `<`, `+` and mix with `Z`.
    #[serde(default)]
    pub ordered: bool,
}

impl BaseSet {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into(), ordered: false }
    }

    pub fn ordered(alias: impl Into<String>) -> Self {
        Self { alias: alias.into(), ordered: true }
    }

    /// Radicals (`R1`, `R2`, ...) are generic placeholders.
    pub fn is_radical(&self) -> bool {
        is_radical_name(&self.alias)
    }

    /// Name as written in source, without any call-site suffix.
    pub fn display_name(&self) -> &str {
        self.alias.split(MANGLE_SEP).next().unwrap_or(&self.alias)
    }
}

pub fn is_radical_name(name: &str) -> bool {
    let name = name.split(MANGLE_SEP).next().unwrap_or(name);
    name.len() > 1 && name.starts_with('R') && name[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Static type of a set-valued expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Typification {
    /// Unknown element type; merges with anything.
    Any,
    Integer,
    Basic(BaseSet),
    /// At least two factors.
    Tuple(Vec<Typification>),
    /// Type of a finite subset of the inner type.
    Collection(Box<Typification>),
}

impl Typification {
    pub fn basic(alias: impl Into<String>) -> Self {
        Typification::Basic(BaseSet::new(alias))
    }

    pub fn bool(inner: Typification) -> Self {
        Typification::Collection(Box::new(inner))
    }

    /// `ℬ(R0)`, the type of `∅`.
    pub fn empty_set() -> Self {
        Typification::bool(Typification::Any)
    }

    /// Strip one `Collection` layer.
    pub fn debool(&self) -> Option<&Typification> {
        match self {
            Typification::Collection(inner) => Some(inner),
            Typification::Any => Some(&ANY),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Typification::Collection(_) | Typification::Any)
    }

    /// Supports `+`, `-` and `*`.
    pub fn is_arithmetic(&self) -> bool {
        match self {
            Typification::Any | Typification::Integer => true,
            Typification::Basic(base) => base.ordered,
            _ => false,
        }
    }

    /// Supports `<`, `>`, `≤` and `≥`.
    pub fn is_ordered(&self) -> bool {
        self.is_arithmetic()
    }

    /// Rebuild the structure with `f` applied to every direct child type.
    pub fn map_inner_types(&self, f: &impl Fn(&Typification) -> Typification) -> Typification {
        match self {
            Typification::Tuple(factors) => Typification::Tuple(factors.iter().map(f).collect()),
            Typification::Collection(inner) => Typification::Collection(Box::new(f(inner))),
            _ => self.clone(),
        }
    }

    /// True if this type or any nested type satisfies `pred`.
    pub fn any_type(&self, pred: &impl Fn(&Typification) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Typification::Tuple(factors) => factors.iter().any(|t| t.any_type(pred)),
            Typification::Collection(inner) => inner.any_type(pred),
            _ => false,
        }
    }

    pub fn has_generics(&self) -> bool {
        self.any_type(&|t| matches!(t, Typification::Basic(base) if base.is_radical()))
    }

    /// Still open to refinement: contains `Any` or a radical.
    pub fn is_partial(&self) -> bool {
        self.has_generics() || self.any_type(&|t| matches!(t, Typification::Any))
    }

    /// Replace call-site radicals that no argument bound with `Any`.
    pub fn erase_unbound(&self) -> Typification {
        match self {
            Typification::Basic(base) if base.is_radical() && base.alias.contains(MANGLE_SEP) => Typification::Any,
            _ => self.map_inner_types(&|t| t.erase_unbound()),
        }
    }

    /// Replace radicals bound in `bindings`; unbound radicals stay as they are.
    pub fn substitute(&self, bindings: &HashMap<String, Typification>) -> Typification {
        match self {
            Typification::Basic(base) if base.is_radical() => {
                bindings.get(&base.alias).cloned().unwrap_or_else(|| self.clone())
            }
            _ => self.map_inner_types(&|t| t.substitute(bindings)),
        }
    }

    /// Rename every radical `R1` to `R1#suffix` so that one call site cannot
    /// capture bindings from another.
    pub fn mangle(&self, suffix: &str) -> Typification {
        match self {
            Typification::Basic(base) if base.is_radical() => {
                let name = base.display_name();
                Typification::Basic(BaseSet::new(format!("{name}{MANGLE_SEP}{suffix}")))
            }
            _ => self.map_inner_types(&|t| t.mangle(suffix)),
        }
    }
}

/// Most specific common supertype of two typifications, if one exists.
pub fn merge(a: &Typification, b: &Typification) -> Option<Typification> {
    use Typification::*;
    match (a, b) {
        (Any, other) | (other, Any) => Some(other.clone()),
        (Integer, Integer) => Some(Integer),
        (Integer, Basic(base)) | (Basic(base), Integer) if base.ordered => Some(Basic(base.clone())),
        (Basic(x), Basic(y)) if x.alias == y.alias => Some(a.clone()),
        (Tuple(xs), Tuple(ys)) if xs.len() == ys.len() => {
            let factors = xs.iter().zip(ys).map(|(x, y)| merge(x, y)).collect::<Option<Vec<_>>>()?;
            Some(Tuple(factors))
        }
        (Collection(x), Collection(y)) => Some(Typification::bool(merge(x, y)?)),
        _ => None,
    }
}

pub fn compatible(a: &Typification, b: &Typification) -> bool {
    merge(a, b).is_some()
}

impl fmt::Display for Typification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typification::Any => write!(f, "R0"),
            Typification::Integer => write!(f, "Z"),
            Typification::Basic(base) => write!(f, "{}", base.display_name()),
            Typification::Tuple(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "×")?;
                    }
                    if matches!(factor, Typification::Tuple(_)) {
                        write!(f, "({factor})")?;
                    } else {
                        write!(f, "{factor}")?;
                    }
                }
                Ok(())
            }
            Typification::Collection(inner) => write!(f, "ℬ({inner})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallableKind {
    Function,
    Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionArg {
    pub alias: String,
    pub typ: Typification,
}

/// Signature of a user-defined function or predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Callable {
    pub kind: CallableKind,
    pub args: Vec<FunctionArg>,
    /// `None` for predicates.
    pub result: Option<Typification>,
}

/// Type of an arbitrary expression: a typification, a truth value or a
/// callable signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprType {
    Typed(Typification),
    Logic,
    Callable(Callable),
}

impl ExprType {
    pub fn typification(&self) -> Option<&Typification> {
        match self {
            ExprType::Typed(t) => Some(t),
            _ => None,
        }
    }

    /// Coarse class of the expression, for `expected` checks.
    pub fn class(&self) -> TypeClass {
        match self {
            ExprType::Typed(_) => TypeClass::Typification,
            ExprType::Logic => TypeClass::Logic,
            ExprType::Callable(c) if c.kind == CallableKind::Function => TypeClass::Function,
            ExprType::Callable(_) => TypeClass::Predicate,
        }
    }
}

impl From<Typification> for ExprType {
    fn from(t: Typification) -> Self {
        ExprType::Typed(t)
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Typed(t) => write!(f, "{t}"),
            ExprType::Logic => write!(f, "Logic"),
            ExprType::Callable(c) => {
                write!(f, "[")?;
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.typ)?;
                }
                match &c.result {
                    Some(result) => write!(f, "] → {result}"),
                    None => write!(f, "] → Logic"),
                }
            }
        }
    }
}

/// Expression class a caller can demand from `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeClass {
    Logic,
    Typification,
    Function,
    Predicate,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeClass::Logic => write!(f, "Logic"),
            TypeClass::Typification => write!(f, "Typification"),
            TypeClass::Function => write!(f, "Function"),
            TypeClass::Predicate => write!(f, "Predicate"),
        }
    }
}
