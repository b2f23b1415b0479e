use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// Index of a node inside its owning arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicOp {
    And,
    Or,
    Implies,
    Equiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PredicateOp {
    Eq,
    NotEq,
    In,
    NotIn,
    SubsetOrEq,
    Subset,
    NotSubset,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl PredicateOp {
    pub fn is_membership(self) -> bool {
        matches!(self, PredicateOp::In | PredicateOp::NotIn)
    }

    pub fn is_subset(self) -> bool {
        matches!(self, PredicateOp::SubsetOrEq | PredicateOp::Subset | PredicateOp::NotSubset)
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, PredicateOp::Lt | PredicateOp::Gt | PredicateOp::LtEq | PredicateOp::GtEq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SetOp {
    Union,
    Intersection,
    Difference,
    SymDiff,
}

/// Any binary operator as it appears in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Logic(LogicOp),
    Predicate(PredicateOp),
    Arithmetic(ArithmeticOp),
    Set(SetOp),
    Decart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextFn {
    Card,
    Bool,
    Debool,
    Reduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuantKind {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    /// Placeholder for a subtree that failed to parse.
    Error,

    Global(String),
    Radical(String),
    Local(String),
    Integer(i64),
    IntegerSet,
    EmptySet,

    // Binders
    Declare(String),
    TupleDeclaration(Vec<NodeId>),
    EnumDeclaration(Vec<NodeId>),

    // Logic
    Logic { op: LogicOp, lhs: NodeId, rhs: NodeId },
    Not(NodeId),
    Predicate { op: PredicateOp, lhs: NodeId, rhs: NodeId },
    Quantifier { kind: QuantKind, binder: NodeId, domain: NodeId, body: NodeId },

    // Terms
    Arithmetic { op: ArithmeticOp, lhs: NodeId, rhs: NodeId },
    SetOperation { op: SetOp, lhs: NodeId, rhs: NodeId },
    Decart(Vec<NodeId>),
    Boolean(NodeId),
    Tuple(Vec<NodeId>),
    Enumeration(Vec<NodeId>),
    TextOp { op: TextFn, operand: NodeId },
    SmallProjection { indices: Vec<usize>, operand: NodeId },
    BigProjection { indices: Vec<usize>, operand: NodeId },
    Filter { indices: Vec<usize>, params: Vec<NodeId>, operand: NodeId },

    // Comprehensions
    Declarative { binder: NodeId, domain: NodeId, condition: NodeId },
    Imperative { result: NodeId, blocks: Vec<NodeId> },
    IterateBlock { binder: NodeId, domain: NodeId },
    AssignBlock { binder: NodeId, value: NodeId },
    Recursion { binder: NodeId, init: NodeId, condition: Option<NodeId>, step: NodeId },

    // Functions
    FunctionDefinition { args: Vec<NodeId>, body: NodeId },
    ArgDeclaration { binder: NodeId, domain: NodeId },
    Call { callee: NodeId, args: Vec<NodeId> },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        use NodeKind::*;
        match self {
            Error | Global(_) | Radical(_) | Local(_) | Integer(_) | IntegerSet | EmptySet | Declare(_) => {
                Vec::new()
            }
            TupleDeclaration(items) | EnumDeclaration(items) | Decart(items) | Tuple(items)
            | Enumeration(items) => items.clone(),
            Logic { lhs, rhs, .. }
            | Predicate { lhs, rhs, .. }
            | Arithmetic { lhs, rhs, .. }
            | SetOperation { lhs, rhs, .. } => vec![*lhs, *rhs],
            Not(operand) | Boolean(operand) => vec![*operand],
            TextOp { operand, .. } | SmallProjection { operand, .. } | BigProjection { operand, .. } => {
                vec![*operand]
            }
            Filter { params, operand, .. } => {
                let mut out = params.clone();
                out.push(*operand);
                out
            }
            Quantifier { binder, domain, body, .. } => vec![*binder, *domain, *body],
            Declarative { binder, domain, condition } => vec![*binder, *domain, *condition],
            Imperative { result, blocks } => {
                let mut out = vec![*result];
                out.extend(blocks);
                out
            }
            IterateBlock { binder, domain } | ArgDeclaration { binder, domain } => vec![*binder, *domain],
            AssignBlock { binder, value } => vec![*binder, *value],
            Recursion { binder, init, condition, step } => {
                let mut out = vec![*binder, *init];
                out.extend(condition);
                out.push(*step);
                out
            }
            FunctionDefinition { args, body } => {
                let mut out = args.clone();
                out.push(*body);
                out
            }
            Call { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args);
                out
            }
        }
    }

    pub fn label(&self) -> String {
        use NodeKind::*;
        match self {
            Error => "Error".to_string(),
            Global(name) => format!("Global({name})"),
            Radical(name) => format!("Radical({name})"),
            Local(name) => format!("Local({name})"),
            Integer(n) => format!("Integer({n})"),
            IntegerSet => "IntegerSet".to_string(),
            EmptySet => "EmptySet".to_string(),
            Declare(name) => format!("Declare({name})"),
            TupleDeclaration(_) => "TupleDeclaration".to_string(),
            EnumDeclaration(_) => "EnumDeclaration".to_string(),
            Logic { op, .. } => format!("Logic({op:?})"),
            Not(_) => "Not".to_string(),
            Predicate { op, .. } => format!("Predicate({op:?})"),
            Quantifier { kind, .. } => format!("Quantifier({kind:?})"),
            Arithmetic { op, .. } => format!("Arithmetic({op:?})"),
            SetOperation { op, .. } => format!("SetOperation({op:?})"),
            Decart(_) => "Decart".to_string(),
            Boolean(_) => "Boolean".to_string(),
            Tuple(_) => "Tuple".to_string(),
            Enumeration(_) => "Enumeration".to_string(),
            TextOp { op, .. } => format!("TextOp({op:?})"),
            SmallProjection { indices, .. } => format!("SmallProjection{indices:?}"),
            BigProjection { indices, .. } => format!("BigProjection{indices:?}"),
            Filter { indices, .. } => format!("Filter{indices:?}"),
            Declarative { .. } => "Declarative".to_string(),
            Imperative { .. } => "Imperative".to_string(),
            IterateBlock { .. } => "IterateBlock".to_string(),
            AssignBlock { .. } => "AssignBlock".to_string(),
            Recursion { condition, .. } => {
                if condition.is_some() { "Recursion(full)".to_string() } else { "Recursion".to_string() }
            }
            FunctionDefinition { .. } => "FunctionDefinition".to_string(),
            ArgDeclaration { .. } => "ArgDeclaration".to_string(),
            Call { .. } => "Call".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstNode {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub has_error: bool,
}

/// Normalized expression tree. Nodes live in one arena and refer to each
/// other by index; `parent` links are non-owning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ast {
    pub nodes: Vec<AstNode>,
    pub root: NodeId,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn has_error(&self) -> bool {
        self.nodes.get(self.root).is_none_or(|n| n.has_error)
    }

    /// Walk parent links from `id` (exclusive) towards the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Names introduced by a binder node, in source order.
    pub fn declared_names(&self, binder: NodeId) -> Vec<(String, Span)> {
        let mut out = Vec::new();
        self.collect_names(binder, &mut out);
        out
    }

    fn collect_names(&self, id: NodeId, out: &mut Vec<(String, Span)>) {
        match self.kind(id) {
            NodeKind::Declare(name) => out.push((name.clone(), self.span(id))),
            NodeKind::TupleDeclaration(items) | NodeKind::EnumDeclaration(items) => {
                for &item in items {
                    self.collect_names(item, out);
                }
            }
            _ => {}
        }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        writeln!(f, "{:indent$}{} [{}..{}]", "", node.kind.label(), node.span.start, node.span.end, indent = depth * 2)?;
        for child in node.kind.children() {
            self.write_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        self.write_node(f, self.root, 0)
    }
}
