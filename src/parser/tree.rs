use crate::diagnostics::RsError;
use crate::span::Span;

use super::ast::{BinaryOp, NodeId, QuantKind, TextFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Global,
    Radical,
    Local,
}

/// Concrete syntax as the parser saw it. Operator chains are still flat,
/// parentheses are explicit and index lists are raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxKind {
    Error,
    Identifier(IdentKind),
    Integer,
    IntegerSet,
    EmptySet,
    /// `operands[0] ops[0] operands[1] ops[1] ...`
    Chain(Vec<BinaryOp>),
    Not,
    Boolean,
    TextOp(TextFn),
    /// `head` covers the `pr1,2` / `Pr1` text.
    Projection { set: bool, head: Span },
    /// Children: filter parameters, then the operand.
    Filter { head: Span },
    Paren,
    Tuple,
    Enumeration,
    Quantifier(QuantKind),
    BinderLocal,
    BinderTuple,
    BinderList,
    Declarative,
    Imperative,
    ImpIterate,
    ImpAssign,
    Recursion { full: bool },
    FunctionDef,
    ArgDecl,
    Call,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: Span,
    pub children: Vec<NodeId>,
    pub has_error: bool,
}

/// Output of [`crate::parser::parse`]: an arena of syntax nodes plus every
/// lexical and syntax error found.
#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    pub nodes: Vec<SyntaxNode>,
    pub root: NodeId,
    pub errors: Vec<RsError>,
}

impl ParseTree {
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty() || self.nodes.get(self.root).is_none_or(|n| n.has_error)
    }

    pub(crate) fn push(&mut self, kind: SyntaxKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let has_error = kind == SyntaxKind::Error || children.iter().any(|&c| self.nodes[c].has_error);
        self.nodes.push(SyntaxNode { kind, span, children, has_error });
        self.nodes.len() - 1
    }
}
