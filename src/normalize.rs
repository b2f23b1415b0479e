use crate::diagnostics::{ErrorCode, RsError};
use crate::parser::ast::{Ast, AstNode, BinaryOp, NodeId, NodeKind};
use crate::parser::tree::{IdentKind, ParseTree, SyntaxKind};
use crate::span::Span;

/// Rewrite a concrete parse tree into the canonical AST.
///
/// Operator chains become left-nested binary nodes (`×` chains become one
/// n-ary `Decart`), parentheses disappear, binders become declaration nodes
/// and projection/filter heads are decoded into index lists. Source spans are
/// carried over unchanged. Literal errors found here are appended to
/// `tree.errors`.
pub fn normalize(tree: &mut ParseTree, source: &str) -> Ast {
    let mut normalizer = Normalizer { tree: &*tree, source, nodes: Vec::new(), errors: Vec::new() };
    let root = if tree.nodes.is_empty() {
        normalizer.push(NodeKind::Error, Span::point(0))
    } else {
        normalizer.build(tree.root)
    };
    let Normalizer { mut nodes, errors, .. } = normalizer;

    // children always precede their parent in the arena
    for id in 0..nodes.len() {
        let children = nodes[id].kind.children();
        let mut has_error = nodes[id].kind == NodeKind::Error;
        for child in children {
            nodes[child].parent = Some(id);
            has_error |= nodes[child].has_error;
        }
        nodes[id].has_error = has_error;
    }

    tree.errors.extend(errors);
    if !tree.errors.is_empty() {
        nodes[root].has_error = true;
    }
    Ast { nodes, root }
}

struct Normalizer<'t> {
    tree: &'t ParseTree,
    source: &'t str,
    nodes: Vec<AstNode>,
    errors: Vec<RsError>,
}

impl<'t> Normalizer<'t> {
    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.push(AstNode { kind, span, parent: None, has_error: false });
        self.nodes.len() - 1
    }

    fn build_all(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        ids.iter().map(|&c| self.build(c)).collect()
    }

    fn build(&mut self, id: NodeId) -> NodeId {
        let tree = self.tree;
        let node = tree.node(id);
        let span = node.span;
        let children = node.children.as_slice();
        let text = span.text(self.source);

        let kind = match &node.kind {
            SyntaxKind::Error => NodeKind::Error,
            SyntaxKind::Identifier(IdentKind::Global) => NodeKind::Global(text.to_string()),
            SyntaxKind::Identifier(IdentKind::Radical) => NodeKind::Radical(text.to_string()),
            SyntaxKind::Identifier(IdentKind::Local) => NodeKind::Local(text.to_string()),
            SyntaxKind::Integer => match text.parse::<i64>() {
                Ok(n) => NodeKind::Integer(n),
                Err(_) => {
                    self.errors.push(RsError::at(ErrorCode::ValueArithmeticOverflow, span));
                    NodeKind::Error
                }
            },
            SyntaxKind::IntegerSet => NodeKind::IntegerSet,
            SyntaxKind::EmptySet => NodeKind::EmptySet,
            SyntaxKind::Chain(ops) => return self.fold_chain(ops, children),
            SyntaxKind::Paren => return self.build(children[0]),
            SyntaxKind::Not => NodeKind::Not(self.build(children[0])),
            SyntaxKind::Boolean => NodeKind::Boolean(self.build(children[0])),
            SyntaxKind::TextOp(op) => NodeKind::TextOp { op: *op, operand: self.build(children[0]) },
            SyntaxKind::Projection { set, head } => match self.indices(*head) {
                Some(indices) => {
                    let operand = self.build(children[0]);
                    if *set {
                        NodeKind::BigProjection { indices, operand }
                    } else {
                        NodeKind::SmallProjection { indices, operand }
                    }
                }
                None => NodeKind::Error,
            },
            SyntaxKind::Filter { head } => match self.indices(*head) {
                Some(indices) => {
                    let mut params = self.build_all(children);
                    let operand = params[params.len() - 1];
                    params.pop();
                    NodeKind::Filter { indices, params, operand }
                }
                None => NodeKind::Error,
            },
            SyntaxKind::Tuple => NodeKind::Tuple(self.build_all(children)),
            SyntaxKind::Enumeration => NodeKind::Enumeration(self.build_all(children)),
            SyntaxKind::Quantifier(kind) => {
                let parts = self.build_all(children);
                NodeKind::Quantifier { kind: *kind, binder: parts[0], domain: parts[1], body: parts[2] }
            }
            SyntaxKind::BinderLocal => NodeKind::Declare(text.to_string()),
            SyntaxKind::BinderTuple => NodeKind::TupleDeclaration(self.build_all(children)),
            SyntaxKind::BinderList => NodeKind::EnumDeclaration(self.build_all(children)),
            SyntaxKind::Declarative => {
                let parts = self.build_all(children);
                NodeKind::Declarative { binder: parts[0], domain: parts[1], condition: parts[2] }
            }
            SyntaxKind::Imperative => {
                let parts = self.build_all(children);
                NodeKind::Imperative { result: parts[0], blocks: parts[1..].to_vec() }
            }
            SyntaxKind::ImpIterate => {
                let parts = self.build_all(children);
                NodeKind::IterateBlock { binder: parts[0], domain: parts[1] }
            }
            SyntaxKind::ImpAssign => {
                let parts = self.build_all(children);
                NodeKind::AssignBlock { binder: parts[0], value: parts[1] }
            }
            SyntaxKind::Recursion { full } => {
                let parts = self.build_all(children);
                if *full {
                    NodeKind::Recursion { binder: parts[0], init: parts[1], condition: Some(parts[2]), step: parts[3] }
                } else {
                    NodeKind::Recursion { binder: parts[0], init: parts[1], condition: None, step: parts[2] }
                }
            }
            SyntaxKind::FunctionDef => {
                let mut args = self.build_all(children);
                let body = args[args.len() - 1];
                args.pop();
                NodeKind::FunctionDefinition { args, body }
            }
            SyntaxKind::ArgDecl => {
                let parts = self.build_all(children);
                NodeKind::ArgDeclaration { binder: parts[0], domain: parts[1] }
            }
            SyntaxKind::Call => {
                let parts = self.build_all(children);
                NodeKind::Call { callee: parts[0], args: parts[1..].to_vec() }
            }
        };
        self.push(kind, span)
    }

    /// `a op1 b op2 c` becomes `(a op1 b) op2 c`.
    fn fold_chain(&mut self, ops: &[BinaryOp], operands: &[NodeId]) -> NodeId {
        let built = self.build_all(operands);
        if ops.iter().all(|op| *op == BinaryOp::Decart) {
            let span = self.nodes[built[0]].span.join(self.nodes[built[built.len() - 1]].span);
            return self.push(NodeKind::Decart(built), span);
        }

        let mut acc = built[0];
        for (op, &rhs) in ops.iter().zip(&built[1..]) {
            let span = self.nodes[acc].span.join(self.nodes[rhs].span);
            let kind = match *op {
                BinaryOp::Logic(op) => NodeKind::Logic { op, lhs: acc, rhs },
                BinaryOp::Predicate(op) => NodeKind::Predicate { op, lhs: acc, rhs },
                BinaryOp::Arithmetic(op) => NodeKind::Arithmetic { op, lhs: acc, rhs },
                BinaryOp::Set(op) => NodeKind::SetOperation { op, lhs: acc, rhs },
                BinaryOp::Decart => NodeKind::Decart(vec![acc, rhs]),
            };
            acc = self.push(kind, span);
        }
        acc
    }

    /// Decode the `1,2` of a `pr1,2` / `Pr1` / `Fi1,2` head.
    fn indices(&mut self, head: Span) -> Option<Vec<usize>> {
        let text = head.text(self.source);
        let parsed: Result<Vec<usize>, _> = text.get(2..).unwrap_or("").split(',').map(str::parse).collect();
        match parsed {
            Ok(indices) => Some(indices),
            Err(_) => {
                self.errors.push(RsError::with_param(ErrorCode::UnknownSyntax, head, text));
                None
            }
        }
    }
}
