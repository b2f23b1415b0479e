pub mod ast;
pub mod tree;

use crate::diagnostics::{ErrorCode, RsError};
use crate::lexer::{lex, token::Token};
use crate::span::{Span, Spanned};
use ast::*;
use tree::{IdentKind, ParseTree, SyntaxKind};

type PResult = Result<NodeId, RsError>;

// Binding powers, lowest first.
const PREDICATE_BP: u8 = 10;
const SET_BP: u8 = 12;
const PREFIX_BP: u8 = 22;

/// Deepest expression nesting the recursive descent accepts.
pub const MAX_NESTING: usize = 128;

/// Parse `source` into a concrete syntax tree. Never fails: lexical and
/// syntax errors are collected in `ParseTree::errors` and the offending
/// regions become `SyntaxKind::Error` nodes.
pub fn parse(source: &str) -> ParseTree {
    let lexed = lex(source);
    let mut parser = Parser::new(&lexed.tokens, source);
    let root = parser.parse_root();
    let mut tree = parser.tree;
    tree.root = root;
    let mut errors = lexed.errors;
    errors.append(&mut tree.errors);
    errors.sort_by_key(|e| e.position);
    tree.errors = errors;
    tree
}

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    depth: usize,
    tree: ParseTree,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0, depth: 0, tree: ParseTree::default() }
    }

    fn peek(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<Token> {
        self.peek().map(|t| t.node)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|t| t.node)
    }

    fn at(&self, tok: Token) -> bool {
        self.peek_kind() == Some(tok)
    }

    fn advance(&mut self) -> Option<Spanned<Token>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.at(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `expected` or fail with `code` at the current token.
    fn expect(&mut self, expected: Token, code: ErrorCode) -> Result<Span, RsError> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == expected => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(RsError::with_param(code, tok.span, tok.span.text(self.source))),
            None => Err(RsError::at(code, self.eof_span())),
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<Span, RsError> {
        if self.at(expected) {
            let span = self.tokens[self.pos].span;
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> RsError {
        match self.peek() {
            Some(tok) => RsError::with_param(ErrorCode::UnknownSyntax, tok.span, tok.span.text(self.source)),
            None => RsError::at(ErrorCode::UnexpectedEnd, self.eof_span()),
        }
    }

    fn eof_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => Span::point(last.span.end),
            None => Span::point(self.source.len()),
        }
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.tree.node(id).span
    }

    fn leaf(&mut self, kind: SyntaxKind) -> NodeId {
        let span = self.advance().map(|t| t.span).unwrap_or_else(|| self.eof_span());
        self.tree.push(kind, span, Vec::new())
    }

    // ---- entry -----------------------------------------------------------

    fn parse_root(&mut self) -> NodeId {
        let result = if self.at(Token::LBracket) { self.parse_function_def() } else { self.parse_expr(0) };
        let whole = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.join(last.span),
            _ => Span::point(0),
        };
        match result {
            Ok(id) => {
                if self.peek().is_none() {
                    return id;
                }
                let err = self.unexpected();
                self.tree.errors.push(err);
                self.tree.push(SyntaxKind::Error, whole, vec![id])
            }
            Err(err) => {
                self.tree.errors.push(err);
                self.pos = self.tokens.len();
                self.tree.push(SyntaxKind::Error, whole, Vec::new())
            }
        }
    }

    /// Run `body` inside a bracketed group whose opener was just consumed.
    /// A failure inside the group is recorded and the parser resumes after
    /// the matching closer, leaving an error node in place of the group.
    fn group<T>(
        &mut self,
        open: Span,
        close: Token,
        missing: ErrorCode,
        body: impl FnOnce(&mut Self) -> Result<T, RsError>,
        build: impl FnOnce(&mut Self, T, Span) -> NodeId,
    ) -> PResult {
        let start = self.pos;
        let result = body(self).and_then(|content| {
            let close_span = self.expect(close, missing)?;
            Ok((content, close_span))
        });
        match result {
            Ok((content, close_span)) => Ok(build(self, content, open.join(close_span))),
            Err(err) => {
                let Some(close_idx) = self.matching_closer(start) else {
                    return Err(err);
                };
                self.tree.errors.push(err);
                self.pos = close_idx + 1;
                let span = open.join(self.tokens[close_idx].span);
                Ok(self.tree.push(SyntaxKind::Error, span, Vec::new()))
            }
        }
    }

    fn matching_closer(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(from) {
            if tok.node.is_opener() {
                depth += 1;
            } else if tok.node.is_closer() {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
        }
        None
    }

    // ---- expressions -----------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> PResult {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = self.parse_binary(min_bp);
        self.depth -= 1;
        result
    }

    fn too_deep(&self) -> RsError {
        let span = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
        RsError::with_param(ErrorCode::NestingTooDeep, span, MAX_NESTING.to_string())
    }

    fn parse_binary(&mut self, min_bp: u8) -> PResult {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(op) = self.peek_kind().and_then(binary_op) else { break };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            if matches!(op, BinaryOp::Predicate(_)) && self.is_predicate(lhs) {
                let tok = &self.tokens[self.pos];
                return Err(RsError::with_param(ErrorCode::PredicateChain, tok.span, tok.span.text(self.source)));
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = self.extend_chain(lhs, op, rhs);
        }

        Ok(lhs)
    }

    /// Append `op rhs` to `lhs` when both sit on the same associative level,
    /// otherwise start a new chain.
    fn extend_chain(&mut self, lhs: NodeId, op: BinaryOp, rhs: NodeId) -> NodeId {
        let rhs_span = self.span_of(rhs);
        let rhs_error = self.tree.node(rhs).has_error;
        if let SyntaxKind::Chain(ops) = &self.tree.nodes[lhs].kind {
            if chains_with(ops[0], op) {
                let node = &mut self.tree.nodes[lhs];
                if let SyntaxKind::Chain(ops) = &mut node.kind {
                    ops.push(op);
                }
                node.children.push(rhs);
                node.span = node.span.join(rhs_span);
                node.has_error |= rhs_error;
                return lhs;
            }
        }
        let span = self.span_of(lhs).join(rhs_span);
        self.tree.push(SyntaxKind::Chain(vec![op]), span, vec![lhs, rhs])
    }

    fn is_predicate(&self, id: NodeId) -> bool {
        matches!(&self.tree.node(id).kind, SyntaxKind::Chain(ops) if matches!(ops[0], BinaryOp::Predicate(_)))
    }

    fn parse_prefix(&mut self) -> PResult {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.unexpected());
        };

        match tok.node {
            Token::Global => {
                let ident = self.leaf(SyntaxKind::Identifier(IdentKind::Global));
                if self.at(Token::LBracket) {
                    return self.parse_call(ident);
                }
                Ok(ident)
            }
            Token::Radical => Ok(self.leaf(SyntaxKind::Identifier(IdentKind::Radical))),
            Token::Local => Ok(self.leaf(SyntaxKind::Identifier(IdentKind::Local))),
            Token::Integer => Ok(self.leaf(SyntaxKind::Integer)),
            Token::IntegerSet => Ok(self.leaf(SyntaxKind::IntegerSet)),
            Token::EmptySet => Ok(self.leaf(SyntaxKind::EmptySet)),
            Token::Not => {
                self.advance();
                let operand = self.parse_expr(PREDICATE_BP)?;
                let span = tok.span.join(self.span_of(operand));
                Ok(self.tree.push(SyntaxKind::Not, span, vec![operand]))
            }
            Token::Boolean => {
                self.advance();
                let operand = self.parse_expr(PREFIX_BP)?;
                let span = tok.span.join(self.span_of(operand));
                Ok(self.tree.push(SyntaxKind::Boolean, span, vec![operand]))
            }
            Token::Forall => self.parse_quantifier(QuantKind::Forall),
            Token::Exists => self.parse_quantifier(QuantKind::Exists),
            Token::Card | Token::Bool | Token::Debool | Token::Red => {
                self.advance();
                let op = match tok.node {
                    Token::Card => TextFn::Card,
                    Token::Bool => TextFn::Bool,
                    Token::Debool => TextFn::Debool,
                    _ => TextFn::Reduce,
                };
                self.parse_argument(tok.span, SyntaxKind::TextOp(op), Vec::new())
            }
            Token::SmallPr | Token::BigPr => {
                self.advance();
                let kind = SyntaxKind::Projection { set: tok.node == Token::BigPr, head: tok.span };
                self.parse_argument(tok.span, kind, Vec::new())
            }
            Token::Filter => {
                self.advance();
                self.expect(Token::LBracket, ErrorCode::MissingSquareBracket)?;
                let mut params = vec![self.parse_expr(0)?];
                while self.eat(Token::Comma) {
                    params.push(self.parse_expr(0)?);
                }
                self.expect(Token::RBracket, ErrorCode::MissingSquareBracket)?;
                self.parse_argument(tok.span, SyntaxKind::Filter { head: tok.span }, params)
            }
            Token::LParen => {
                self.advance();
                self.group(
                    tok.span,
                    Token::RParen,
                    ErrorCode::MissingParenthesis,
                    |p| p.parse_expr_list(),
                    |p, items, span| {
                        let kind = if items.len() == 1 { SyntaxKind::Paren } else { SyntaxKind::Tuple };
                        p.tree.push(kind, span, items)
                    },
                )
            }
            Token::LBrace => {
                self.advance();
                self.group(
                    tok.span,
                    Token::RBrace,
                    ErrorCode::MissingCurlyBrace,
                    |p| p.parse_expr_list(),
                    |p, items, span| p.tree.push(SyntaxKind::Enumeration, span, items),
                )
            }
            Token::DeclarativeOpen => self.parse_declarative(),
            Token::ImperativeOpen => self.parse_imperative(),
            Token::RecursionOpen => self.parse_recursion(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_expr_list(&mut self) -> Result<Vec<NodeId>, RsError> {
        let mut items = vec![self.parse_expr(0)?];
        while self.eat(Token::Comma) {
            items.push(self.parse_expr(0)?);
        }
        Ok(items)
    }

    /// `( expr )` argument of a text operator; `leading` children go before it.
    fn parse_argument(&mut self, head: Span, kind: SyntaxKind, leading: Vec<NodeId>) -> PResult {
        let open = self.expect(Token::LParen, ErrorCode::MissingParenthesis)?;
        self.group(
            open,
            Token::RParen,
            ErrorCode::MissingParenthesis,
            |p| p.parse_expr(0),
            move |p, operand, span| {
                let mut children = leading;
                children.push(operand);
                p.tree.push(kind, head.join(span), children)
            },
        )
    }

    fn parse_call(&mut self, callee: NodeId) -> PResult {
        let open = self.expect_token(Token::LBracket)?;
        let head = self.span_of(callee);
        self.group(
            open,
            Token::RBracket,
            ErrorCode::MissingSquareBracket,
            |p| p.parse_expr_list(),
            move |p, args, span| {
                let mut children = vec![callee];
                children.extend(args);
                p.tree.push(SyntaxKind::Call, head.join(span), children)
            },
        )
    }

    // ---- binders ---------------------------------------------------------

    /// A single binder, optionally followed by `, binder ...` when `allow_list`.
    fn parse_binder(&mut self, allow_list: bool) -> PResult {
        let first = self.parse_binder_item()?;
        if !allow_list || !self.at(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma) {
            items.push(self.parse_binder_item()?);
        }
        let span = self.span_of(items[0]).join(self.span_of(items[items.len() - 1]));
        Ok(self.tree.push(SyntaxKind::BinderList, span, items))
    }

    fn parse_binder_item(&mut self) -> PResult {
        match self.peek_kind() {
            Some(Token::Local) => Ok(self.leaf(SyntaxKind::BinderLocal)),
            Some(Token::LParen) => {
                if self.depth >= MAX_NESTING {
                    return Err(self.too_deep());
                }
                let open = self.expect_token(Token::LParen)?;
                self.depth += 1;
                let items = self.parse_binder_tuple();
                self.depth -= 1;
                let items = items?;
                let close = self.expect(Token::RParen, ErrorCode::MissingParenthesis)?;
                if items.len() == 1 {
                    return Ok(items[0]);
                }
                Ok(self.tree.push(SyntaxKind::BinderTuple, open.join(close), items))
            }
            Some(_) => {
                let tok = &self.tokens[self.pos];
                Err(RsError::with_param(ErrorCode::ExpectedLocal, tok.span, tok.span.text(self.source)))
            }
            None => Err(RsError::at(ErrorCode::UnexpectedEnd, self.eof_span())),
        }
    }

    fn parse_binder_tuple(&mut self) -> Result<Vec<NodeId>, RsError> {
        let mut items = vec![self.parse_binder_item()?];
        while self.eat(Token::Comma) {
            items.push(self.parse_binder_item()?);
        }
        Ok(items)
    }

    // ---- compound forms --------------------------------------------------

    fn parse_quantifier(&mut self, kind: QuantKind) -> PResult {
        let start = self.expect_token(if kind == QuantKind::Forall { Token::Forall } else { Token::Exists })?;
        let binder = self.parse_binder(true)?;
        self.expect(Token::In, ErrorCode::InvalidQuantifier)?;
        let domain = self.parse_expr(SET_BP)?;
        let body = self.parse_expr(PREDICATE_BP)?;
        let span = start.join(self.span_of(body));
        Ok(self.tree.push(SyntaxKind::Quantifier(kind), span, vec![binder, domain, body]))
    }

    fn parse_declarative(&mut self) -> PResult {
        let open = self.expect_token(Token::DeclarativeOpen)?;
        self.group(
            open,
            Token::RBrace,
            ErrorCode::MissingCurlyBrace,
            |p| {
                let binder = p.parse_binder(false)?;
                p.expect_token(Token::In)?;
                let domain = p.parse_expr(0)?;
                p.expect_token(Token::Bar)?;
                let condition = p.parse_expr(0)?;
                Ok(vec![binder, domain, condition])
            },
            |p, children, span| p.tree.push(SyntaxKind::Declarative, span, children),
        )
    }

    fn parse_imperative(&mut self) -> PResult {
        let open = self.expect_token(Token::ImperativeOpen)?;
        self.group(
            open,
            Token::RBrace,
            ErrorCode::MissingCurlyBrace,
            |p| {
                let result = p.parse_expr(0)?;
                p.expect(Token::Bar, ErrorCode::InvalidImperative)?;
                let mut children = vec![result, p.parse_imperative_block()?];
                while p.eat(Token::Semicolon) {
                    children.push(p.parse_imperative_block()?);
                }
                Ok(children)
            },
            |p, children, span| p.tree.push(SyntaxKind::Imperative, span, children),
        )
    }

    /// `binder :∈ term`, `binder := term`, or a logical guard.
    fn parse_imperative_block(&mut self) -> PResult {
        if matches!(self.peek_kind(), None | Some(Token::RBrace | Token::Semicolon)) {
            return Err(match self.peek() {
                Some(tok) => RsError::at(ErrorCode::InvalidImperative, tok.span),
                None => RsError::at(ErrorCode::UnexpectedEnd, self.eof_span()),
            });
        }

        let checkpoint = self.pos;
        if let Ok(binder) = self.parse_binder_item() {
            let kind = match self.peek_kind() {
                Some(Token::IterateIn) => Some(SyntaxKind::ImpIterate),
                Some(Token::Assign) => Some(SyntaxKind::ImpAssign),
                _ => None,
            };
            if let Some(kind) = kind {
                self.advance();
                let value = self.parse_expr(0)?;
                let span = self.span_of(binder).join(self.span_of(value));
                return Ok(self.tree.push(kind, span, vec![binder, value]));
            }
        }
        self.pos = checkpoint;
        self.parse_expr(0)
    }

    fn parse_recursion(&mut self) -> PResult {
        let open = self.expect_token(Token::RecursionOpen)?;
        self.group(
            open,
            Token::RBrace,
            ErrorCode::MissingCurlyBrace,
            |p| {
                let binder = p.parse_binder(false)?;
                p.expect_token(Token::Assign)?;
                let init = p.parse_expr(0)?;
                p.expect_token(Token::Bar)?;
                let mut children = vec![binder, init, p.parse_expr(0)?];
                if p.eat(Token::Bar) {
                    children.push(p.parse_expr(0)?);
                }
                Ok(children)
            },
            |p, children, span| {
                let full = children.len() == 4;
                p.tree.push(SyntaxKind::Recursion { full }, span, children)
            },
        )
    }

    /// `[a∈D1, b∈D2] body`, only legal as the whole expression.
    fn parse_function_def(&mut self) -> PResult {
        let open = self.expect_token(Token::LBracket)?;
        let mut children = vec![self.parse_arg_decl()?];
        while self.eat(Token::Comma) {
            children.push(self.parse_arg_decl()?);
        }
        self.expect(Token::RBracket, ErrorCode::MissingSquareBracket)?;
        let body = self.parse_expr(0)?;
        children.push(body);
        let span = open.join(self.span_of(body));
        Ok(self.tree.push(SyntaxKind::FunctionDef, span, children))
    }

    fn parse_arg_decl(&mut self) -> PResult {
        let Some(tok) = self.peek().cloned() else {
            return Err(RsError::at(ErrorCode::UnexpectedEnd, self.eof_span()));
        };
        if tok.node != Token::Local || self.peek_nth_kind(1) != Some(Token::In) {
            return Err(RsError::at(ErrorCode::ExpectedArgDeclaration, tok.span));
        }
        let binder = self.leaf(SyntaxKind::BinderLocal);
        self.advance();
        let domain = self.parse_expr(0)?;
        let span = tok.span.join(self.span_of(domain));
        Ok(self.tree.push(SyntaxKind::ArgDecl, span, vec![binder, domain]))
    }
}

fn binary_op(tok: Token) -> Option<BinaryOp> {
    use BinaryOp::*;
    Some(match tok {
        Token::Equiv => Logic(LogicOp::Equiv),
        Token::Implies => Logic(LogicOp::Implies),
        Token::Or => Logic(LogicOp::Or),
        Token::And => Logic(LogicOp::And),
        Token::Eq => Predicate(PredicateOp::Eq),
        Token::NotEq => Predicate(PredicateOp::NotEq),
        Token::In => Predicate(PredicateOp::In),
        Token::NotIn => Predicate(PredicateOp::NotIn),
        Token::SubsetOrEq => Predicate(PredicateOp::SubsetOrEq),
        Token::Subset => Predicate(PredicateOp::Subset),
        Token::NotSubset => Predicate(PredicateOp::NotSubset),
        Token::Lt => Predicate(PredicateOp::Lt),
        Token::Gt => Predicate(PredicateOp::Gt),
        Token::LtEq => Predicate(PredicateOp::LtEq),
        Token::GtEq => Predicate(PredicateOp::GtEq),
        Token::Union => Set(SetOp::Union),
        Token::SetMinus => Set(SetOp::Difference),
        Token::SymDiff => Set(SetOp::SymDiff),
        Token::Intersection => Set(SetOp::Intersection),
        Token::Decart => Decart,
        Token::Plus => Arithmetic(ArithmeticOp::Add),
        Token::Minus => Arithmetic(ArithmeticOp::Sub),
        Token::Star => Arithmetic(ArithmeticOp::Mul),
        _ => return None,
    })
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Logic(LogicOp::Equiv) => (2, 3),
        BinaryOp::Logic(LogicOp::Implies) => (5, 4),
        BinaryOp::Logic(LogicOp::Or) => (6, 7),
        BinaryOp::Logic(LogicOp::And) => (8, 9),
        BinaryOp::Predicate(_) => (PREDICATE_BP, PREDICATE_BP + 1),
        BinaryOp::Set(SetOp::Intersection) => (14, 15),
        BinaryOp::Set(_) => (SET_BP, SET_BP + 1),
        BinaryOp::Decart => (16, 17),
        BinaryOp::Arithmetic(ArithmeticOp::Mul) => (20, 21),
        BinaryOp::Arithmetic(_) => (18, 19),
    }
}

/// Left-associative operators on the same level collapse into one chain.
fn chains_with(first: BinaryOp, next: BinaryOp) -> bool {
    if matches!(first, BinaryOp::Predicate(_) | BinaryOp::Logic(LogicOp::Implies)) {
        return false;
    }
    infix_binding_power(first) == infix_binding_power(next)
}
