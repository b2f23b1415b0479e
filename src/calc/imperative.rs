use crate::parser::ast::{Ast, NodeId, NodeKind};
use crate::span::Span;

use super::value::Value;
use super::Calculator;

/// An active `binder :∈ domain` block.
struct Iteration {
    block: usize,
    binder: NodeId,
    elements: Vec<Value>,
    cursor: usize,
}

impl Calculator<'_> {
    /// Evaluate `I{result | block; ...}` as nested loops over its iterate
    /// blocks, driven by an explicit stack instead of recursion.
    ///
    /// A failing guard or an empty domain backtracks to the innermost
    /// iteration that still has elements; domains of later blocks are
    /// re-evaluated each time they are re-entered.
    pub(super) fn imperative(&mut self, ast: &Ast, span: Span, result: NodeId, blocks: &[NodeId]) -> Option<Value> {
        let mut stack: Vec<Iteration> = Vec::new();
        let mut produced = Vec::new();
        let mut pc = 0;
        self.locals.push_scope();

        loop {
            let proceed = match blocks.get(pc).map(|&b| (b, ast.kind(b))) {
                None => {
                    produced.push(self.data(ast, result)?);
                    false
                }
                Some((_, NodeKind::IterateBlock { binder, domain })) => {
                    let elements = self.elements(ast, *domain)?;
                    match elements.first().cloned() {
                        Some(first) => {
                            self.tick(span)?;
                            self.bind(ast, *binder, first)?;
                            stack.push(Iteration { block: pc, binder: *binder, elements, cursor: 0 });
                            true
                        }
                        None => false,
                    }
                }
                Some((_, NodeKind::AssignBlock { binder, value })) => {
                    let v = self.data(ast, *value)?;
                    self.bind(ast, *binder, v)?;
                    true
                }
                Some((guard, _)) => self.logic(ast, guard)?,
            };
            if proceed {
                pc += 1;
                continue;
            }

            // backtrack
            loop {
                let Some(top) = stack.last_mut() else {
                    self.locals.pop_scope();
                    return Some(Value::set(produced));
                };
                top.cursor += 1;
                if let Some(next) = top.elements.get(top.cursor).cloned() {
                    let (binder, block) = (top.binder, top.block);
                    self.tick(span)?;
                    self.bind(ast, binder, next)?;
                    pc = block + 1;
                    break;
                }
                stack.pop();
            }
        }
    }
}
