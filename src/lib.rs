pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod normalize;
pub mod scope;
pub mod typeck;
pub mod value_class;
pub mod calc;
pub mod config;
pub mod engine;

pub use calc::value::Value;
pub use calc::{EvalResult, ExpressionValue};
pub use config::Limits;
pub use diagnostics::{ErrorCode, RsError};
pub use engine::{CheckOptions, CheckResult, Engine};

use parser::ast::Ast;

/// Parse and normalize source text (lex → parse → normalize).
///
/// Returns the tree together with every lexical, syntax and literal error,
/// sorted by position. A tree whose root is flagged must not be checked.
pub fn parse_ast(source: &str) -> (Ast, Vec<RsError>) {
    let mut tree = parser::parse(source);
    let ast = normalize::normalize(&mut tree, source);
    (ast, tree.errors)
}
