pub mod token;

use logos::Logos;
use crate::diagnostics::{ErrorCode, RsError};
use crate::span::{Span, Spanned};
use token::Token;

/// Token stream plus the lexical errors hit while producing it.
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Spanned<Token>>,
    pub errors: Vec<RsError>,
}

/// Tokenize `source`. Unknown symbols are reported and skipped so the parser
/// still sees the rest of the expression.
pub fn lex(source: &str) -> Lexed {
    let mut out = Lexed::default();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(tok) => out.tokens.push(Spanned::new(tok, span)),
            Err(()) => {
                // coalesce a run of adjacent garbage into one report
                if let Some(last) = out.errors.last_mut() {
                    if last.code == ErrorCode::UnknownSymbol
                        && last.position + last.params[0].len() == span.start
                    {
                        last.params[0].push_str(span.text(source));
                        continue;
                    }
                }
                out.errors.push(RsError::with_param(ErrorCode::UnknownSymbol, span, span.text(source)));
            }
        }
    }

    out
}
