mod common;

use common::check;
use rslang::{parse_ast, ErrorCode};

fn codes(source: &str) -> Vec<ErrorCode> {
    parse_ast(source).1.into_iter().map(|e| e.code).collect()
}

#[test]
fn unknown_symbols() {
    let (ast, errors) = parse_ast("X1 ∪ # ∪ X1");
    assert!(ast.has_error());
    assert_eq!(errors[0].code, ErrorCode::UnknownSymbol);
    assert_eq!(errors[0].position, "X1 ∪ ".len());
    assert_eq!(errors[0].params, vec!["#".to_string()]);
}

#[test]
fn unbalanced_delimiters() {
    assert_eq!(codes("(X1 ∪ X1"), vec![ErrorCode::MissingParenthesis]);
    assert_eq!(codes("D{a∈X1 | a = a"), vec![ErrorCode::MissingCurlyBrace]);
}

#[test]
fn malformed_constructs() {
    assert_eq!(codes("∃a X1 a = a"), vec![ErrorCode::InvalidQuantifier]);
    assert_eq!(codes("I{a | }"), vec![ErrorCode::InvalidImperative]);
    assert_eq!(codes("[X1] X1"), vec![ErrorCode::ExpectedArgDeclaration]);
    assert_eq!(codes(""), vec![ErrorCode::UnexpectedEnd]);
}

#[test]
fn syntax_errors_stop_the_check() {
    let result = check("X1 ∪ (X1");
    assert!(!result.success);
    assert_eq!(result.ty, None);
    assert_eq!(result.value_class, None);
    assert!(result.errors.iter().all(|e| e.is_critical()));
    assert!(result.ast.has_error());
}

#[test]
fn literal_overflow() {
    let (ast, errors) = parse_ast("99999999999999999999 + 1");
    assert!(ast.has_error());
    assert_eq!(errors[0].code, ErrorCode::ValueArithmeticOverflow);
    assert_eq!(errors[0].position, 0);
}

#[test]
fn errors_are_sorted_by_position() {
    let (_, errors) = parse_ast("(X1 ∪) ∪ {∀}");
    assert!(errors.len() >= 2);
    assert!(errors.windows(2).all(|w| w[0].position <= w[1].position));
}

#[test]
fn chained_predicates_are_rejected() {
    let result = check("card(X1) = 3 = 3");
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, ErrorCode::PredicateChain);
    assert_eq!(result.errors[0].position, "card(X1) = 3 ".len());
    assert!(check("(card(X1) = 3) ⇔ 3 = 3").success);
}

#[test]
fn nesting_is_bounded() {
    let depth = 4000;
    let source = format!("card({}X1{})", "(".repeat(depth), ")".repeat(depth));
    let result = check(&source);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, ErrorCode::NestingTooDeep);
}
