//! Property-based tests for lexer and parser invariants.
//!
//! The parser must never panic, must report every error inside the source
//! and must accept every expression produced by the term grammar below.

use proptest::prelude::*;
use rslang::lexer::lex;
use rslang::parse_ast;

// Token soup over the whole alphabet, including symbols the lexer rejects.
fn arb_token_soup() -> impl Strategy<Value = String> {
    let atoms = prop::sample::select(vec![
        "X1", "S1", "F1", "R1", "a", "b", "42", "Z", "∅", "¬", "&", "∨", "⇒", "⇔", "∀", "∃", "=", "≠", "∈",
        "∉", "⊆", "⊂", "⊄", "<", "≤", "∪", "∩", "\\", "∆", "×", "ℬ", "+", "*", "card", "debool", "red", "pr1",
        "Pr1,2", "Fi1", "D{", "I{", "R{", "(", ")", "[", "]", "{", "}", ",", ";", "|", ":=", ":∈", "#", "?",
    ]);
    prop::collection::vec(atoms, 0..20).prop_map(|parts| parts.join(" "))
}

// Well-formed set terms over one base.
fn arb_term() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![Just("X1".to_string()), Just("(X1 ∪ X1)".to_string())];
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} ∪ {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} ∩ {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} \\ {b}")),
            inner.clone().prop_map(|a| format!("D{{x∈{a} | x ∈ {a}}}")),
            inner.prop_map(|a| format!("debool(bool({a}))")),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn lexer_does_not_panic(source in "\\PC{0,40}") {
        let lexed = lex(&source);
        for tok in &lexed.tokens {
            prop_assert!(tok.span.end <= source.len());
        }
    }

    #[test]
    fn parser_reports_errors_inside_source(source in arb_token_soup()) {
        let (ast, errors) = parse_ast(&source);
        for err in &errors {
            prop_assert!(err.position <= source.len());
        }
        prop_assert!(errors.windows(2).all(|w| w[0].position <= w[1].position));
        if errors.is_empty() {
            prop_assert!(!ast.has_error());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn well_formed_terms_parse_cleanly(source in arb_term()) {
        let (ast, errors) = parse_ast(&source);
        prop_assert!(errors.is_empty(), "{}: {:?}", source, errors);
        prop_assert!(!ast.has_error());
    }

    #[test]
    fn parse_is_deterministic(source in arb_token_soup()) {
        let (first, first_errors) = parse_ast(&source);
        let (second, second_errors) = parse_ast(&source);
        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert_eq!(first_errors, second_errors);
    }
}
