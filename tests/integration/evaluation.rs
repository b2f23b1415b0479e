mod common;

use common::{data, engine, engine_with, eval, eval_error, eval_with, ints, truth};
use rslang::diagnostics::{Reporter, RsError};
use rslang::{CheckOptions, ErrorCode, ExpressionValue, Limits, Value};

fn pair(a: i64, b: i64) -> Value {
    Value::Tuple(vec![Value::Integer(a), Value::Integer(b)])
}

// ============================================================
// Set algebra over X1 = X2 = {1, 2, 3}
// ============================================================

#[test]
fn basic_set_identities() {
    assert_eq!(data("X1 ∪ X1"), ints(&[1, 2, 3]));
    assert_eq!(data("X1 \\ X1"), Value::empty_set());
    assert_eq!(data("X1 ∩ X1"), ints(&[1, 2, 3]));
    assert_eq!(data("X1 ∆ X1"), Value::empty_set());
    assert_eq!(data("card(X1)"), Value::Integer(3));
}

#[test]
fn product_has_nine_elements() {
    let product = data("X1 × X2");
    assert_eq!(product.len(), 9);
    let items = product.as_set().unwrap();
    assert_eq!(items[0], pair(1, 1));
    assert_eq!(items[8], pair(3, 3));
    assert_eq!(data("X1 × (X2 \\ X2)"), Value::empty_set());
}

#[test]
fn power_set_has_eight_elements() {
    let power = data("ℬ(X1)");
    assert_eq!(power.len(), 8);
    assert!(power.as_set().unwrap().contains(&Value::empty_set()));
    assert!(power.as_set().unwrap().contains(&ints(&[1, 2, 3])));
}

#[test]
fn structure_operations() {
    assert_eq!(data("Pr1(S1)"), ints(&[1, 2, 3]));
    assert_eq!(data("Pr2(S1)"), ints(&[2, 3]));
    assert_eq!(data("Pr2,1(S1)"), Value::set(vec![pair(2, 1), pair(3, 2), pair(3, 3)]));
    assert_eq!(data("S1 ∩ (X1 × X2)"), data("S1"));
    assert_eq!(data("card(Fi1[X1](S1))"), Value::Integer(3));
    assert_eq!(data("red(bool(S1))"), data("S1"));
}

#[test]
fn debool_of_bool_round_trips() {
    assert_eq!(data("debool(bool(X1))"), ints(&[1, 2, 3]));
    assert_eq!(data("debool(bool(S1))"), data("S1"));
    assert_eq!(data("debool({4})"), Value::Integer(4));
}

// ============================================================
// Arithmetic and logic
// ============================================================

#[test]
fn arithmetic() {
    assert_eq!(data("card(X1) + 2 * card(S1)"), Value::Integer(9));
    assert_eq!(data("card(X1) - 5"), Value::Integer(-2));
    assert_eq!(data("D{a∈D1 | a * a > 4}"), ints(&[3, 4]));
}

#[test]
fn quantifiers() {
    assert!(truth("∀a∈X1 a=a"));
    assert!(truth("∀a∈X1 ∃b∈X2 (a, b) ∈ S1"));
    assert!(!truth("∀b∈X2 ∃a∈X1 (a, b) ∈ S1"));
    assert!(truth("∃a,b∈D1 a + b = 7"));
    assert!(truth("∀(a, b)∈S1 (a ∈ Pr1(S1) & b ∈ Pr2(S1))"));
    assert!(truth("∀a∈X1 \\ X1 ¬(a = a)"));
    assert!(!truth("∃a∈X1 \\ X1 a = a"));
}

#[test]
fn membership_and_subsets() {
    assert!(truth("X1 ∈ ℬ(X1)"));
    assert!(truth("Pr1(S1) ⊆ X1"));
    assert!(truth("D{a∈D1 | a ≠ 2} ⊂ D1"));
    assert!(!truth("X1 ⊂ X1"));
    assert!(truth("D1 ⊄ D{a∈D1 | a ≠ 2}"));
    assert!(truth("card(S1) ∈ D1 & 7 ∉ D1"));
}

#[test]
fn connectives() {
    assert!(truth("X1 = X1 ⇒ X2 = X2"));
    assert!(truth("¬(X1 = ∅) ⇔ card(X1) > 0"));
    assert!(truth("1 = 2 ⇒ X1 = ∅"));
    assert!(!truth("1 = 1 & 1 = 2"));
}

// ============================================================
// Comprehensions
// ============================================================

#[test]
fn declarative() {
    assert_eq!(data("D{a∈D1 | a ≠ 2}"), ints(&[1, 3, 4]));
    assert_eq!(data("D{(a, b)∈S1 | ∃c∈X1 ((c, b) ∈ S1 & c ≠ a)}"), Value::set(vec![pair(2, 3), pair(3, 3)]));
}

#[test]
fn imperative() {
    assert_eq!(data("I{a + b | a:∈D1; b:∈D1; a < b}"), ints(&[3, 4, 5, 6, 7]));
    assert_eq!(data("I{(b, a) | (a, b):∈S1}"), data("Pr2,1(S1)"));
    assert_eq!(data("I{c | a:∈D1; c := a * 10; c > 20}"), ints(&[30, 40]));
    assert_eq!(data("I{a | a:∈D1; 1 = 2}"), Value::empty_set());
}

#[test]
fn recursion_reaches_fixed_point() {
    assert_eq!(data("R{a := ∅ | a ∪ X1}"), ints(&[1, 2, 3]));
    assert_eq!(data("R{a := 0 | a < 10 | a + 3}"), Value::Integer(12));
    assert_eq!(data("R{a := 1 | a < 1 | a + 1}"), Value::Integer(1));
}

// ============================================================
// Functions and predicates
// ============================================================

#[test]
fn calls() {
    let mut engine = engine();
    engine.define("F1", "[a∈ℬ(R1)] card(a)").unwrap();
    engine.define("F2", "[a∈R1, b∈R2] (b, a)").unwrap();
    engine.define("P1", "[a∈ℬ(R1)] card(a) > 2").unwrap();

    assert_eq!(eval_with(&engine, "F1[X1] + F1[S1]").unwrap(), ExpressionValue::Data(Value::Integer(6)));
    assert_eq!(eval_with(&engine, "F2[1, 2]").unwrap(), ExpressionValue::Data(pair(2, 1)));
    assert_eq!(eval_with(&engine, "P1[X1] & ¬P1[X1 \\ X1]").unwrap(), ExpressionValue::Logic(true));
    assert_eq!(
        eval_with(&engine, "D{a∈D1 | F1[D{b∈D1 | b ≤ a}] = 2}").unwrap(),
        ExpressionValue::Data(ints(&[2]))
    );
}

// ============================================================
// Runtime errors
// ============================================================

#[test]
fn mutually_recursive_definitions_hit_the_call_limit() {
    let mut engine = engine_with(Limits { max_call_depth: 16, ..Limits::default() });
    engine.define("F1", "[a∈ℬ(R1)] card(a)").unwrap();
    engine.define("F2", "[a∈ℬ(R1)] F1[a]").unwrap();
    engine.define("F1", "[a∈ℬ(R1)] F2[a]").unwrap();

    let err = eval_with(&engine, "card(X1) + F1[X1]").unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueIterationsLimit);
    assert_eq!(err.params, vec!["16".to_string()]);
    assert_eq!(err.position, "card(X1) + ".len());
}

#[test]
fn unbounded_domain_is_not_iterated() {
    let engine = engine();
    let check = engine.check("∀a∈Z a=a", CheckOptions::default());
    assert!(!check.success);
    assert_eq!(check.errors[0].code, ErrorCode::InvalidPropertyUsage);

    let mut seen = Vec::new();
    let mut sink = |e: &RsError| seen.push(e.code);
    let reporter: Reporter<'_> = &mut sink;
    let result = engine.evaluate(&check.ast, engine.values(), engine.functions(), Some(reporter));
    assert!(!result.success);
    assert_eq!(seen, vec![ErrorCode::ValueIterateInfinity]);
}

#[test]
fn limits_abort_evaluation() {
    let tight = Limits { max_set_cardinality: 8, max_boolean_base: 2, max_iterations: 5, ..Limits::default() };
    let engine = engine_with(tight);
    assert_eq!(eval_error(&engine, "X1 × X2"), ErrorCode::ValueTypedOverflow);
    assert_eq!(eval_error(&engine, "ℬ(X1)"), ErrorCode::ValueBooleanLimit);
    assert_eq!(eval_error(&engine, "R{a := 0 | a < 100 | a + 1}"), ErrorCode::ValueIterationsLimit);
    assert_eq!(eval_error(&engine, "∀a,b∈X1 a = a"), ErrorCode::ValueIterationsLimit);
}

#[test]
fn invalid_debool() {
    let err = eval("debool(X1)").unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueInvalidDebool);
    assert_eq!(err.params, vec!["3".to_string()]);
}

#[test]
fn missing_values_are_reported_at_the_identifier() {
    let mut engine = engine();
    engine.add_base("X3", false);
    let err = eval_with(&engine, "card(X1) + card(X3)").unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueGlobalMissing);
    assert_eq!(err.position, "card(X1) + card(".len());
}

#[test]
fn arithmetic_overflow() {
    let mut engine = engine();
    engine.set_value("D1", ints(&[i64::MAX]));
    assert_eq!(eval_error(&engine, "I{a + 1 | a:∈D1}"), ErrorCode::ValueArithmeticOverflow);
}

#[test]
fn iteration_count() {
    let engine = engine();
    let (check, result) = engine.calculate("D{a∈D1 | a ≠ 2}");
    assert!(check.success);
    assert_eq!(result.unwrap().iterations, 4);
}
