mod common;

use common::{check, check_error, engine, type_of};
use rslang::typeck::types::TypeClass;
use rslang::value_class::ValueClass;
use rslang::{CheckOptions, ErrorCode};

// ============================================================
// Typifications of terms
// ============================================================

#[test]
fn globals_and_products() {
    assert_eq!(type_of("X1"), "ℬ(X1)");
    assert_eq!(type_of("S1"), "ℬ(X1×X2)");
    assert_eq!(type_of("X1 × X2 × X1"), "ℬ(X1×X2×X1)");
    assert_eq!(type_of("(X1 × X2) × X1"), "ℬ((X1×X2)×X1)");
    assert_eq!(type_of("ℬ(X1 × X2)"), "ℬ(ℬ(X1×X2))");
}

#[test]
fn set_algebra_keeps_operand_type() {
    assert_eq!(type_of("X1 ∪ X1 ∩ X1"), "ℬ(X1)");
    assert_eq!(type_of("S1 \\ (X1 × X2)"), "ℬ(X1×X2)");
    assert_eq!(type_of("D1 ∆ {5}"), "ℬ(Z)");
    assert_eq!(type_of("∅ ∪ X2"), "ℬ(X2)");
}

#[test]
fn text_operations() {
    assert_eq!(type_of("card(S1)"), "Z");
    assert_eq!(type_of("bool(X1)"), "ℬ(ℬ(X1))");
    assert_eq!(type_of("debool(bool(X1))"), "ℬ(X1)");
    assert_eq!(type_of("red(ℬ(S1))"), "ℬ(X1×X2)");
    assert_eq!(type_of("Pr2(S1)"), "ℬ(X2)");
    assert_eq!(type_of("Pr2,1(S1)"), "ℬ(X2×X1)");
    assert_eq!(type_of("Fi2[X2](S1)"), "ℬ(X1×X2)");
}

#[test]
fn arithmetic_and_ordering() {
    assert_eq!(type_of("card(X1) + 2 * card(S1)"), "Z");
    assert_eq!(type_of("card(X1) ≤ card(S1)"), "Logic");
    assert_eq!(type_of("D{c∈C1 | c > 10}"), "ℬ(C1)");
}

#[test]
fn comprehensions_and_recursion() {
    assert_eq!(type_of("D{(a, b)∈S1 | a ∈ X1}"), "ℬ(X1×X2)");
    assert_eq!(type_of("I{(b, a) | (a, b):∈S1}"), "ℬ(X2×X1)");
    assert_eq!(type_of("I{a + b | a:∈D1; b:∈D1; a < b}"), "ℬ(Z)");
    assert_eq!(type_of("R{a := ∅ | a ∪ X1}"), "ℬ(X1)");
    assert_eq!(type_of("R{a := 0 | a < 3 | a + 1}"), "Z");
}

#[test]
fn logic_and_quantifiers() {
    assert_eq!(type_of("∀a∈X1 ∃b∈X2 (a, b) ∈ S1"), "Logic");
    assert_eq!(type_of("X1 ⊆ X1 ⇒ ¬(S1 = ∅)"), "Logic");
    assert_eq!(type_of("∀a,b∈D1 a + b = b + a"), "Logic");
}

// ============================================================
// Functions and predicates
// ============================================================

#[test]
fn define_registers_signatures() {
    let mut engine = engine();
    let f1 = engine.define("F1", "[a∈ℬ(R1)] card(a)").unwrap();
    assert_eq!(f1.to_string(), "[ℬ(R1)] → Z");
    let p1 = engine.define("P1", "[a∈X1, b∈X1] a = b").unwrap();
    assert_eq!(p1.class(), TypeClass::Predicate);

    let result = engine.check("P1[debool({1}), 1]", CheckOptions::default());
    assert!(!result.success);

    let result = engine.check("F1[S1] + F1[X2]", CheckOptions::default());
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.ty.map(|t| t.to_string()).as_deref(), Some("Z"));
}

#[test]
fn generic_results_are_substituted_per_call() {
    let mut engine = engine();
    engine.define("F1", "[a∈ℬ(R1)] debool(a)").unwrap();
    let result = engine.check("(F1[X1], F1[S1])", CheckOptions::default());
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.ty.map(|t| t.to_string()).as_deref(), Some("X1×(X1×X2)"));
}

#[test]
fn unbound_generics_stay_inside_the_call() {
    let mut engine = engine();
    engine.define("F1", "[a∈ℬ(R1)] debool(a)").unwrap();
    let result = engine.check("{F1[∅]} ∪ X1", CheckOptions::default());
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.ty.map(|t| t.to_string()).as_deref(), Some("ℬ(X1)"));
}

// ============================================================
// Options and value classes
// ============================================================

#[test]
fn expected_class() {
    let options = CheckOptions { expected: Some(TypeClass::Typification), ..CheckOptions::default() };
    let result = engine().check("X1 = X1", options);
    assert!(!result.success);
    assert_eq!(result.errors[0].code, ErrorCode::UnexpectedExpressionType);
    assert_eq!(result.errors[0].params, vec!["Typification".to_string(), "Logic".to_string()]);
}

#[test]
fn domain_option() {
    let options = CheckOptions { is_domain: true, ..CheckOptions::default() };
    assert!(engine().check("X1 × X2", options).success);
    let result = engine().check("1 + 1", options);
    assert_eq!(result.errors[0].code, ErrorCode::GlobalStructure);
}

#[test]
fn value_classes() {
    assert_eq!(check("X1 × X2").value_class, Some(ValueClass::Value));
    assert_eq!(check("ℬ(X1)").value_class, Some(ValueClass::Property));
    assert_eq!(check("X1 ∪ D{a∈X1 | a ∈ X1}").value_class, Some(ValueClass::Value));
    assert_eq!(check("X1 ∈ ℬ(X1)").value_class, Some(ValueClass::Value));

    let result = check("card(ℬ(X1))");
    assert!(!result.success);
    assert_eq!(result.errors[0].code, ErrorCode::InvalidPropertyUsage);
    assert_eq!(result.errors[0].position, "card(".len());
}

// ============================================================
// Semantic errors
// ============================================================

#[test]
fn distinct_bases_do_not_merge() {
    assert_eq!(check_error("X1 ∪ X2").code, ErrorCode::TypesNotEqual);
    assert_eq!(check_error("X1 ∩ {1}").code, ErrorCode::TypesNotEqual);
}

#[test]
fn undeclared_global_is_reported_once() {
    let result = check("∀a∈X1 ∃b∈X2 (a, b) ∈ S1 ∪ S9");
    let critical: Vec<_> = result.errors.iter().filter(|e| e.is_critical()).collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].code, ErrorCode::GlobalNotTyped);
    assert_eq!(critical[0].position, "∀a∈X1 ∃b∈X2 (a, b) ∈ S1 ∪ ".len());
    assert_eq!(critical[0].params, vec!["S9".to_string()]);
}

#[test]
fn locals() {
    assert_eq!(check_error("x ∈ X1").code, ErrorCode::LocalUndeclared);
    assert_eq!(check_error("D{a∈X1 | ∀a∈X1 a=a}").code, ErrorCode::LocalShadowing);

    let result = check("D{a∈X1 | 1 = 1}");
    assert!(result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, ErrorCode::LocalNotUsed);
    assert!(!result.errors[0].is_critical());
}

#[test]
fn radicals_only_in_argument_declarations() {
    assert_eq!(check_error("R1 ∪ R1").code, ErrorCode::RadicalUsage);
    let mut engine = engine();
    assert!(engine.define("F1", "[a∈R1] {a}").is_ok());
}
