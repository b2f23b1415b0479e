//! Property-based tests for the canonical set representation and the
//! evaluator's set constructions.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rslang::calc::value::{self, Value};
use rslang::value_class::ValueClass;
use rslang::{Engine, ExpressionValue};

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = (-5i64..5).prop_map(Value::Integer);
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..3).prop_map(Value::Tuple),
            prop::collection::vec(inner, 0..4).prop_map(Value::set),
        ]
    })
}

fn arb_ints() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-20i64..20, 0..8)
}

fn ints(items: &[i64]) -> Value {
    Value::set(items.iter().map(|&n| Value::Integer(n)).collect())
}

fn model(items: &[i64]) -> BTreeSet<i64> {
    items.iter().copied().collect()
}

fn as_ints(v: &Value) -> Vec<i64> {
    v.as_set().unwrap().iter().map(|e| e.as_integer().unwrap()).collect()
}

/// Engine with two integer terms `D1` and `D2` bound to the given sets.
fn engine(d1: &[i64], d2: &[i64]) -> Engine {
    let mut engine = Engine::default();
    for (alias, items) in [("D1", d1), ("D2", d2)] {
        let ty = engine.parse_typification("ℬ(Z)").unwrap();
        engine.set_global(alias, Some(ty.into()), Some(ValueClass::Value));
        engine.set_value(alias, ints(items));
    }
    engine
}

fn eval(engine: &Engine, source: &str) -> Value {
    let (check, result) = engine.calculate(source);
    match result.and_then(|r| r.value) {
        Some(ExpressionValue::Data(v)) => v,
        other => panic!("{source}: {other:?} {:?}", check.errors),
    }
}

// ============================================================
// Canonical form
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn sets_are_sorted_and_unique(items in prop::collection::vec(arb_value(), 0..8)) {
        let set = Value::set(items.clone());
        let elements = set.as_set().unwrap();
        prop_assert!(elements.windows(2).all(|w| w[0] < w[1]));
        for item in &items {
            prop_assert!(value::contains(elements, item));
        }
    }

    #[test]
    fn compare_is_consistent_with_equality(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a.cmp(&b) == std::cmp::Ordering::Equal, a == b);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn set_construction_is_order_independent(mut items in prop::collection::vec(arb_value(), 0..6)) {
        let forward = Value::set(items.clone());
        items.reverse();
        prop_assert_eq!(forward, Value::set(items));
    }
}

// ============================================================
// Merge-based algebra against a BTreeSet model
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn algebra_matches_model(a in arb_ints(), b in arb_ints()) {
        let (sa, sb) = (ints(&a), ints(&b));
        let (x, y) = (sa.as_set().unwrap(), sb.as_set().unwrap());
        let (ma, mb) = (model(&a), model(&b));

        let union: Vec<i64> = ma.union(&mb).copied().collect();
        let intersection: Vec<i64> = ma.intersection(&mb).copied().collect();
        let difference: Vec<i64> = ma.difference(&mb).copied().collect();
        let symmetric: Vec<i64> = ma.symmetric_difference(&mb).copied().collect();

        prop_assert_eq!(as_ints(&Value::Set(value::union(x, y))), union);
        prop_assert_eq!(as_ints(&Value::Set(value::intersection(x, y))), intersection);
        prop_assert_eq!(as_ints(&Value::Set(value::difference(x, y))), difference);
        prop_assert_eq!(as_ints(&Value::Set(value::symmetric_difference(x, y))), symmetric);
        prop_assert_eq!(value::is_subset(x, y), ma.is_subset(&mb));
    }
}

// ============================================================
// Evaluator constructions
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn product_cardinality(a in arb_ints(), b in arb_ints()) {
        let engine = engine(&a, &b);
        let product = eval(&engine, "D1 × D2");
        prop_assert_eq!(product.len(), model(&a).len() * model(&b).len());
    }

    #[test]
    fn power_set_cardinality(a in prop::collection::vec(-20i64..20, 0..7)) {
        let engine = engine(&a, &[]);
        let power = eval(&engine, "ℬ(D1)");
        prop_assert_eq!(power.len(), 1usize << model(&a).len());
    }

    #[test]
    fn debool_of_bool_is_identity(a in arb_ints()) {
        let engine = engine(&a, &[]);
        prop_assert_eq!(eval(&engine, "debool(bool(D1))"), ints(&a));
    }

    #[test]
    fn evaluated_algebra_matches_model(a in arb_ints(), b in arb_ints()) {
        let engine = engine(&a, &b);
        let (ma, mb) = (model(&a), model(&b));
        let union: Vec<i64> = ma.union(&mb).copied().collect();
        let difference: Vec<i64> = ma.difference(&mb).copied().collect();
        prop_assert_eq!(as_ints(&eval(&engine, "D1 ∪ D2")), union);
        prop_assert_eq!(as_ints(&eval(&engine, "D1 \\ D2")), difference);
        prop_assert_eq!(as_ints(&eval(&engine, "D{x∈D1 | x ∈ D2}")), ma.intersection(&mb).copied().collect::<Vec<_>>());
    }
}
