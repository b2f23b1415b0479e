#![allow(dead_code)]

use std::process::Command;

use rslang::value_class::ValueClass;
use rslang::{CheckOptions, CheckResult, Engine, ErrorCode, ExpressionValue, Limits, RsError, Value};

pub fn rslang() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rslang"))
}

pub fn ints(items: &[i64]) -> Value {
    Value::set(items.iter().map(|&n| Value::Integer(n)).collect())
}

/// Engine with `X1 = X2 = {1, 2, 3}`, an ordered constant `C1 = {10, 20}`,
/// a structure `S1 ⊆ X1×X2` and a term `D1 = {1, 2, 3, 4}` over `Z`.
pub fn engine_with(limits: Limits) -> Engine {
    let mut engine = Engine::new(limits);
    engine.add_base("X1", false);
    engine.add_base("X2", false);
    engine.add_base("C1", true);
    engine.set_value("X1", ints(&[1, 2, 3]));
    engine.set_value("X2", ints(&[1, 2, 3]));
    engine.set_value("C1", ints(&[10, 20]));

    let s1 = engine.parse_typification("ℬ(X1×X2)").unwrap();
    engine.set_global("S1", Some(s1.into()), Some(ValueClass::Value));
    let s1 = engine.parse_value("{(1, 2), (2, 3), (3, 3)}").unwrap();
    engine.set_value("S1", s1);

    let d1 = engine.parse_typification("ℬ(Z)").unwrap();
    engine.set_global("D1", Some(d1.into()), Some(ValueClass::Value));
    engine.set_value("D1", ints(&[1, 2, 3, 4]));
    engine
}

pub fn engine() -> Engine {
    engine_with(Limits::default())
}

pub fn check(source: &str) -> CheckResult {
    engine().check(source, CheckOptions::default())
}

pub fn type_of(source: &str) -> String {
    let result = check(source);
    assert!(result.success, "{source}: {:?}", result.errors);
    result.ty.map(|t| t.to_string()).unwrap_or_default()
}

/// First critical error reported for `source`.
pub fn check_error(source: &str) -> RsError {
    let result = check(source);
    assert!(!result.success, "{source} unexpectedly succeeded");
    result.errors.into_iter().find(RsError::is_critical).expect("critical error")
}

pub fn eval_with(engine: &Engine, source: &str) -> Result<ExpressionValue, RsError> {
    let (check, eval) = engine.calculate(source);
    match eval {
        Some(result) if result.success => Ok(result.value.expect("value on success")),
        _ => Err(check.errors.into_iter().find(RsError::is_critical).expect("critical error")),
    }
}

pub fn eval(source: &str) -> Result<ExpressionValue, RsError> {
    eval_with(&engine(), source)
}

pub fn data(source: &str) -> Value {
    match eval(source) {
        Ok(ExpressionValue::Data(v)) => v,
        other => panic!("{source}: expected data, found {other:?}"),
    }
}

pub fn truth(source: &str) -> bool {
    match eval(source) {
        Ok(ExpressionValue::Logic(b)) => b,
        other => panic!("{source}: expected logic, found {other:?}"),
    }
}

pub fn eval_error(engine: &Engine, source: &str) -> ErrorCode {
    match eval_with(engine, source) {
        Ok(v) => panic!("{source} unexpectedly evaluated to {v}"),
        Err(e) => e.code,
    }
}
