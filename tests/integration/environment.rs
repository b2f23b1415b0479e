mod common;

use std::io::Write;

use rslang::config::{ConfigError, Environment};
use rslang::engine::EnvironmentError;
use rslang::value_class::ValueClass;
use rslang::{CheckOptions, Engine, ErrorCode, ExpressionValue, Value};

const ENV: &str = r#"
[limits]
max_boolean_base = 4

[[base]]
alias = "X1"
value = "{1, 2, 3}"

[[base]]
alias = "C1"
ordered = true
value = "{10, 20, 30}"

[global.S1]
type = "ℬ(X1×X1)"
value = "{(1, 2), (2, 3)}"

[global.D1]
value = "{1, 2}"

[global.D2]
type = "ℬ(Z)"

[global.F1]
definition = "[a∈ℬ(R1)] card(a)"

[global.P1]
definition = "[a∈C1] a > 15"
"#;

fn load(text: &str) -> Result<Engine, EnvironmentError> {
    Engine::from_environment(&Environment::parse(text).unwrap())
}

fn calc(engine: &Engine, source: &str) -> ExpressionValue {
    let (check, eval) = engine.calculate(source);
    assert!(check.success, "{source}: {:?}", check.errors);
    eval.and_then(|r| r.value).expect("evaluated")
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ENV.as_bytes()).unwrap();
    let env = Environment::load(file.path()).unwrap();
    assert_eq!(env.limits.max_boolean_base, 4);
    assert_eq!(env.base.len(), 2);
    assert_eq!(env.global.len(), 5);
}

#[test]
fn engine_from_environment() {
    let engine = load(ENV).unwrap();
    assert_eq!(engine.limits().max_boolean_base, 4);
    assert_eq!(calc(&engine, "F1[S1] + F1[X1]"), ExpressionValue::Data(Value::Integer(5)));
    assert_eq!(calc(&engine, "card(D{c∈C1 | P1[c]})"), ExpressionValue::Data(Value::Integer(2)));
    assert_eq!(calc(&engine, "∀(a, b)∈S1 (b, a) ∉ S1"), ExpressionValue::Logic(true));
}

#[test]
fn untyped_globals_infer_from_value() {
    let engine = load(ENV).unwrap();
    let result = engine.check("D1 ∪ {3}", CheckOptions::default());
    assert!(result.success);
    assert_eq!(result.ty.map(|t| t.to_string()).as_deref(), Some("ℬ(Z)"));
    assert_eq!(result.value_class, Some(ValueClass::Value));
}

#[test]
fn globals_without_value_are_properties() {
    let engine = load(ENV).unwrap();
    let result = engine.check("D2", CheckOptions::default());
    assert_eq!(result.value_class, Some(ValueClass::Property));
    let result = engine.check("card(D2)", CheckOptions::default());
    assert_eq!(result.errors[0].code, ErrorCode::InvalidPropertyUsage);
}

#[test]
fn limits_from_file_apply() {
    let engine = load(ENV).unwrap();
    let (_, eval) = engine.calculate("ℬ(C1 ∪ {40, 50})");
    let eval = eval.unwrap();
    assert!(!eval.success);
}

#[test]
fn bad_expressions_name_the_global() {
    let err = load("[global.S1]\ntype = \"ℬ(S9)\"\n").unwrap_err();
    assert!(err.to_string().starts_with("S1:"), "{err}");
    assert!(matches!(err, EnvironmentError::Expression { ref source, .. } if source.code == ErrorCode::InvalidTypification));

    let err = load("[[base]]\nalias = \"X1\"\nvalue = \"1 + 1\"\n").unwrap_err();
    assert!(matches!(err, EnvironmentError::Mismatch { ref alias, .. } if alias == "X1"));

    let err = load("[global.F1]\ndefinition = \"[a∈X7] a\"\n").unwrap_err();
    assert!(err.to_string().starts_with("F1:"), "{err}");
}

#[test]
fn invalid_files() {
    assert!(matches!(Environment::parse("[[base]]\nalias = 1\n"), Err(ConfigError::Toml(_))));
    assert!(matches!(Environment::parse("[global.Q1]\ntype = \"Z\"\n"), Err(ConfigError::Invalid { .. })));
}
