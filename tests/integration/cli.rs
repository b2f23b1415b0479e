mod common;

use std::path::PathBuf;
use std::process::Output;

use common::rslang;

const ENV: &str = r#"
[[base]]
alias = "X1"
value = "{1, 2, 3}"

[global.S1]
type = "ℬ(X1×X1)"
value = "{(1, 2), (2, 3)}"

[global.F1]
definition = "[a∈ℬ(R1)] card(a)"
"#;

fn write_env(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("env.toml");
    std::fs::write(&path, text).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let env = write_env(&dir, ENV);
    rslang().args(args).arg("--env").arg(&env).output().unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!("invalid JSON ({e}): {}", String::from_utf8_lossy(&output.stdout))
    })
}

#[test]
fn check_prints_type_and_class() {
    let output = run(&["check", "S1 ∪ X1 × X1"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("type: ℬ(X1×X1)"), "{stdout}");
    assert!(stdout.contains("class: value"), "{stdout}");
}

#[test]
fn check_json() {
    let output = run(&["check", "ℬ(X1)", "--json"]);
    assert!(output.status.success());
    let value = json(&output);
    assert_eq!(value["success"], true);
    assert_eq!(value["type"], "ℬ(ℬ(X1))");
    assert_eq!(value["value_class"], "property");
    assert_eq!(value["errors"].as_array().map(Vec::len), Some(0));
}

#[test]
fn check_expect_and_domain() {
    let output = run(&["check", "card(X1)", "--expect", "logic", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let value = json(&output);
    assert_eq!(value["errors"][0]["code"], "unexpectedExpressionType");
    assert_eq!(value["errors"][0]["params"][0], "Logic");

    let output = run(&["check", "card(X1)", "--domain"]);
    assert_eq!(output.status.code(), Some(1));
    let output = run(&["check", "Pr1(S1)", "--domain"]);
    assert!(output.status.success());
}

#[test]
fn eval_prints_value() {
    let output = run(&["eval", "F1[S1] + card(X1)"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "5");

    let output = run(&["eval", "Pr2(S1)"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "{2, 3}");
}

#[test]
fn eval_json_reports_runtime_errors() {
    let output = run(&["eval", "debool(X1)", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let value = json(&output);
    assert_eq!(value["success"], false);
    assert_eq!(value["type"], "X1");
    assert_eq!(value["errors"][0]["code"], "valueInvalidDebool");
    assert_eq!(value["errors"][0]["position"], 0);
}

#[test]
fn eval_json_success() {
    let output = run(&["eval", "∀a∈X1 ∃b∈X1 (a, b) ∈ S1 ∨ (a, a) ∉ S1", "--json"]);
    let value = json(&output);
    assert_eq!(value["success"], false);

    let output = run(&["eval", "∀a∈X1 (∃b∈X1 (a, b) ∈ S1 ∨ (a, a) ∉ S1)", "--json"]);
    assert!(output.status.success());
    let value = json(&output);
    assert_eq!(value["success"], true);
    assert_eq!(value["value"], "true");
    assert_eq!(value["iterations"], 11);
}

#[test]
fn errors_are_rendered_on_stderr() {
    let output = run(&["check", "X1 ∪ X9"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0x8804"), "{stderr}");
    assert!(stderr.contains("X9"), "{stderr}");
}

#[test]
fn ast_command_without_environment() {
    let output = rslang().args(["ast", "a ∈ X1"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Predicate(In)"), "{stdout}");

    let output = rslang().args(["ast", "(X1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn deeply_nested_input_is_reported() {
    let depth = 5000;
    let source = format!("{}X1{}", "(".repeat(depth), ")".repeat(depth));
    let output = rslang().args(["ast", &source]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("0x8416"));
}

#[test]
fn bad_environment_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let env = write_env(&dir, "[global.S1]\ntype = \"ℬ(S9)\"\n");
    let output = rslang().args(["check", "X1"]).arg("--env").arg(&env).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("S1:"));

    let output = rslang().args(["check", "X1", "--env", "/nonexistent/env.toml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}
