use std::fs;
use std::path::{Path, PathBuf};

use predicates::prelude::predicate;
use serde_json::Value;
use tempfile::{TempDir, tempdir};

const RESPONSE: &str =
    r#"{"code": 200, "data": {"user": {"id": 42, "name": "Ada"}, "tags": ["a", "b"]}}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn fixture(group: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let group = write(dir.path(), "group.yaml", group);
    let response = write(dir.path(), "response.json", RESPONSE);
    (dir, group, response)
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

#[test]
fn passing_group_exits_zero() {
    let (_dir, group, response) = fixture(
        r#"
name: user
assertions:
  - name: code
    kind: equal
    locator: code
    expected: {literal: 200}
  - name: name
    kind: regex_match
    locator: data.user.name
    expected: {literal: "^ada$"}
    options: {ignore_case: true}
  - name: tags
    kind: contains
    locator: data.tags
    expected: {literal: b}
"#,
    );
    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("assert")
        .arg("--group")
        .arg(&group)
        .arg("--response")
        .arg(&response)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));
    let payload = stdout_json(&output);
    assert_eq!(payload["passed"], Value::Bool(true));
    assert_eq!(payload["results"].as_array().map(Vec::len), Some(3));
}

#[test]
fn failing_group_exits_two_with_rendered_template() {
    let (dir, group, response) = fixture(
        r#"
name: user
assertions:
  - name: id
    kind: equal
    locator: data.user.id
    expected: {dependency: user_id}
    error_template: "${name} mismatch: ${actual_value} != ${expected_value}"
"#,
    );
    let deps = write(
        dir.path(),
        "deps.json",
        r#"[{"id": "user_id", "source_type": "redis",
             "config": {"redis": {"key": "user:current", "field": "id", "value_type": "hash"}},
             "transform": {"enable_type_conversion": true, "target_type": "integer"}}]"#,
    );
    let kv = write(
        dir.path(),
        "kv.json",
        r#"{"user:current": {"type": "hash", "value": {"id": "41"}}}"#,
    );

    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("assert")
        .arg("--group")
        .arg(&group)
        .arg("--response")
        .arg(&response)
        .arg("--deps")
        .arg(&deps)
        .arg("--kv")
        .arg(&kv)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    let payload = stdout_json(&output);
    assert_eq!(payload["passed"], Value::Bool(false));
    assert_eq!(
        payload["results"][0]["error"],
        Value::String("id mismatch: 42 != 41".to_string())
    );
}

#[test]
fn unresolvable_dependency_exits_one() {
    let (dir, group, response) = fixture("name: g\nassertions: []\n");
    let deps = write(
        dir.path(),
        "deps.yaml",
        concat!(
            "- id: home\n  source_type: env\n  config:\n",
            "    env: {name: APICHECK_TEST_UNSET_VARIABLE}\n",
        ),
    );
    assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .env_remove("APICHECK_TEST_UNSET_VARIABLE")
        .arg("assert")
        .arg("--group")
        .arg(&group)
        .arg("--response")
        .arg(&response)
        .arg("--deps")
        .arg(&deps)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(r#""error":"resolve_error""#))
        .stderr(predicate::str::contains(r#""dependency":"home""#));
}

#[test]
fn malformed_group_exits_three() {
    let (_dir, group, response) = fixture("name: g\nassertions: 5\n");
    assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("assert")
        .arg("--group")
        .arg(&group)
        .arg("--response")
        .arg(&response)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid assertion group"));
}
