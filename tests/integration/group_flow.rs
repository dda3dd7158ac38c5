use std::sync::Arc;

use apicheck::domain::assertion::{
    Assertion, AssertionGroup, AssertionKind, AssertionOptions, GroupOptions,
};
use apicheck::domain::dependency::ResolvedValues;
use apicheck::engine::r#assert::{evaluate, run_group};
use apicheck::io::{Format, reader::read_document};
use serde_json::json;

const GROUP_YAML: &str = r#"
name: order
description: order endpoint contract
assertions:
  - name: status
    kind: equal
    locator: code
    expected: {literal: 200}
  - name: currency
    kind: equal
    locator: data.currency
    expected: {literal: "EUR"}
  - name: items
    kind: length_equal
    locator: data.items
    expected: {literal: 3}
  - name: has-id
    kind: has_field
    expected: {literal: data.id}
"#;

fn response() -> serde_json::Value {
    json!({"code": 200, "data": {"id": 9, "currency": "USD", "items": [1, 2, 3]}})
}

fn load_group(options: GroupOptions) -> AssertionGroup {
    let document = read_document(GROUP_YAML.as_bytes(), Format::Yaml).expect("yaml");
    let mut group: AssertionGroup = serde_json::from_value(document).expect("group");
    group.options = options;
    group.bind_response(&response());
    group
}

#[tokio::test]
async fn sequential_group_from_definition_file() {
    let result = run_group(&load_group(GroupOptions::default()), Arc::new(ResolvedValues::new()))
        .await
        .expect("group");
    assert!(!result.passed);
    assert_eq!(result.description, "order endpoint contract");
    let passed: Vec<bool> = result.results.iter().map(|r| r.passed).collect();
    assert_eq!(passed, vec![true, false, true, true]);
    assert_eq!(
        result.results[1].error.as_deref(),
        Some("expected EUR but got USD")
    );
}

#[tokio::test]
async fn stop_on_first_failure_leaves_later_assertions_unrun() {
    let group = load_group(GroupOptions {
        stop_on_first_failure: true,
        ..GroupOptions::default()
    });
    let result = run_group(&group, Arc::new(ResolvedValues::new()))
        .await
        .expect("group");
    assert_eq!(result.results.len(), 2);
    assert!(result.stopped_early(group.assertions.len()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_group_serializes_in_declared_order() {
    let group = load_group(GroupOptions {
        parallel: true,
        ..GroupOptions::default()
    });
    let result = run_group(&group, Arc::new(ResolvedValues::new()))
        .await
        .expect("group");
    let payload = serde_json::to_value(&result).expect("serialize");
    assert_eq!(payload["parallel"], json!(true));
    assert_eq!(payload["passed"], json!(false));
    let names: Vec<&str> = payload["results"]
        .as_array()
        .expect("results")
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names, vec!["status", "currency", "items", "has-id"]);
}

#[test]
fn deep_comparison_ignores_key_order() {
    let actual = json!({"a": 1, "b": {"c": [1, 2]}});
    let expected = json!({"b": {"c": [1, 2]}, "a": 1});
    let primitive = Assertion::new("shape", AssertionKind::Equal)
        .with_actual(actual.clone())
        .with_expected(expected.clone());
    assert!(!evaluate(&primitive, &ResolvedValues::new()).passed);

    let deep = primitive.with_options(AssertionOptions {
        deep_comparison: true,
        ..AssertionOptions::default()
    });
    assert!(evaluate(&deep, &ResolvedValues::new()).passed);
}

#[test]
fn unknown_kind_in_definition_fails_only_its_assertion() {
    let group: AssertionGroup = serde_json::from_value(json!({
        "name": "mixed",
        "assertions": [
            {"name": "ok", "kind": "type_match", "actual": "x", "expected": {"literal": "y"}},
            {"name": "odd", "kind": "approximately", "actual": 1, "expected": {"literal": 1}}
        ]
    }))
    .expect("group");
    let results: Vec<_> = group
        .assertions
        .iter()
        .map(|assertion| evaluate(assertion, &ResolvedValues::new()))
        .collect();
    assert!(results[0].passed);
    assert!(!results[1].passed);
    assert_eq!(
        results[1].error.as_deref(),
        Some("unsupported assertion kind `approximately`")
    );
}
