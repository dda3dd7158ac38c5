use apicheck::domain::extractor::Extractor;
use apicheck::domain::value::{TargetType, ValueKind};
use apicheck::engine::extract::{ExtractError, extract, extract_all};
use serde_json::{Value, json};

fn sample() -> Value {
    json!({"data": {"items": [{"name": "a"}, {"name": "b"}], "total": "2", "next": null}})
}

#[test]
fn extracts_indexed_field() {
    let extracted = extract("$.data.items.1.name", &sample()).expect("extract");
    assert_eq!(extracted.kind, ValueKind::String);
    assert_eq!(extracted.value, json!("b"));
}

#[test]
fn index_past_end_is_out_of_range() {
    let error = extract("$.data.items.2.name", &sample()).expect_err("out of range");
    assert!(matches!(
        error,
        ExtractError::IndexOutOfRange { index: 2, len: 2, .. }
    ));
}

#[test]
fn absent_field_is_missing_field() {
    let error = extract("$.data.name", &sample()).expect_err("missing");
    assert_eq!(error.reason(), "missing_field");
    assert!(error.to_string().contains("$.data.name"));
}

#[test]
fn null_leaf_is_a_failure() {
    let error = extract("$.data.next", &sample()).expect_err("null leaf");
    assert_eq!(error.reason(), "null_leaf");
}

#[test]
fn extract_all_converts_and_reports_failures_alongside_values() {
    let extractors = vec![
        Extractor::new("total", "$.data.total").with_target(TargetType::Integer),
        Extractor::new("first", "$.data.items.0.name"),
        Extractor::new("wrong", "$.data.items.name"),
    ];
    let report = extract_all(&extractors, &sample());
    assert!(!report.is_complete());
    assert_eq!(report.values.get("total"), Some(&json!(2)));
    assert_eq!(report.values.get("first"), Some(&json!("a")));
    assert!(!report.values.contains_key("wrong"));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].name, "wrong");
    assert_eq!(report.errors[0].reason, "field_on_sequence");
}
