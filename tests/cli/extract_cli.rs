use std::fs;

use serde_json::{Value, json};
use tempfile::tempdir;

#[test]
fn extracts_typed_values_to_stdout() {
    let dir = tempdir().expect("tempdir");
    let extractors = dir.path().join("extractors.json");
    fs::write(
        &extractors,
        r#"[
            {"name": "order_id", "path": "$.data.order.id", "target": "string"},
            {"name": "created", "path": "$.data.order.created_at", "target": "timestamp"}
        ]"#,
    )
    .expect("write extractors");
    let response = dir.path().join("response.json");
    fs::write(
        &response,
        r#"{"data": {"order": {"id": 1001, "created_at": "2026-02-23T11:15:30Z"}}}"#,
    )
    .expect("write response");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("extract")
        .arg("--extractors")
        .arg(&extractors)
        .arg("--response")
        .arg(&response)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));
    let payload: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(
        payload,
        json!({"values": {"order_id": "1001", "created": 1_771_845_330}, "errors": []})
    );
}

#[test]
fn failed_extraction_exits_two() {
    let dir = tempdir().expect("tempdir");
    let extractors = dir.path().join("extractors.yaml");
    fs::write(&extractors, "- name: token\n  path: $.auth.token\n").expect("write extractors");
    let response = dir.path().join("response.json");
    fs::write(&response, r#"{"auth": {"token": null}}"#).expect("write response");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("extract")
        .arg("--extractors")
        .arg(&extractors)
        .arg("--response")
        .arg(&response)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    let payload: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(payload["values"], json!({}));
    assert_eq!(payload["errors"][0]["reason"], json!("null_leaf"));
}
