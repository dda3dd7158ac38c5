use std::fs;

use serde_json::{Value, json};
use tempfile::tempdir;

#[test]
fn resolves_env_generator_and_scene_values() {
    let dir = tempdir().expect("tempdir");
    let deps = dir.path().join("deps.yaml");
    fs::write(
        &deps,
        r#"
- id: base_url
  source_type: env
  config:
    env: {name: APICHECK_TEST_BASE_URL}
- id: request_id
  source_type: generator
  config:
    generator:
      kind: uuid
      params: {hyphens: false}
- id: session
  source_type: scene
  config:
    scene: {scene_id: login, step_id: submit, path: $.session.id}
- id: locale
  source_type: scene
  config:
    scene: {scene_id: login, step_id: submit, path: $.locale, default_value: en}
"#,
    )
    .expect("write deps");
    let scenes = dir.path().join("scenes.json");
    fs::write(&scenes, r#"{"login": {"submit": {"session": {"id": "s-77"}}}}"#)
        .expect("write scenes");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .env("APICHECK_TEST_BASE_URL", "https://api.test")
        .arg("resolve")
        .arg("--deps")
        .arg(&deps)
        .arg("--scenes")
        .arg(&scenes)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));
    let payload: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(payload["base_url"], json!("https://api.test"));
    assert_eq!(payload["session"], json!("s-77"));
    assert_eq!(payload["locale"], json!("en"));
    assert_eq!(payload["request_id"].as_str().map(str::len), Some(32));
}

#[test]
fn config_deadline_is_accepted() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("apicheck.toml");
    fs::write(&config, "[resolve]\ndeadline_ms = 5000\n\n[log]\nfilter = \"error\"\n")
        .expect("write config");
    let deps = dir.path().join("deps.json");
    fs::write(
        &deps,
        r#"[{"id": "answer", "source_type": "custom", "config": {"custom": {"value": 42}}}]"#,
    )
    .expect("write deps");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .args(["--config"])
        .arg(&config)
        .arg("resolve")
        .arg("--deps")
        .arg(&deps)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));
    let payload: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(payload, json!({"answer": 42}));
}
