use std::fs;
use std::path::Path;

use apicheck::domain::assertion::AssertionGroup;
use apicheck::io::reader::read_document_file;
use apicheck::io::{Format, IoError, format_of};
use tempfile::tempdir;

const GROUP_JSON: &str = r#"{
  "name": "orders",
  "assertions": [
    {"name": "status", "kind": "equal", "locator": "status", "expected": {"literal": "paid"}}
  ],
  "options": {"stop_on_first_failure": true}
}"#;

const GROUP_YAML: &str = "\
name: orders
assertions:
  - name: status
    kind: equal
    locator: status
    expected: {literal: paid}
options:
  stop_on_first_failure: true
";

#[test]
fn format_follows_extension_case_insensitively() {
    assert_eq!(format_of(Path::new("deps.YML")).expect("yml"), Format::Yaml);
    assert_eq!(format_of(Path::new("group.yaml")).expect("yaml"), Format::Yaml);
    assert_eq!(format_of(Path::new("response.Json")).expect("json"), Format::Json);
}

#[test]
fn json_and_yaml_definitions_load_the_same_group() {
    let dir = tempdir().expect("tempdir");
    let json_path = dir.path().join("group.json");
    let yaml_path = dir.path().join("group.YML");
    fs::write(&json_path, GROUP_JSON).expect("write json");
    fs::write(&yaml_path, GROUP_YAML).expect("write yaml");

    let from_json: AssertionGroup =
        serde_json::from_value(read_document_file(&json_path).expect("read json"))
            .expect("json group");
    let from_yaml: AssertionGroup =
        serde_json::from_value(read_document_file(&yaml_path).expect("read yaml"))
            .expect("yaml group");
    assert_eq!(from_json, from_yaml);
    assert!(from_yaml.options.stop_on_first_failure);
}

#[test]
fn unsupported_or_missing_extension_is_rejected_before_reading() {
    let dir = tempdir().expect("tempdir");
    let csv = dir.path().join("group.csv");
    match read_document_file(&csv) {
        Err(IoError::UnsupportedExtension { path }) => assert!(path.ends_with("group.csv")),
        other => panic!("unexpected result: {other:?}"),
    }

    let bare = dir.path().join("group");
    assert!(matches!(read_document_file(&bare), Err(IoError::MissingExtension { .. })));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("deps.yaml");
    fs::write(&path, "- id: [unclosed\n").expect("write");
    assert!(matches!(read_document_file(&path), Err(IoError::YamlParse(_))));
}
