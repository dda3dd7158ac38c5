use predicates::prelude::predicate;
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn help_lists_subcommands() {
    assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("assert"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn version_is_available() {
    assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_is_input_usage_error() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .args(["extract", "--bogus"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(3));
    let payload: Value = serde_json::from_slice(&output.stderr).expect("stderr json");
    assert_eq!(payload["error"], "input_usage_error");
    assert_eq!(payload["details"]["kind"], "cli_parse_error");
}

#[test]
fn invalid_config_is_input_usage_error() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("apicheck.toml");
    std::fs::write(&config, "[cache]\ndefault_ttl_ms = 0\n").expect("write config");
    let deps = dir.path().join("deps.json");
    std::fs::write(&deps, "[]").expect("write deps");

    assert_cmd::cargo::cargo_bin_cmd!("apicheck")
        .arg("--config")
        .arg(&config)
        .arg("resolve")
        .arg("--deps")
        .arg(&deps)
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("config_error"))
        .stderr(predicate::str::contains("cache.default_ttl_ms must be > 0"));
}
