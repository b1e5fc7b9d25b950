//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_parse_error() {
    let result = load_from_path(Path::new("/tmp/nonexistent_desklet_config.toml"));
    assert!(matches!(
        result,
        Err(desklet_common::ConfigError::ParseError(_))
    ));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[backend]
shutdown_grace_ms = 100

[consent]
policy = "allow"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.backend.shutdown_grace_ms, 100);
    assert_eq!(
        config.consent.policy,
        crate::schema::ConsentPolicy::Allow
    );
    // Defaults preserved
    assert_eq!(config.backend.kill_grace_ms, 1500);
    assert_eq!(config.host.theme, "dark");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(
        result,
        Err(desklet_common::ConfigError::ParseError(_))
    ));
}

#[test]
fn out_of_range_values_are_returned_as_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[state]\nsave_debounce_ms = 50000\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.state.save_debounce_ms, 50000);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desklet").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.backend.shutdown_grace_ms, 500);
    assert!(config.paths.widget_dirs.is_empty());
}

#[test]
fn default_template_is_valid_toml() {
    let content = template::default_config_toml();
    let parsed: Result<crate::schema::DeskletConfig, _> = toml::from_str(&content);
    assert!(parsed.is_ok(), "template should parse: {:?}", parsed.err());
}

#[test]
fn default_config_path_has_correct_name() {
    let path = default_config_path().unwrap();
    assert_eq!(path.file_name().unwrap(), "config.toml");
    assert!(path.parent().unwrap().ends_with("desklet"));
}
