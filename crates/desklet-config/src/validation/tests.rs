use super::*;
use std::path::PathBuf;

#[test]
fn default_config_is_valid() {
    assert!(validate(&DeskletConfig::default()).is_ok());
}

#[test]
fn grace_out_of_range_is_rejected() {
    let mut config = DeskletConfig::default();
    config.backend.shutdown_grace_ms = 60_001;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("backend.shutdown_grace_ms"));
}

#[test]
fn all_errors_are_collected() {
    let mut config = DeskletConfig::default();
    config.backend.kill_grace_ms = 100_000;
    config.state.save_debounce_ms = 20_000;
    config.host.locale = "  ".into();
    config.paths.widget_dirs = vec![PathBuf::new()];

    let msg = validate(&config).unwrap_err().to_string();
    assert!(msg.contains("backend.kill_grace_ms"));
    assert!(msg.contains("state.save_debounce_ms"));
    assert!(msg.contains("host.locale"));
    assert!(msg.contains("paths.widget_dirs[0]"));
}

#[test]
fn boundary_values_are_accepted() {
    let mut config = DeskletConfig::default();
    config.backend.shutdown_grace_ms = 0;
    config.backend.kill_grace_ms = 60_000;
    config.state.save_debounce_ms = 10_000;
    assert!(validate(&config).is_ok());
}
