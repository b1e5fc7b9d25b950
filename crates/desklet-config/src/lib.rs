//! Desklet configuration.
//!
//! `config.toml` is parsed with serde defaults on every section, so a
//! partial file (or none at all) yields a usable config. Values are then
//! range-checked by [`validation::validate`].

pub mod paths;
pub mod schema;
pub mod toml_loader;
pub mod toml_writer;
pub mod validation;

pub use schema::DeskletConfig;
pub use toml_writer::{save_config, save_config_to_path};

use desklet_common::ConfigError;
use std::path::Path;

/// Load and validate the config at the platform default path, creating
/// it from the template on first run.
pub fn load_config() -> Result<DeskletConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path (the `--config` override).
pub fn load_config_from(path: &Path) -> Result<DeskletConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_override_is_file_not_found() {
        let result = load_config_from(Path::new("/tmp/desklet-does-not-exist/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn override_with_bad_ranges_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\nkill_grace_ms = 999999\n").unwrap();

        let result = load_config_from(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[consent]\npolicy = \"deny\"\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.consent.policy, schema::ConsentPolicy::Deny);
        assert_eq!(config.backend.shutdown_grace_ms, 500);
        assert_eq!(config.host.locale, "en-US");
    }
}
