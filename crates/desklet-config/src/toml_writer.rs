//! Saving configs back to disk.

use std::path::Path;

use desklet_common::ConfigError;

use crate::schema::DeskletConfig;
use crate::toml_loader::default_config_path;

fn write_error(path: &Path, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::ParseError(format!("cannot write {}: {e}", path.display()))
}

/// Write `contents` to a sibling `.toml.tmp` file and rename it over
/// `path`, creating parent directories first.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, contents).map_err(|e| write_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        write_error(path, e)
    })
}

pub fn save_config(config: &DeskletConfig) -> Result<(), ConfigError> {
    save_config_to_path(config, &default_config_path()?)
}

pub fn save_config_to_path(config: &DeskletConfig, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::ParseError(format!("cannot serialize config: {e}")))?;
    write_atomic(path, &text)?;
    tracing::debug!(path = %path.display(), "Config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConsentPolicy, TextDirection};
    use crate::toml_loader::load_from_path;

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = DeskletConfig::default();
        config.consent.policy = ConsentPolicy::Deny;
        config.backend.kill_grace_ms = 250;
        config.host.direction = TextDirection::Rtl;
        save_config_to_path(&config, &path).unwrap();

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.consent.policy, ConsentPolicy::Deny);
        assert_eq!(loaded.backend.kill_grace_ms, 250);
        assert_eq!(loaded.host.direction, TextDirection::Rtl);
        assert!(crate::validation::validate(&loaded).is_ok());
    }

    #[test]
    fn nested_target_is_created_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("config.toml");

        save_config_to_path(&DeskletConfig::default(), &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[state]\nwatch = false\n").unwrap();

        save_config_to_path(&DeskletConfig::default(), &path).unwrap();
        assert!(load_from_path(&path).unwrap().state.watch);
    }
}
