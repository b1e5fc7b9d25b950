use std::path::{Path, PathBuf};

use desklet_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;
use crate::schema::DeskletConfig;
use crate::toml_writer::write_atomic;

const CONFIG_FILE: &str = "config.toml";

/// `<config_dir>/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(crate::paths::config_dir()?.join(CONFIG_FILE))
}

/// Parse one config file. Missing keys take their serde defaults; range
/// checks are left to [`crate::validation::validate`].
pub fn load_from_path(path: &Path) -> Result<DeskletConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("cannot read {}: {e}", path.display())))?;
    let config = toml::from_str(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "Config file read");
    Ok(config)
}

/// Write the commented template to `path`.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    write_atomic(path, &default_config_toml())?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

/// Load the default config file, writing the template and returning
/// defaults when there is none yet.
pub fn load_default() -> Result<DeskletConfig, ConfigError> {
    let path = default_config_path()?;
    if path.exists() {
        return load_from_path(&path);
    }
    create_default_config(&path)?;
    Ok(DeskletConfig::default())
}
