//! Platform directory resolution.

use std::path::PathBuf;

use desklet_common::ConfigError;

use crate::schema::DeskletConfig;

pub(crate) const APP_NAME: &str = "desklet";

/// Returns the platform-specific configuration directory for Desklet.
///
/// - Linux: `$XDG_CONFIG_HOME/desklet` (defaults to `~/.config/desklet`)
/// - macOS: `~/Library/Application Support/desklet`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?
        .join(APP_NAME))
}

/// Returns the platform-specific data directory for Desklet.
///
/// - Linux: `$XDG_DATA_HOME/desklet` (defaults to `~/.local/share/desklet`)
/// - macOS: `~/Library/Application Support/desklet`
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::data_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine data directory".into()))?
        .join(APP_NAME))
}

/// Widget manifest roots, falling back to `<data_dir>/widgets`.
pub fn widget_dirs(config: &DeskletConfig) -> Result<Vec<PathBuf>, ConfigError> {
    if !config.paths.widget_dirs.is_empty() {
        return Ok(config.paths.widget_dirs.clone());
    }
    Ok(vec![data_dir()?.join("widgets")])
}

/// State file location, falling back to `<data_dir>/state.json`.
pub fn state_file(config: &DeskletConfig) -> Result<PathBuf, ConfigError> {
    match &config.paths.state_file {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join("state.json")),
    }
}
