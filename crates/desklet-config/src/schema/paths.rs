//! Filesystem locations for widget manifests and persisted state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where widgets are discovered and where instance state is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directories scanned for `<widget-id>/widget.toml` manifests.
    /// Empty means the platform default (`<data_dir>/widgets`).
    pub widget_dirs: Vec<PathBuf>,
    /// State file override. `None` means `<data_dir>/state.json`.
    pub state_file: Option<PathBuf>,
}
