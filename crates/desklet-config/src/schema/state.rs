use serde::{Deserialize, Serialize};

/// Persistence behaviour for the instance state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Coalescing window for state writes in milliseconds (valid range: 0-10000).
    pub save_debounce_ms: u64,
    /// Reload instances when the state file changes on disk.
    pub watch: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 300,
            watch: true,
        }
    }
}
