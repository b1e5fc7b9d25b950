//! Backend process supervision settings.

use serde::{Deserialize, Serialize};

/// Timing and environment policy for widget backend processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Wait after the `shutdown` message before sending SIGTERM (valid range: 0-60000).
    pub shutdown_grace_ms: u64,
    /// Wait after SIGTERM before forcing termination (valid range: 0-60000).
    pub kill_grace_ms: u64,
    /// Pass the full host environment to backends instead of the safe allowlist.
    pub inherit_env: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 500,
            kill_grace_ms: 1500,
            inherit_env: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_config_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.shutdown_grace_ms, 500);
        assert_eq!(config.kill_grace_ms, 1500);
        assert!(!config.inherit_env);
    }

    #[test]
    fn backend_config_partial_toml() {
        let config: BackendConfig = toml::from_str("inherit_env = true").unwrap();
        assert!(config.inherit_env);
        assert_eq!(config.shutdown_grace_ms, 500);
    }
}
