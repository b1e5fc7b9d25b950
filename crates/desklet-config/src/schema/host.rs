//! Host appearance settings pushed to content-bearing widgets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub theme: String,
    pub reduced_motion: bool,
    pub direction: TextDirection,
    pub locale: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            reduced_motion: false,
            direction: TextDirection::Ltr,
            locale: "en-US".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_config_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.theme, "dark");
        assert!(!config.reduced_motion);
        assert_eq!(config.direction, TextDirection::Ltr);
        assert_eq!(config.locale, "en-US");
    }

    #[test]
    fn direction_parses_rtl() {
        let config: HostConfig = toml::from_str("direction = \"rtl\"").unwrap();
        assert_eq!(config.direction, TextDirection::Rtl);
    }
}
