use serde::{Deserialize, Serialize};

/// How missing consents are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentPolicy {
    /// Prompt on the controlling terminal.
    #[default]
    Ask,
    /// Grant every consent without asking.
    Allow,
    /// Refuse every consent; affected instances are removed.
    Deny,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub policy: ConsentPolicy,
}
