//! Configuration schema types for Desklet.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with sensible defaults.

mod backend;
mod consent;
mod host;
mod paths;
mod state;
mod system;

pub use backend::*;
pub use consent::*;
pub use host::*;
pub use paths::*;
pub use state::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration for Desklet.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskletConfig {
    pub paths: PathsConfig,
    pub backend: BackendConfig,
    pub consent: ConsentConfig,
    pub state: StateConfig,
    pub host: HostConfig,
    pub logging: LoggingConfig,
}
