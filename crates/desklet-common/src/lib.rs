pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{ConfigError, DeskletError, RegistryError, StateError};
pub use events::EventBus;
pub use id::{new_id, InstanceId};
pub use types::{Extent, MonitorIndex, Rect, WidgetKind};

pub type Result<T> = std::result::Result<T, DeskletError>;
