//! Widget instance and surface management.
//!
//! [`WidgetManager`] owns every placed widget instance: identity,
//! normalized placement, consent, selection and persisted state. Drawing,
//! manifest lookup, state storage and consent dialogs are reached through
//! the collaborator traits in [`render`], [`registry`], [`persistence`]
//! and [`consent`].

pub mod consent;
pub mod events;
pub mod instance;
pub mod manager;
pub mod migration;
pub mod persistence;
pub mod registry;
pub mod render;
pub mod store;

pub use consent::{ConsentKind, ConsentOutcome, ConsentPrompter, ConsentRequest, FixedPrompter};
pub use events::ManagerEvent;
pub use instance::{InstanceRecord, WidgetInstance};
pub use manager::{Collaborators, CreateOptions, LoadReport, ManagerOptions, WidgetManager};
pub use persistence::{MemoryStateStore, StateBlob, StateStore, CURRENT_VERSION};
pub use registry::{BackendSpec, DescriptorRegistry, StaticRegistry, WidgetDescriptor};
pub use render::{ActorHandle, ActorMessage, HeadlessRenderer, HostStateSnapshot, RenderBackend};
