//! Placement surfaces and the normalized coordinate space widgets live in.
//!
//! Each monitor contributes one [`Surface`]. Instance positions are stored
//! normalized against the surface extent so they survive resolution and
//! layout changes; sizes stay in absolute pixels.

pub mod frame;
pub mod notification;
pub mod surface;
pub mod table;

pub use frame::{default_placement, instance_frame, placement_changed, NORM_EPSILON};
pub use notification::{LayoutChange, LayoutSnapshot, SurfaceSpec};
pub use surface::{ContainerHandle, Surface};
pub use table::SurfaceTable;
