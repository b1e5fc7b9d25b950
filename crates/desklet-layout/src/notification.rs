//! Layout-change notifications consumed from the host environment.

use desklet_common::types::{Extent, MonitorIndex};
use serde::{Deserialize, Serialize};

use crate::surface::{ContainerHandle, Surface};

/// What changed in the host layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutChange {
    /// Only `true` triggers a surface rebuild and reattachment.
    pub redisplay: bool,
    pub monitors_changed: bool,
    pub grids_changed: bool,
}

impl LayoutChange {
    pub fn redisplay() -> Self {
        Self {
            redisplay: true,
            ..Default::default()
        }
    }
}

/// One surface as reported by the layout system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSpec {
    pub monitor_index: MonitorIndex,
    pub container: ContainerHandle,
    pub normalized_width: f64,
    pub normalized_height: f64,
}

impl SurfaceSpec {
    pub fn to_surface(&self) -> Surface {
        Surface::new(
            self.monitor_index,
            self.container,
            Extent::new(self.normalized_width, self.normalized_height),
        )
    }
}

/// A notification plus the surfaces current at the time it was sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub change: LayoutChange,
    pub surfaces: Vec<SurfaceSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_converts_to_surface() {
        let spec = SurfaceSpec {
            monitor_index: 2,
            container: ContainerHandle(9),
            normalized_width: 2560.0,
            normalized_height: 1440.0,
        };
        let s = spec.to_surface();
        assert_eq!(s.monitor_index, 2);
        assert_eq!(s.container, ContainerHandle(9));
        assert_eq!(s.extent, Extent::new(2560.0, 1440.0));
    }

    #[test]
    fn change_uses_camel_case_fields() {
        let json = r#"{"redisplay":true,"monitorsChanged":true,"gridsChanged":false}"#;
        let change: LayoutChange = serde_json::from_str(json).unwrap();
        assert!(change.redisplay);
        assert!(change.monitors_changed);
        assert!(!change.grids_changed);
    }

    #[test]
    fn redisplay_constructor() {
        let c = LayoutChange::redisplay();
        assert!(c.redisplay);
        assert!(!c.monitors_changed);
    }
}
