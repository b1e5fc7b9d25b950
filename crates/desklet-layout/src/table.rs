//! The set of live surfaces, keyed by monitor index.

use desklet_common::types::MonitorIndex;
use tracing::debug;

use crate::notification::SurfaceSpec;
use crate::surface::Surface;

/// Owned surface collection. Rebuilt wholesale on every redisplay; order
/// follows the layout system's list so "first available" is stable.
#[derive(Debug, Default)]
pub struct SurfaceTable {
    surfaces: Vec<Surface>,
}

impl SurfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every surface with the given specs. Duplicate monitor
    /// indices keep the first occurrence.
    pub fn rebuild(&mut self, specs: &[SurfaceSpec]) {
        self.surfaces.clear();
        for spec in specs {
            if self.get(spec.monitor_index).is_some() {
                debug!(monitor = spec.monitor_index, "Duplicate surface ignored");
                continue;
            }
            self.surfaces.push(spec.to_surface());
        }
        debug!(count = self.surfaces.len(), "Surfaces rebuilt");
    }

    pub fn get(&self, monitor: MonitorIndex) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.monitor_index == monitor)
    }

    pub fn first(&self) -> Option<&Surface> {
        self.surfaces.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }

    pub fn monitors(&self) -> Vec<MonitorIndex> {
        self.surfaces.iter().map(|s| s.monitor_index).collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }
}
