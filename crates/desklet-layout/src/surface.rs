//! A monitor's placement surface and its coordinate conversions.

use desklet_common::types::{Extent, MonitorIndex};
use serde::{Deserialize, Serialize};

/// Opaque handle to the rendering layer's placement container for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(pub u64);

/// A rectangular placement area owned by one monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub monitor_index: MonitorIndex,
    pub container: ContainerHandle,
    /// Extent of the surface's normalized coordinate space.
    pub extent: Extent,
}

impl Surface {
    pub fn new(monitor_index: MonitorIndex, container: ContainerHandle, extent: Extent) -> Self {
        Self {
            monitor_index,
            container,
            extent,
        }
    }

    /// Convert an absolute position into the surface's 0..1 space.
    ///
    /// A degenerate axis (extent <= 0) maps to 0.
    pub fn to_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        (scale_down(x, self.extent.width), scale_down(y, self.extent.height))
    }

    /// Convert a normalized position back to absolute coordinates.
    pub fn to_absolute(&self, norm_x: f64, norm_y: f64) -> (f64, f64) {
        (norm_x * self.extent.width, norm_y * self.extent.height)
    }
}

fn scale_down(value: f64, extent: f64) -> f64 {
    if extent > 0.0 {
        value / extent
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(width: f64, height: f64) -> Surface {
        Surface::new(0, ContainerHandle(1), Extent::new(width, height))
    }

    #[test]
    fn normalizes_against_extent() {
        let s = surface(1920.0, 1080.0);
        let (nx, ny) = s.to_normalized(960.0, 540.0);
        assert!((nx - 0.5).abs() < 1e-9);
        assert!((ny - 0.5).abs() < 1e-9);
    }

    #[test]
    fn round_trip_is_stable() {
        let extents = [(1920.0, 1080.0), (1280.0, 1024.0), (3840.0, 2160.0), (800.0, 600.0)];
        let points = [(0.0, 0.0), (13.5, 7.25), (860.0, 310.0), (799.0, 599.0)];
        for (w, h) in extents {
            let s = surface(w, h);
            for (x, y) in points {
                let (nx, ny) = s.to_normalized(x, y);
                let (ax, ay) = s.to_absolute(nx, ny);
                assert!((ax - x).abs() < 1e-4, "x round trip on {w}x{h}: {x} -> {ax}");
                assert!((ay - y).abs() < 1e-4, "y round trip on {w}x{h}: {y} -> {ay}");
            }
        }
    }

    #[test]
    fn degenerate_extent_maps_to_origin() {
        let s = surface(0.0, 0.0);
        assert_eq!(s.to_normalized(100.0, 100.0), (0.0, 0.0));
    }
}
