//! Frame math: default placement, clamped frames, and change detection.

use desklet_common::types::{Extent, Rect};

use crate::surface::Surface;

/// Normalized positions closer than this are considered unchanged.
pub const NORM_EPSILON: f64 = 1e-4;

/// Default placement for a new instance: horizontally centered, one third
/// down, never negative.
pub fn default_placement(extent: Extent, width: f64, height: f64) -> (f64, f64) {
    let x = ((extent.width - width) / 2.0).max(0.0);
    let y = ((extent.height - height) / 3.0).max(0.0);
    (x, y)
}

/// Absolute frame for an instance on `surface`.
///
/// Normalized coordinates are clamped to `[0, 1]`. When the instance fits
/// on an axis its origin slides inward so the whole rect stays inside the
/// surface; the size is never changed.
pub fn instance_frame(surface: &Surface, norm_x: f64, norm_y: f64, width: f64, height: f64) -> Rect {
    let (x, y) = surface.to_absolute(clamp_unit(norm_x), clamp_unit(norm_y));
    Rect {
        x: slide_inside(x, width, surface.extent.width),
        y: slide_inside(y, height, surface.extent.height),
        width,
        height,
    }
}

/// Whether a placement write would actually change anything.
pub fn placement_changed(
    old_norm: (f64, f64),
    new_norm: (f64, f64),
    old_size: (f64, f64),
    new_size: (f64, f64),
) -> bool {
    (old_norm.0 - new_norm.0).abs() > NORM_EPSILON
        || (old_norm.1 - new_norm.1).abs() > NORM_EPSILON
        || old_size != new_size
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

fn slide_inside(origin: f64, size: f64, extent: f64) -> f64 {
    if size <= extent {
        origin.clamp(0.0, extent - size)
    } else {
        origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ContainerHandle;

    fn hd() -> Surface {
        Surface::new(0, ContainerHandle(7), Extent::new(1920.0, 1080.0))
    }

    #[test]
    fn default_placement_matches_centering_formula() {
        let (x, y) = default_placement(Extent::new(1920.0, 1080.0), 200.0, 150.0);
        assert!((x - 860.0).abs() < f64::EPSILON);
        assert!((y - 310.0).abs() < f64::EPSILON);

        let (nx, ny) = hd().to_normalized(x, y);
        assert!((nx - 0.448).abs() < 1e-3, "normX = {nx}");
        assert!((ny - 0.287).abs() < 1e-3, "normY = {ny}");
    }

    #[test]
    fn default_placement_never_negative() {
        let (x, y) = default_placement(Extent::new(100.0, 100.0), 400.0, 300.0);
        assert_eq!((x, y), (0.0, 0.0));
    }

    #[test]
    fn frame_slides_inward_at_right_edge() {
        let r = instance_frame(&hd(), 0.99, 0.99, 200.0, 150.0);
        assert!((r.x - 1720.0).abs() < 1e-9);
        assert!((r.y - 930.0).abs() < 1e-9);
        assert_eq!((r.width, r.height), (200.0, 150.0));
    }

    #[test]
    fn frame_clamps_out_of_range_normals() {
        let r = instance_frame(&hd(), -0.5, 1.7, 200.0, 150.0);
        assert_eq!(r.x, 0.0);
        assert!((r.y - 930.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_widget_keeps_size_and_origin() {
        let r = instance_frame(&hd(), 0.5, 0.0, 2500.0, 150.0);
        assert!((r.x - 960.0).abs() < 1e-9);
        assert_eq!(r.width, 2500.0);
    }

    #[test]
    fn tiny_moves_are_not_changes() {
        assert!(!placement_changed(
            (0.5, 0.5),
            (0.50005, 0.49995),
            (200.0, 150.0),
            (200.0, 150.0)
        ));
        assert!(placement_changed(
            (0.5, 0.5),
            (0.5002, 0.5),
            (200.0, 150.0),
            (200.0, 150.0)
        ));
    }

    #[test]
    fn resize_is_a_change() {
        assert!(placement_changed(
            (0.5, 0.5),
            (0.5, 0.5),
            (200.0, 150.0),
            (201.0, 150.0)
        ));
    }
}
