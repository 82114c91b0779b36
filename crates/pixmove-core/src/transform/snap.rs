//! Grid and angle snapping.

use crate::geometry::{Point, Rect};

/// Angles (degrees) that produce clean pixel-art slopes: 1:2, 1:1 and 2:1
/// lines in every octant. Scanned in this order; the first closest entry wins.
pub const KEY_ANGLES: [f64; 16] = [
    0.0, 26.565, 45.0, 63.435, 90.0, 116.565, 135.0, 153.435, 180.0, -153.435, -135.0, -116.565,
    -90.0, -63.435, -45.0, -26.565,
];

/// Snap a point to the nearest intersection of a grid.
///
/// The grid origin is `(grid.x, grid.y)` and the cell size is
/// `(grid.w, grid.h)`. A point exactly halfway between two lines snaps to
/// the lower one.
///
/// A grid with a non-positive cell size disables snapping and returns the
/// point unchanged.
pub fn snap_to_grid(grid: Rect, point: Point) -> Point {
    if grid.w <= 0 || grid.h <= 0 {
        return point;
    }
    Point::new(
        snap_axis(point.x, grid.x, grid.w),
        snap_axis(point.y, grid.y, grid.h),
    )
}

fn snap_axis(value: i32, origin: i32, cell: i32) -> i32 {
    let offset = origin.rem_euclid(cell);
    let rel = value - offset;
    let base = offset + rel.div_euclid(cell) * cell;
    if rel.rem_euclid(cell) > cell / 2 {
        base + cell
    } else {
        base
    }
}

/// Circular distance between two angles in degrees, in `[0, 180]`.
fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

/// Closest entry of [`KEY_ANGLES`] to `degrees`, scanning in table order so
/// that on a tie the earlier entry is kept.
pub fn snap_angle_degrees(degrees: f64) -> f64 {
    let mut closest = 0;
    for (i, key) in KEY_ANGLES.iter().enumerate() {
        if angular_distance(degrees, KEY_ANGLES[closest]) > angular_distance(degrees, *key) {
            closest = i;
        }
    }
    KEY_ANGLES[closest]
}

/// Replace an angle (radians) with the closest entry of [`KEY_ANGLES`].
///
/// Distance is measured around the circle, so -179° snaps to 180° rather
/// than to -153.435°.
pub fn snap_angle(angle: f64) -> f64 {
    snap_angle_degrees(angle.to_degrees()).to_radians()
}
