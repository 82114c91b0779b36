//! Handle hit-testing and cursor selection for the rotated box.

use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use super::transformation::{Corners, Transformation};
use crate::geometry::PointF;

/// Compass direction of a handle, in counter-clockwise order starting east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    E,
    NE,
    N,
    NW,
    W,
    SW,
    S,
    SE,
}

impl Direction {
    /// All directions in counter-clockwise order starting east.
    pub const ALL: [Direction; 8] = [
        Direction::E,
        Direction::NE,
        Direction::N,
        Direction::NW,
        Direction::W,
        Direction::SW,
        Direction::S,
        Direction::SE,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Direction after `steps` counter-clockwise 45° turns.
    pub fn rotated(self, steps: i32) -> Direction {
        let i = (self.index() as i32 + steps).rem_euclid(8);
        Direction::ALL[i as usize]
    }

    /// Whether the handle drives the top edge.
    pub fn has_north(self) -> bool {
        matches!(self, Direction::N | Direction::NE | Direction::NW)
    }

    /// Whether the handle drives the bottom edge.
    pub fn has_south(self) -> bool {
        matches!(self, Direction::S | Direction::SE | Direction::SW)
    }

    /// Whether the handle drives the right edge.
    pub fn has_east(self) -> bool {
        matches!(self, Direction::E | Direction::NE | Direction::SE)
    }

    /// Whether the handle drives the left edge.
    pub fn has_west(self) -> bool {
        matches!(self, Direction::W | Direction::NW | Direction::SW)
    }

    /// Anchor point of this direction on the box: a corner or an edge midpoint.
    fn anchor(self, corners: &Corners) -> PointF {
        let lt = corners.left_top();
        let rt = corners.right_top();
        let rb = corners.right_bottom();
        let lb = corners.left_bottom();
        match self {
            Direction::N => lt.midpoint(rt),
            Direction::NE => rt,
            Direction::E => rt.midpoint(rb),
            Direction::SE => rb,
            Direction::S => rb.midpoint(lb),
            Direction::SW => lb,
            Direction::W => lb.midpoint(lt),
            Direction::NW => lt,
        }
    }
}

/// Part of the transform box grabbed by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HandleType {
    #[default]
    None,
    Move,
    Scale(Direction),
    Rotate(Direction),
    Pivot,
}

/// Mouse cursor shown over a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cursor {
    Move,
    Hand,
    Size(Direction),
    Rotate(Direction),
}

/// Cursor for `handle` when the box is rotated by `angle` radians.
///
/// The direction is turned by the angle rounded to the nearest 45° step, so a
/// box rotated by 90° shows a north-south cursor on its east handle.
pub fn cursor_for(handle: HandleType, angle: f64) -> Option<Cursor> {
    let steps = if angle.is_finite() {
        (angle / FRAC_PI_4).round() as i32
    } else {
        0
    };
    match handle {
        HandleType::None => None,
        HandleType::Move => Some(Cursor::Move),
        HandleType::Pivot => Some(Cursor::Hand),
        HandleType::Scale(dir) => Some(Cursor::Size(dir.rotated(steps))),
        HandleType::Rotate(dir) => Some(Cursor::Rotate(dir.rotated(steps))),
    }
}

/// Maps a pointer position to the handle under it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleResolver {
    tolerance: f64,
}

impl HandleResolver {
    /// `tolerance` is the hit radius around each handle, in image pixels.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Position of the rotate handle for `dir`: pushed outward from the box
    /// center, beyond the scale handle at the same anchor.
    pub fn rotate_handle_position(&self, corners: &Corners, dir: Direction) -> PointF {
        let anchor = dir.anchor(corners);
        let outward = anchor - corners.center();
        let len = outward.length();
        if len == 0.0 {
            return anchor;
        }
        anchor + outward.scale(2.0 * self.tolerance / len)
    }

    /// Position of the scale handle for `dir`.
    pub fn scale_handle_position(&self, corners: &Corners, dir: Direction) -> PointF {
        dir.anchor(corners)
    }

    /// The handle nearest to `point` within tolerance.
    ///
    /// Candidates are scanned as pivot, then the eight scale handles, then
    /// the eight rotate handles; on equal distance the first one wins.
    /// Without a handle hit, a point inside the box is [`HandleType::Move`]
    /// and anything else is [`HandleType::None`].
    pub fn handle_at(&self, transformation: &Transformation, point: PointF) -> HandleType {
        let corners = transformation.transform_box();

        let candidates = std::iter::once((HandleType::Pivot, transformation.pivot()))
            .chain(
                Direction::ALL
                    .iter()
                    .map(|&d| (HandleType::Scale(d), self.scale_handle_position(&corners, d))),
            )
            .chain(
                Direction::ALL
                    .iter()
                    .map(|&d| (HandleType::Rotate(d), self.rotate_handle_position(&corners, d))),
            );

        let mut best: Option<(HandleType, f64)> = None;
        for (handle, position) in candidates {
            let distance = position.distance(point);
            if distance > self.tolerance {
                continue;
            }
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((handle, distance)),
            }
        }

        match best {
            Some((handle, _)) => handle,
            None if quad_contains(&corners, point) => HandleType::Move,
            None => HandleType::None,
        }
    }
}

/// Point-in-convex-quad test: `point` is on the same side of every edge.
fn quad_contains(corners: &Corners, point: PointF) -> bool {
    let pts = corners.as_array();
    let mut sign = 0.0f64;
    for i in 0..Corners::COUNT {
        let a = pts[i];
        let b = pts[(i + 1) % Corners::COUNT];
        let cross = (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use std::f64::consts::PI;

    fn resolver() -> HandleResolver {
        HandleResolver::new(4.0)
    }

    #[test]
    fn test_direction_rotation_wraps() {
        assert_eq!(Direction::E.rotated(2), Direction::N);
        assert_eq!(Direction::SE.rotated(1), Direction::E);
        assert_eq!(Direction::E.rotated(-1), Direction::SE);
        assert_eq!(Direction::N.rotated(8), Direction::N);
    }

    #[test]
    fn test_scale_handles_on_axis_aligned_box() {
        let t = Transformation::new(Rect::new(0, 0, 100, 50));
        let r = resolver();
        assert_eq!(
            r.handle_at(&t, PointF::new(100.0, 0.0)),
            HandleType::Scale(Direction::NE)
        );
        assert_eq!(
            r.handle_at(&t, PointF::new(50.0, 51.0)),
            HandleType::Scale(Direction::S)
        );
        assert_eq!(
            r.handle_at(&t, PointF::new(1.0, 25.0)),
            HandleType::Scale(Direction::W)
        );
    }

    #[test]
    fn test_rotate_handle_outside_corner() {
        let t = Transformation::new(Rect::new(0, 0, 100, 100));
        let r = resolver();
        let p = r.rotate_handle_position(&t.transform_box(), Direction::SE);
        assert!(p.x > 100.0 && p.y > 100.0);
        assert_eq!(r.handle_at(&t, p), HandleType::Rotate(Direction::SE));
    }

    #[test]
    fn test_pivot_and_move() {
        let t = Transformation::new(Rect::new(0, 0, 100, 100));
        let r = resolver();
        assert_eq!(r.handle_at(&t, PointF::new(51.0, 50.0)), HandleType::Pivot);
        assert_eq!(r.handle_at(&t, PointF::new(25.0, 70.0)), HandleType::Move);
        assert_eq!(r.handle_at(&t, PointF::new(300.0, 300.0)), HandleType::None);
    }

    #[test]
    fn test_hit_regions_rotate_with_box() {
        let mut t = Transformation::new(Rect::new(0, 0, 100, 100));
        t.set_angle(PI / 2.0);
        let r = resolver();
        // After a quarter turn the east edge midpoint sits at the top.
        let corners = t.transform_box();
        let east = corners.right_top().midpoint(corners.right_bottom());
        assert!((east.x - 50.0).abs() < 1e-9 && east.y.abs() < 1e-9);
        assert_eq!(r.handle_at(&t, east), HandleType::Scale(Direction::E));
    }

    #[test]
    fn test_cursor_follows_angle() {
        assert_eq!(
            cursor_for(HandleType::Scale(Direction::E), 0.0),
            Some(Cursor::Size(Direction::E))
        );
        assert_eq!(
            cursor_for(HandleType::Scale(Direction::E), PI / 2.0),
            Some(Cursor::Size(Direction::N))
        );
        assert_eq!(
            cursor_for(HandleType::Rotate(Direction::N), -PI / 4.0),
            Some(Cursor::Rotate(Direction::NE))
        );
        assert_eq!(
            cursor_for(HandleType::Scale(Direction::W), PI),
            Some(Cursor::Size(Direction::E))
        );
        assert_eq!(cursor_for(HandleType::Pivot, 1.0), Some(Cursor::Hand));
        assert_eq!(cursor_for(HandleType::Move, 1.0), Some(Cursor::Move));
        assert_eq!(cursor_for(HandleType::None, 0.0), None);
    }

    #[test]
    fn test_quad_contains_rotated() {
        let mut t = Transformation::new(Rect::new(0, 0, 10, 10));
        t.set_angle(PI / 4.0);
        let corners = t.transform_box();
        assert!(quad_contains(&corners, PointF::new(5.0, 5.0)));
        assert!(!quad_contains(&corners, PointF::new(0.5, 0.5)));
    }
}
