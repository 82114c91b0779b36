//! Pivot, angle and bounds algebra for a selection transform.
//!
//! A [`Transformation`] stores only the unrotated bounds, the rotation angle
//! and the pivot. The four transformed corners are always derived by
//! [`Transformation::transform_box`]; they are never stored.
//!
//! # Rotation Direction
//!
//! Positive angles rotate counter-clockwise on screen (y grows downward),
//! matching the angle measured by `atan2(-dy, dx)` from the pivot.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::geometry::{PointF, Rect};

/// The four transformed corners, in left-top, right-top, right-bottom,
/// left-bottom order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners([PointF; 4]);

impl Corners {
    pub const COUNT: usize = 4;

    /// Axis-aligned corners of a rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        let x1 = rect.x as f64;
        let y1 = rect.y as f64;
        let x2 = rect.right() as f64;
        let y2 = rect.bottom() as f64;
        Corners([
            PointF::new(x1, y1),
            PointF::new(x2, y1),
            PointF::new(x2, y2),
            PointF::new(x1, y2),
        ])
    }

    pub fn left_top(&self) -> PointF {
        self.0[0]
    }

    pub fn right_top(&self) -> PointF {
        self.0[1]
    }

    pub fn right_bottom(&self) -> PointF {
        self.0[2]
    }

    pub fn left_bottom(&self) -> PointF {
        self.0[3]
    }

    pub fn as_array(&self) -> &[PointF; 4] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointF> {
        self.0.iter()
    }

    /// Average of the four corners.
    pub fn center(&self) -> PointF {
        let sum = self.0.iter().fold(PointF::default(), |acc, p| acc + *p);
        sum.scale(0.25)
    }

    /// Smallest integer rectangle that covers every corner.
    pub fn bounding_rect(&self) -> Rect {
        let (mut x1, mut y1) = (f64::INFINITY, f64::INFINITY);
        let (mut x2, mut y2) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.0 {
            x1 = x1.min(p.x);
            y1 = y1.min(p.y);
            x2 = x2.max(p.x);
            y2 = y2.max(p.y);
        }
        Rect::from_corners(
            x1.floor() as i32,
            y1.floor() as i32,
            x2.ceil() as i32,
            y2.ceil() as i32,
        )
    }

    /// Union of the one-pixel cells touched by each corner of `self` and
    /// `other`. Used to report the repaint region after a move.
    pub fn modified_region(&self, other: &Corners) -> Rect {
        self.0
            .iter()
            .chain(other.0.iter())
            .map(|p| Rect::new(p.x.floor() as i32, p.y.floor() as i32, 1, 1))
            .fold(Rect::default(), |acc, cell| acc.union(&cell))
    }
}

/// Put an angle in the `(-π, π]` range.
pub fn normalize_angle(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    while angle <= -PI {
        angle += TAU;
    }
    while angle > PI {
        angle -= TAU;
    }
    angle
}

/// Rotate `point` around `pivot` by `angle` radians (counter-clockwise on screen).
pub fn rotate_point(point: PointF, pivot: PointF, angle: f64) -> PointF {
    let cos = (-angle).cos();
    let sin = (-angle).sin();
    let dx = point.x - pivot.x;
    let dy = point.y - pivot.y;
    PointF::new(
        pivot.x + dx * cos - dy * sin,
        pivot.y + dy * cos + dx * sin,
    )
}

/// Bounds, rotation angle and pivot of the selection being transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    bounds: Rect,
    angle: f64,
    pivot: PointF,
}

impl Transformation {
    /// Untransformed state: no rotation, pivot at the center of `bounds`.
    pub fn new(bounds: Rect) -> Self {
        let pivot = PointF::new(
            bounds.x as f64 + bounds.w as f64 / 2.0,
            bounds.y as f64 + bounds.h as f64 / 2.0,
        );
        Self {
            bounds,
            angle: 0.0,
            pivot,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Replace the bounding rectangle. The pivot is left where it is.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Rotation angle in radians, always in `(-π, π]`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = normalize_angle(angle);
    }

    pub fn pivot(&self) -> PointF {
        self.pivot
    }

    /// Position of the pivot inside the unrotated bounds, as a fraction of
    /// the bounds size.
    pub fn pivot_factor(&self) -> PointF {
        let w = self.bounds.w.max(1) as f64;
        let h = self.bounds.h.max(1) as f64;
        PointF::new(
            (self.pivot.x - self.bounds.x as f64) / w,
            (self.pivot.y - self.bounds.y as f64) / h,
        )
    }

    /// Rotate the corners of the bounds around the pivot.
    ///
    /// With a zero angle the result is exactly the axis-aligned corners of
    /// the bounds, whatever the pivot.
    pub fn transform_box(&self) -> Corners {
        let corners = Corners::from_rect(self.bounds);
        if self.angle == 0.0 {
            return corners;
        }
        let mut rotated = *corners.as_array();
        for p in rotated.iter_mut() {
            *p = rotate_point(*p, self.pivot, self.angle);
        }
        Corners(rotated)
    }

    /// Move the pivot to `new_pivot` without changing where the box is drawn.
    ///
    /// The rotated left-top corner is rotated back around the new pivot to
    /// find the new unrotated origin. The origin is rounded to whole pixels.
    pub fn displace_pivot_to(&mut self, new_pivot: PointF) {
        let corners = self.transform_box();
        let origin = rotate_point(corners.left_top(), new_pivot, -self.angle);
        self.pivot = new_pivot;
        self.bounds = Rect::new(
            origin.x.round() as i32,
            origin.y.round() as i32,
            self.bounds.w,
            self.bounds.h,
        );
    }

    /// Location of a pivot with fractional position `factor`, blended
    /// bilinearly over the current transformed corners.
    pub fn pivot_at_factor(&self, factor: PointF) -> PointF {
        let corners = self.transform_box();
        let lt = corners.left_top();
        let along_top = corners.right_top() - lt;
        let along_left = corners.left_bottom() - lt;
        lt + along_top.scale(factor.x) + along_left.scale(factor.y)
    }
}
