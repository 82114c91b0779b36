//! Pointer-driven state machine: catch, drag, drop.

use std::ops::BitOr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{lock_document, TransformSession};
use crate::document::Document;
use crate::error::TransformError;
use crate::geometry::{Point, PointF, Rect};
use crate::mask::SelectionMask;
use crate::transform::{normalize_angle, snap_angle, snap_to_grid, Direction, HandleType, Transformation};

/// Modifier keys held during a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MoveModifiers(u8);

impl MoveModifiers {
    pub const NONE: MoveModifiers = MoveModifiers(0);
    /// Move handle only: keep the left-top corner on the grid.
    pub const SNAP_TO_GRID: MoveModifiers = MoveModifiers(1);
    /// Move handle only: move along the dominant axis.
    pub const LOCK_AXIS: MoveModifiers = MoveModifiers(1 << 1);
    /// Scale handles: keep the initial width/height ratio.
    pub const MAINTAIN_ASPECT_RATIO: MoveModifiers = MoveModifiers(1 << 2);
    /// Rotate handles: snap to pixel-art friendly angles.
    pub const ANGLE_SNAP: MoveModifiers = MoveModifiers(1 << 3);

    /// Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        MoveModifiers(bits & 0b1111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: MoveModifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MoveModifiers {
    type Output = MoveModifiers;

    fn bitor(self, rhs: MoveModifiers) -> MoveModifiers {
        MoveModifiers(self.0 | rhs.0)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for a pointer press.
    Idle,
    /// A handle was grabbed, the pointer has not moved yet.
    Catching,
    Dragging,
    /// Stamped and committed.
    Dropped,
    /// Cancelled.
    Discarded,
}

/// Largest magnitude an edge may reach, so widths stay representable.
const EDGE_LIMIT: i64 = (i32::MAX / 2) as i64;

/// New transformation for a pointer at `pos`, grabbed at `catch` on
/// `handle`.
///
/// Edge arithmetic runs in `i64` and the result is clamped back into `i32`
/// range, keeping width and height at least 1 pixel.
///
/// # Arguments
///
/// * `initial` - Transform at catch time; deltas are applied to its bounds
/// * `current` - Live transform, whose angle orients the pointer delta
/// * `handle` - Handle grabbed at `catch`
/// * `catch` - Pointer position when the handle was grabbed
/// * `pos` - Current pointer position
/// * `modifiers` - Snap, axis lock, aspect lock and angle snap keys
/// * `grid` - Grid origin and cell size used by [`MoveModifiers::SNAP_TO_GRID`]
///
/// # Returns
///
/// The new transformation, and whether the bounds changed (the pivot then
/// needs re-anchoring once the drag ends).
///
/// # Example
///
/// ```
/// use pixmove_core::session::apply_handle;
/// use pixmove_core::{HandleType, MoveModifiers, Point, Rect, Transformation};
///
/// let t = Transformation::new(Rect::new(0, 0, 20, 20));
/// let (next, moved) = apply_handle(
///     &t, &t, HandleType::Move,
///     Point::new(10, 10), Point::new(15, 12),
///     MoveModifiers::NONE, Rect::new(0, 0, 16, 16),
/// );
/// assert_eq!(next.bounds(), Rect::new(5, 2, 20, 20));
/// assert!(moved);
/// ```
pub fn apply_handle(
    initial: &Transformation,
    current: &Transformation,
    handle: HandleType,
    catch: Point,
    pos: Point,
    modifiers: MoveModifiers,
    grid: Rect,
) -> (Transformation, bool) {
    let start = initial.bounds();
    let (mut x1, mut y1) = (start.x as i64, start.y as i64);
    let (mut x2, mut y2) = (x1 + start.w as i64, y1 + start.h as i64);

    // Pointer delta in the box's own frame.
    let ddx = pos.x as f64 - catch.x as f64;
    let ddy = pos.y as f64 - catch.y as f64;
    let (sin, cos) = current.angle().sin_cos();
    let dx = (ddx * cos - ddy * sin) as i64;
    let dy = (ddx * sin + ddy * cos) as i64;

    match handle {
        HandleType::None => return (current.clone(), false),

        HandleType::Move => {
            x1 += dx;
            y1 += dy;
            x2 += dx;
            y2 += dy;

            if modifiers.contains(MoveModifiers::SNAP_TO_GRID) {
                let left_top = Point::new(clamp_edge(x1) as i32, clamp_edge(y1) as i32);
                let snapped = snap_to_grid(grid, left_top);
                let ox = snapped.x as i64 - x1;
                let oy = snapped.y as i64 - y1;
                x1 += ox;
                y1 += oy;
                x2 += ox;
                y2 += oy;
            } else if modifiers.contains(MoveModifiers::LOCK_AXIS) {
                if dx.abs() < dy.abs() {
                    x1 -= dx;
                    x2 -= dx;
                } else {
                    y1 -= dy;
                    y2 -= dy;
                }
            }
        }

        HandleType::Scale(dir) => {
            if dir.has_west() {
                x1 = (x1 + dx).min(x2 - 1);
            }
            if dir.has_east() {
                x2 = (x2 + dx).max(x1 + 1);
            }
            if dir.has_north() {
                y1 = (y1 + dy).min(y2 - 1);
            }
            if dir.has_south() {
                y2 = (y2 + dy).max(y1 + 1);
            }
            if modifiers.contains(MoveModifiers::MAINTAIN_ASPECT_RATIO) {
                let mut edges = clamp_edges(x1, y1, x2, y2);
                keep_aspect(dir, start.w.max(1) as i64, start.h.max(1) as i64, &mut edges);
                (x1, y1, x2, y2) = edges;
            }
        }

        HandleType::Rotate(_) => {
            let initial_pivot = initial.pivot();
            let pivot = current.pivot();
            let mut angle = initial.angle()
                + (pivot.y - pos.y as f64).atan2(pos.x as f64 - pivot.x)
                - (initial_pivot.y - catch.y as f64).atan2(catch.x as f64 - initial_pivot.x);
            angle = normalize_angle(angle);
            if modifiers.contains(MoveModifiers::ANGLE_SNAP) {
                angle = snap_angle(angle);
            }
            let mut next = current.clone();
            next.set_angle(angle);
            return (next, false);
        }

        HandleType::Pivot => {
            let mut next = initial.clone();
            next.displace_pivot_to(initial.pivot() + PointF::new(ddx, ddy));
            return (next, false);
        }
    }

    let (x1, y1, x2, y2) = clamp_edges(x1, y1, x2, y2);
    let mut next = current.clone();
    next.set_bounds(Rect::from_corners(x1 as i32, y1 as i32, x2 as i32, y2 as i32));
    (next, true)
}

fn clamp_edge(v: i64) -> i64 {
    v.clamp(-EDGE_LIMIT, EDGE_LIMIT)
}

/// Clamp edges into `±EDGE_LIMIT` with at least one pixel between them.
fn clamp_edges(x1: i64, y1: i64, x2: i64, y2: i64) -> (i64, i64, i64, i64) {
    let x1 = x1.clamp(-EDGE_LIMIT, EDGE_LIMIT - 1);
    let y1 = y1.clamp(-EDGE_LIMIT, EDGE_LIMIT - 1);
    (x1, y1, x2.clamp(x1 + 1, EDGE_LIMIT), y2.clamp(y1 + 1, EDGE_LIMIT))
}

/// Recompute one edge so the box keeps the `iw`:`ih` ratio.
///
/// Corner handles adjust the edge on the axis that grew relatively less;
/// edge handles adjust the axis they do not drive, keeping the top or left
/// edge fixed.
fn keep_aspect(dir: Direction, iw: i64, ih: i64, edges: &mut (i64, i64, i64, i64)) {
    let (x1, y1, x2, y2) = edges;
    let drives_x = dir.has_east() || dir.has_west();
    let drives_y = dir.has_north() || dir.has_south();
    let wider = 1000 * (*x2 - *x1) / iw > 1000 * (*y2 - *y1) / ih;

    if drives_x && (!drives_y || wider) {
        let h = (ih * (*x2 - *x1) / iw).max(1);
        if dir.has_north() {
            *y1 = *y2 - h;
        } else {
            *y2 = *y1 + h;
        }
    } else {
        let w = (iw * (*y2 - *y1) / ih).max(1);
        if dir.has_west() {
            *x1 = *x2 - w;
        } else {
            *x2 = *x1 + w;
        }
    }
}

impl<D: Document> TransformSession<D> {
    /// Grab `handle` at `pos`. A [`HandleType::None`] catch is ignored.
    pub fn catch_image(&mut self, pos: Point, handle: HandleType) -> Result<(), TransformError> {
        self.ensure_active()?;
        if handle == HandleType::None {
            return Ok(());
        }
        self.catch_pos = pos;
        self.handle = handle;
        self.state = SessionState::Catching;
        debug!(?pos, ?handle, "catch");
        Ok(())
    }

    /// Grab again after a temporary drop: the current transform becomes the
    /// new baseline and the outline is hidden while dragging.
    pub fn catch_image_again(&mut self, pos: Point, handle: HandleType) -> Result<(), TransformError> {
        self.ensure_active()?;
        if handle == HandleType::None {
            return Ok(());
        }
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        self.initial = self.current.clone();
        self.catch_pos = pos;
        self.handle = handle;
        self.state = SessionState::Catching;
        doc.generate_mask_boundaries(Some(&SelectionMask::new()));
        debug!(?pos, ?handle, "catch again");
        Ok(())
    }

    /// Follow the pointer to `pos`. Ignored when nothing is caught.
    pub fn move_image(&mut self, pos: Point, modifiers: MoveModifiers) -> Result<(), TransformError> {
        self.ensure_active()?;
        if !self.is_dragging() || self.handle == HandleType::None {
            return Ok(());
        }
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;

        let old_corners = self.current.transform_box();
        let (next, bounds_changed) = apply_handle(
            &self.initial,
            &self.current,
            self.handle,
            self.catch_pos,
            pos,
            modifiers,
            doc.grid_bounds(),
        );
        self.current = next;
        if bounds_changed {
            self.adjust_pivot = true;
        }
        self.state = SessionState::Dragging;

        self.redraw_extra_image();
        self.redraw_mask();
        doc.set_extra_cel(&self.preview);
        doc.set_transformation(&self.current);

        let region = old_corners.modified_region(&self.current.transform_box());
        if !region.is_empty() {
            doc.notify_pixels_modified(region);
        }
        Ok(())
    }

    /// End the drag without ending the session: re-anchor the pivot and
    /// push the moved mask to the document.
    pub fn drop_image_temporarily(&mut self) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        self.state = SessionState::Idle;

        if self.adjust_pivot {
            self.adjust_pivot = false;
            let factor = self.initial.pivot_factor();
            let pivot = self.current.pivot_at_factor(factor);
            self.current.displace_pivot_to(pivot);
            doc.set_transformation(&self.current);
        }

        self.redraw_mask();
        self.update_document_mask(&mut *doc)
    }

    /// Keyboard nudge: move by `delta` as one complete drag.
    pub fn translate(&mut self, delta: Point) -> Result<(), TransformError> {
        self.catch_image_again(Point::default(), HandleType::Move)?;
        self.move_image(delta, MoveModifiers::NONE)?;
        self.drop_image_temporarily()
    }
}
