//! Geometric model of a selection transform.
//!
//! - [`Transformation`] holds bounds, angle and pivot and derives the
//!   rotated [`Corners`].
//! - [`HandleResolver`] hit-tests the rotated box and picks a [`HandleType`].
//! - [`snap_to_grid`] and [`snap_angle`] implement the drag modifiers.
//!
//! # Coordinate System
//!
//! - Everything is in image space, origin at the top-left, y pointing down
//! - Angles are in radians, positive = counter-clockwise on screen

mod handles;
mod snap;
mod transformation;

pub use handles::{cursor_for, Cursor, Direction, HandleResolver, HandleType};
pub use snap::{snap_angle, snap_angle_degrees, snap_to_grid, KEY_ANGLES};
pub use transformation::{normalize_angle, rotate_point, Corners, Transformation};
