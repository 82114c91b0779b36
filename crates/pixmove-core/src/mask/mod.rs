//! Selection masks.
//!
//! A [`SelectionMask`] is a bitmap (0 = unselected, anything else =
//! selected) positioned in image space, plus its cached outline.
//!
//! ## Freezing
//!
//! Every mutation normally shrinks the mask to its content and recomputes
//! the outline. Between [`SelectionMask::freeze`] and the matching
//! [`SelectionMask::unfreeze`] that work is postponed, and the final
//! unfreeze performs it exactly once.

mod boundary;
mod sync;

use image::{imageops, GrayImage, Luma};

use crate::canvas::FlipType;
use crate::geometry::{Point, Rect};

pub use boundary::{compute_boundary, BoundarySegment};
pub use sync::redraw_current_mask;

/// Value written for selected pixels.
pub const SELECTED: Luma<u8> = Luma([255]);
/// Value written for unselected pixels.
pub const UNSELECTED: Luma<u8> = Luma([0]);

#[derive(Debug, Clone, Default)]
pub struct SelectionMask {
    bounds: Rect,
    bitmap: GrayImage,
    freeze_depth: u32,
    boundary: Vec<BoundarySegment>,
    recomputations: u64,
}

impl PartialEq for SelectionMask {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds && self.bitmap == other.bitmap
    }
}

impl SelectionMask {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully selected rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        let mut mask = Self::new();
        mask.replace(rect);
        mask
    }

    /// Selection from a bitmap whose top-left pixel is at `origin`.
    pub fn from_bitmap(origin: Point, bitmap: GrayImage) -> Self {
        let mut mask = Self {
            bounds: Rect::from_origin_size(origin, bitmap.width() as i32, bitmap.height() as i32),
            bitmap,
            ..Self::default()
        };
        mask.changed();
        mask
    }

    /// Bounds of the bitmap in image space. Tight around the selected
    /// pixels except while frozen.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn origin(&self) -> Point {
        self.bounds.origin()
    }

    pub fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty() || self.bitmap.pixels().all(|p| p[0] == 0)
    }

    /// Whether the image-space pixel `p` is selected.
    pub fn contains(&self, p: Point) -> bool {
        if !self.bounds.contains(p) {
            return false;
        }
        let local = p - self.bounds.origin();
        self.bitmap.get_pixel(local.x as u32, local.y as u32)[0] != 0
    }

    /// Select exactly `rect`.
    pub fn replace(&mut self, rect: Rect) {
        self.set_bitmap(rect, SELECTED);
        self.changed();
    }

    /// Make the bitmap cover `rect` with nothing selected. Only useful
    /// while frozen, otherwise the mask shrinks back to empty.
    pub fn reserve(&mut self, rect: Rect) {
        self.set_bitmap(rect, UNSELECTED);
        self.changed();
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.bounds = Rect::default();
        self.bitmap = GrayImage::new(0, 0);
        self.changed();
    }

    /// Take the bitmap and bounds of `other`.
    pub fn copy_from(&mut self, other: &SelectionMask) {
        self.bounds = other.bounds;
        self.bitmap = other.bitmap.clone();
        self.changed();
    }

    /// Mirror the bitmap inside its bounds.
    pub fn flip(&mut self, flip: FlipType) {
        match flip {
            FlipType::Horizontal => imageops::flip_horizontal_in_place(&mut self.bitmap),
            FlipType::Vertical => imageops::flip_vertical_in_place(&mut self.bitmap),
        }
        self.changed();
    }

    /// Edit the bitmap in place. `f` receives the bitmap and the image-space
    /// position of its top-left pixel.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut GrayImage, Point) -> R) -> R {
        let origin = self.bounds.origin();
        let result = f(&mut self.bitmap, origin);
        self.changed();
        result
    }

    pub fn freeze(&mut self) {
        self.freeze_depth += 1;
    }

    /// Leave one freeze level; leaving the last one recomputes the outline.
    pub fn unfreeze(&mut self) {
        if self.freeze_depth == 0 {
            return;
        }
        self.freeze_depth -= 1;
        self.changed();
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_depth > 0
    }

    /// Cached outline, valid whenever the mask is not frozen.
    pub fn boundary(&self) -> &[BoundarySegment] {
        &self.boundary
    }

    /// How many times the outline was rebuilt.
    pub fn boundary_recomputations(&self) -> u64 {
        self.recomputations
    }

    fn set_bitmap(&mut self, rect: Rect, value: Luma<u8>) {
        if rect.is_empty() {
            self.bounds = Rect::default();
            self.bitmap = GrayImage::new(0, 0);
        } else {
            self.bounds = rect;
            self.bitmap = GrayImage::from_pixel(rect.w as u32, rect.h as u32, value);
        }
    }

    fn changed(&mut self) {
        if self.is_frozen() {
            return;
        }
        self.shrink();
        self.boundary = compute_boundary(&self.bitmap, self.bounds.origin());
        self.recomputations += 1;
    }

    /// Crop the bitmap to its selected pixels.
    fn shrink(&mut self) {
        let (w, h) = self.bitmap.dimensions();
        let (mut x1, mut y1, mut x2, mut y2) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for (x, y, p) in self.bitmap.enumerate_pixels() {
            if p[0] != 0 {
                x1 = x1.min(x);
                y1 = y1.min(y);
                x2 = x2.max(x + 1);
                y2 = y2.max(y + 1);
            }
        }
        if x1 == u32::MAX {
            self.bounds = Rect::default();
            self.bitmap = GrayImage::new(0, 0);
            return;
        }
        if (x1, y1, x2, y2) == (0, 0, w, h) {
            return;
        }
        self.bitmap = imageops::crop_imm(&self.bitmap, x1, y1, x2 - x1, y2 - y1).to_image();
        self.bounds = Rect::new(
            self.bounds.x + x1 as i32,
            self.bounds.y + y1 as i32,
            (x2 - x1) as i32,
            (y2 - y1) as i32,
        );
    }
}
