//! Pixel buffers: cels, the preview buffer and the expanded canvas used
//! when stamping.

use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::mask::SelectionMask;

/// Mirror axis for [`crate::session::TransformSession::flip_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipType {
    Horizontal,
    Vertical,
}

/// Pixels of one layer, positioned in image space.
#[derive(Debug, Clone, PartialEq)]
pub struct Cel {
    pub origin: Point,
    pub image: RgbaImage,
}

impl Cel {
    pub fn new(origin: Point, image: RgbaImage) -> Self {
        Self { origin, image }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.image.width() as i32, self.image.height() as i32)
    }

    /// Pixel at image-space position `p`, if the cel covers it.
    pub fn pixel_at(&self, p: Point) -> Option<Rgba<u8>> {
        if !self.bounds().contains(p) {
            return None;
        }
        let local = p - self.origin;
        Some(*self.image.get_pixel(local.x as u32, local.y as u32))
    }
}

/// Preview of the transformed selection, drawn over the canvas while
/// dragging. Covers the whole canvas so every transformed position is
/// addressable.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewBuffer {
    pub origin: Point,
    pub image: RgbaImage,
    pub opacity: u8,
}

impl PreviewBuffer {
    pub fn new(canvas: Rect, opacity: u8) -> Self {
        Self {
            origin: canvas.origin(),
            image: RgbaImage::new(canvas.w.max(0) as u32, canvas.h.max(0) as u32),
            opacity,
        }
    }

    /// Zero-sized buffer, left behind once a session ends.
    pub fn released() -> Self {
        Self {
            origin: Point::default(),
            image: RgbaImage::new(0, 0),
            opacity: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.image.width() as i32, self.image.height() as i32)
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        for p in self.image.pixels_mut() {
            *p = color;
        }
    }
}

/// Copy the selected pixels of `cel` into a new image covering the mask
/// bounds. Pixels outside the selection or the cel get `transparent`.
pub fn image_from_mask(cel: &Cel, mask: &SelectionMask, transparent: Rgba<u8>) -> RgbaImage {
    let bounds = mask.bounds();
    if bounds.is_empty() {
        return RgbaImage::new(0, 0);
    }
    RgbaImage::from_fn(bounds.w as u32, bounds.h as u32, |x, y| {
        let p = Point::new(bounds.x + x as i32, bounds.y + y as i32);
        if mask.contains(p) {
            cel.pixel_at(p).unwrap_or(transparent)
        } else {
            transparent
        }
    })
}

/// Copy of `cel` with every selected pixel set to `color`.
pub fn clear_mask(cel: &Cel, mask: &SelectionMask, color: Rgba<u8>) -> Cel {
    let mut cleared = cel.clone();
    let area = cel.bounds().intersect(&mask.bounds());
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            let p = Point::new(x, y);
            if mask.contains(p) {
                let local = p - cel.origin;
                cleared.image.put_pixel(local.x as u32, local.y as u32, color);
            }
        }
    }
    cleared
}

/// Source-over composite of `src` (top-left at `src_origin`) onto `dst`
/// (top-left at `dst_origin`), with `src` alpha scaled by `opacity`.
pub fn composite_normal(
    dst: &mut RgbaImage,
    dst_origin: Point,
    src: &RgbaImage,
    src_origin: Point,
    opacity: u8,
) {
    let offset = src_origin - dst_origin;
    if opacity == 255 {
        imageops::overlay(dst, src, offset.x as i64, offset.y as i64);
        return;
    }
    let mut faded = src.clone();
    for p in faded.pixels_mut() {
        p[3] = ((p[3] as u16 * opacity as u16 + 127) / 255) as u8;
    }
    imageops::overlay(dst, &faded, offset.x as i64, offset.y as i64);
}

/// A cel temporarily grown to cover a region, so pixels can be stamped
/// anywhere inside it.
#[derive(Debug, Clone)]
pub struct ExpandedCanvas {
    origin: Point,
    image: RgbaImage,
}

impl ExpandedCanvas {
    /// Grow `cel` (or an empty cel when there is none) to cover `region`,
    /// filling new pixels with `transparent`.
    pub fn new(cel: Option<&Cel>, region: Rect, transparent: Rgba<u8>) -> Self {
        let bounds = match cel {
            Some(cel) => cel.bounds().union(&region),
            None => region,
        };
        let mut image = RgbaImage::from_pixel(bounds.w.max(0) as u32, bounds.h.max(0) as u32, transparent);
        if let Some(cel) = cel {
            let offset = cel.origin - bounds.origin();
            imageops::replace(&mut image, &cel.image, offset.x as i64, offset.y as i64);
        }
        Self {
            origin: bounds.origin(),
            image,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Turn the expanded pixels into the replacement cel.
    pub fn commit(self) -> Cel {
        Cel::new(self.origin, self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_image_from_mask() {
        let cel = Cel::new(Point::new(0, 0), RgbaImage::from_pixel(4, 4, RED));
        let mut bitmap = image::GrayImage::from_pixel(2, 2, crate::mask::SELECTED);
        bitmap.put_pixel(1, 1, crate::mask::UNSELECTED);
        let mask = SelectionMask::from_bitmap(Point::new(3, 3), bitmap);
        let img = image_from_mask(&cel, &mask, CLEAR);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &RED);
        // Outside the cel.
        assert_eq!(img.get_pixel(1, 0), &CLEAR);
        // Unselected.
        assert_eq!(img.get_pixel(1, 1), &CLEAR);
    }

    #[test]
    fn test_clear_mask() {
        let cel = Cel::new(Point::new(1, 1), RgbaImage::from_pixel(3, 3, RED));
        let mask = SelectionMask::from_rect(Rect::new(0, 0, 2, 2));
        let cleared = clear_mask(&cel, &mask, CLEAR);
        assert_eq!(cleared.pixel_at(Point::new(1, 1)), Some(CLEAR));
        assert_eq!(cleared.pixel_at(Point::new(2, 1)), Some(RED));
        assert_eq!(cleared.pixel_at(Point::new(0, 0)), None);
    }

    #[test]
    fn test_composite_opaque_replaces() {
        let mut dst = RgbaImage::from_pixel(4, 4, RED);
        let mut src = RgbaImage::new(2, 2);
        src.put_pixel(0, 0, BLUE);
        composite_normal(&mut dst, Point::new(10, 10), &src, Point::new(11, 11), 255);
        assert_eq!(dst.get_pixel(1, 1), &BLUE);
        assert_eq!(dst.get_pixel(2, 2), &RED);
    }

    #[test]
    fn test_expanded_canvas_keeps_cel_pixels() {
        let cel = Cel::new(Point::new(2, 2), RgbaImage::from_pixel(2, 2, RED));
        let mut expanded = ExpandedCanvas::new(Some(&cel), Rect::new(0, 0, 8, 8), CLEAR);
        assert_eq!(expanded.origin(), Point::new(0, 0));
        expanded.image_mut().put_pixel(7, 7, BLUE);
        let out = expanded.commit();
        assert_eq!(out.bounds(), Rect::new(0, 0, 8, 8));
        assert_eq!(out.pixel_at(Point::new(3, 3)), Some(RED));
        assert_eq!(out.pixel_at(Point::new(7, 7)), Some(BLUE));
        assert_eq!(out.pixel_at(Point::new(0, 0)), Some(CLEAR));
    }

    #[test]
    fn test_preview_buffer_covers_canvas() {
        let preview = PreviewBuffer::new(Rect::new(0, 0, 32, 16), 200);
        assert_eq!(preview.bounds(), Rect::new(0, 0, 32, 16));
        assert_eq!(preview.opacity, 200);
    }
}
