//! Fast inverse mapping of a parallelogram back into source space.
//!
//! For each destination pixel center `p` inside the corners' bounding box,
//! solve `p - lt = u * ex + v * ey` where `ex` and `ey` are the per-pixel
//! steps along the transformed top and left edges. `(u, v)` is the
//! source position; the nearest source pixel is `(floor(u), floor(v))`.
//!
//! With no rotation and an unchanged size `ex = (1, 0)`, `ey = (0, 1)` and
//! the mapping reduces to an integer offset, so translations are exact.

use image::{ImageBuffer, Pixel};

use crate::geometry::{Point, Rect};
use crate::transform::Corners;

/// Visit every destination pixel covered by `corners`, with its source
/// coordinates in a `src_w` x `src_h` space.
///
/// `sample` returns the pixel to write, or `None` to leave the destination
/// untouched.
pub(crate) fn map_pixels<P, F>(
    dst: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    dst_origin: Point,
    corners: &Corners,
    src_w: u32,
    src_h: u32,
    mut sample: F,
) where
    P: Pixel,
    F: FnMut(f64, f64) -> Option<P>,
{
    if src_w == 0 || src_h == 0 {
        return;
    }
    let lt = corners.left_top();
    let ex = (corners.right_top() - lt).scale(1.0 / src_w as f64);
    let ey = (corners.left_bottom() - lt).scale(1.0 / src_h as f64);
    let det = ex.x * ey.y - ex.y * ey.x;
    if det == 0.0 || !det.is_finite() {
        return;
    }

    let dst_rect = Rect::from_origin_size(dst_origin, dst.width() as i32, dst.height() as i32);
    let area = corners.bounding_rect().intersect(&dst_rect);
    if area.is_empty() {
        return;
    }

    for y in area.y..area.bottom() {
        let py = y as f64 + 0.5 - lt.y;
        for x in area.x..area.right() {
            let px = x as f64 + 0.5 - lt.x;
            let u = (px * ey.y - py * ey.x) / det;
            let v = (py * ex.x - px * ex.y) / det;
            if u < 0.0 || v < 0.0 || u >= src_w as f64 || v >= src_h as f64 {
                continue;
            }
            if let Some(pixel) = sample(u, v) {
                dst.put_pixel((x - dst_origin.x) as u32, (y - dst_origin.y) as u32, pixel);
            }
        }
    }
}

/// Draw `src` into `dst` through the parallelogram `corners` using nearest
/// sampling. Source pixels equal to `mask_color` are skipped.
pub fn draw_parallelogram<P>(
    dst: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    dst_origin: Point,
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    corners: &Corners,
    mask_color: P,
) where
    P: Pixel + PartialEq,
{
    let (w, h) = src.dimensions();
    map_pixels(dst, dst_origin, corners, w, h, |u, v| {
        let sx = (u.floor() as u32).min(w - 1);
        let sy = (v.floor() as u32).min(h - 1);
        let pixel = *src.get_pixel(sx, sy);
        (pixel != mask_color).then_some(pixel)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transformation;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use proptest::prelude::*;
    use std::f64::consts::PI;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn patterned(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x * 7 + y) as u8, 255]))
    }

    #[test]
    fn test_translation_offsets_pixels() {
        let src = patterned(4, 3);
        let mut dst = RgbaImage::new(10, 10);
        let corners = Corners::from_rect(Rect::new(5, 2, 4, 3));
        draw_parallelogram(&mut dst, Point::new(0, 0), &src, &corners, CLEAR);
        assert_eq!(dst.get_pixel(5, 2), src.get_pixel(0, 0));
        assert_eq!(dst.get_pixel(8, 4), src.get_pixel(3, 2));
        assert_eq!(dst.get_pixel(4, 2), &CLEAR);
        assert_eq!(dst.get_pixel(9, 2), &CLEAR);
    }

    #[test]
    fn test_scale_doubles_pixels() {
        let src = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10 } else { 20 }]));
        let mut dst = GrayImage::new(4, 2);
        let corners = Corners::from_rect(Rect::new(0, 0, 4, 2));
        draw_parallelogram(&mut dst, Point::new(0, 0), &src, &corners, Luma([0]));
        let row: Vec<u8> = (0..4).map(|x| dst.get_pixel(x, 1)[0]).collect();
        assert_eq!(row, vec![10, 10, 20, 20]);
    }

    #[test]
    fn test_mask_color_is_skipped() {
        let mut src = patterned(2, 2);
        src.put_pixel(1, 1, CLEAR);
        let mut dst = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 9]));
        let corners = Corners::from_rect(Rect::new(0, 0, 2, 2));
        draw_parallelogram(&mut dst, Point::new(0, 0), &src, &corners, CLEAR);
        assert_eq!(dst.get_pixel(1, 1), &Rgba([9, 9, 9, 9]));
    }

    #[test]
    fn test_half_turn_mirrors_both_axes() {
        let src = patterned(4, 4);
        let mut t = Transformation::new(Rect::new(0, 0, 4, 4));
        t.set_angle(PI);
        let mut dst = RgbaImage::new(4, 4);
        draw_parallelogram(&mut dst, Point::new(0, 0), &src, &t.transform_box(), CLEAR);
        assert_eq!(dst.get_pixel(0, 0), src.get_pixel(3, 3));
        assert_eq!(dst.get_pixel(3, 0), src.get_pixel(0, 3));
    }

    #[test]
    fn test_dst_origin_clips() {
        let src = patterned(4, 4);
        let mut dst = RgbaImage::new(2, 2);
        let corners = Corners::from_rect(Rect::new(0, 0, 4, 4));
        draw_parallelogram(&mut dst, Point::new(2, 2), &src, &corners, CLEAR);
        assert_eq!(dst.get_pixel(0, 0), src.get_pixel(2, 2));
        assert_eq!(dst.get_pixel(1, 1), src.get_pixel(3, 3));
    }

    proptest! {
        /// Property: translation-only mapping reproduces the source exactly.
        #[test]
        fn prop_translation_identity(
            w in 1u32..24,
            h in 1u32..24,
            ox in -40i32..40,
            oy in -40i32..40,
            seed in any::<u32>(),
        ) {
            let src = RgbaImage::from_fn(w, h, |x, y| {
                let v = seed.wrapping_mul(31).wrapping_add(x * 131 + y * 17);
                Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, 255])
            });
            let corners = Corners::from_rect(Rect::new(ox, oy, w as i32, h as i32));
            let mut dst = RgbaImage::new(w, h);
            draw_parallelogram(&mut dst, Point::new(ox, oy), &src, &corners, CLEAR);
            prop_assert_eq!(dst, src);
        }
    }
}
