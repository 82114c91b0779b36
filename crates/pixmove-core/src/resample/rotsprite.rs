//! RotSprite: pixel-art aware rotation.
//!
//! The source is upscaled 8x with three Scale2x (EPX) passes, which smooths
//! diagonal edges without inventing new colors. The upscaled copy is then
//! sampled through the same parallelogram mapping as the fast path, at
//! eight sub-positions per source pixel.

use image::{ImageBuffer, Pixel, Primitive};

use super::parallelogram::map_pixels;
use crate::error::ResampleError;
use crate::geometry::Point;
use crate::transform::Corners;

const UPSCALE: u32 = 8;

type Buffer<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Bytes needed for the 2x, 4x and 8x copies of a `w` x `h` image.
pub fn required_memory<P: Pixel>(w: u32, h: u32) -> u64 {
    let bytes_per_pixel = (std::mem::size_of::<P::Subpixel>() * P::CHANNEL_COUNT as usize) as u64;
    (4 + 16 + 64) * w as u64 * h as u64 * bytes_per_pixel
}

/// Draw `src` into `dst` through `corners` with RotSprite.
///
/// Fails with [`ResampleError::OutOfMemory`] before touching `dst` when the
/// upscaled copies exceed `memory_limit` or cannot be allocated.
pub fn draw_rotsprite<P>(
    dst: &mut Buffer<P>,
    dst_origin: Point,
    src: &Buffer<P>,
    corners: &Corners,
    mask_color: P,
    memory_limit: u64,
) -> Result<(), ResampleError>
where
    P: Pixel + PartialEq,
{
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return Err(ResampleError::EmptySource);
    }
    let required = required_memory::<P>(w, h);
    if required > memory_limit {
        return Err(ResampleError::OutOfMemory {
            required,
            limit: memory_limit,
        });
    }
    let oom = || ResampleError::OutOfMemory {
        required,
        limit: memory_limit,
    };

    let x2 = scale2x(src).ok_or_else(oom)?;
    let x4 = scale2x(&x2).ok_or_else(oom)?;
    let x8 = scale2x(&x4).ok_or_else(oom)?;

    let (uw, uh) = x8.dimensions();
    map_pixels(dst, dst_origin, corners, w, h, |u, v| {
        let sx = ((u * UPSCALE as f64).floor() as u32).min(uw - 1);
        let sy = ((v * UPSCALE as f64).floor() as u32).min(uh - 1);
        let pixel = *x8.get_pixel(sx, sy);
        (pixel != mask_color).then_some(pixel)
    });
    Ok(())
}

/// Allocate a zeroed buffer, returning `None` if the allocator refuses.
fn try_alloc<P: Pixel>(w: u32, h: u32) -> Option<Buffer<P>> {
    let len = (w as usize)
        .checked_mul(h as usize)?
        .checked_mul(P::CHANNEL_COUNT as usize)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).ok()?;
    data.resize(len, <P::Subpixel as Primitive>::DEFAULT_MIN_VALUE);
    ImageBuffer::from_raw(w, h, data)
}

/// Double the image with the EPX rules.
///
/// ```text
///   A        E0 E1
/// C P B  ->  E2 E3
///   D
/// ```
fn scale2x<P>(src: &Buffer<P>) -> Option<Buffer<P>>
where
    P: Pixel + PartialEq,
{
    let (w, h) = src.dimensions();
    let mut out = try_alloc::<P>(w.checked_mul(2)?, h.checked_mul(2)?)?;

    for y in 0..h {
        for x in 0..w {
            let p = *src.get_pixel(x, y);
            let a = *src.get_pixel(x, y.saturating_sub(1));
            let b = *src.get_pixel((x + 1).min(w - 1), y);
            let c = *src.get_pixel(x.saturating_sub(1), y);
            let d = *src.get_pixel(x, (y + 1).min(h - 1));

            let e0 = if c == a && c != d && a != b { a } else { p };
            let e1 = if a == b && a != c && b != d { b } else { p };
            let e2 = if d == c && d != b && c != a { c } else { p };
            let e3 = if b == d && b != a && d != c { d } else { p };

            out.put_pixel(x * 2, y * 2, e0);
            out.put_pixel(x * 2 + 1, y * 2, e1);
            out.put_pixel(x * 2, y * 2 + 1, e2);
            out.put_pixel(x * 2 + 1, y * 2 + 1, e3);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::transform::Transformation;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use std::f64::consts::PI;

    #[test]
    fn test_required_memory() {
        assert_eq!(required_memory::<Rgba<u8>>(10, 10), 84 * 100 * 4);
        assert_eq!(required_memory::<Luma<u8>>(2, 3), 84 * 6);
    }

    #[test]
    fn test_scale2x_flat_image_stays_flat() {
        let src = GrayImage::from_pixel(3, 2, Luma([7]));
        let out = scale2x(&src).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        assert!(out.pixels().all(|p| p[0] == 7));
    }

    #[test]
    fn test_scale2x_smooths_diagonal() {
        // 1 0
        // 0 1  -> the EPX corners next to the diagonal pick up the 0s.
        let src = GrayImage::from_fn(2, 2, |x, y| Luma([if x == y { 1 } else { 0 }]));
        let out = scale2x(&src).unwrap();
        // Top-left pixel (1): A = 1 (clamped), B = 0, C = 1 (clamped), D = 0.
        // E3: B == D && B != A && D != C -> 0.
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        assert_eq!(out.get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn test_over_budget_leaves_dst_untouched() {
        let src = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let mut dst = RgbaImage::new(8, 8);
        let corners = Corners::from_rect(Rect::new(0, 0, 8, 8));
        let err = draw_rotsprite(&mut dst, Point::new(0, 0), &src, &corners, Rgba([0; 4]), 64)
            .unwrap_err();
        assert_eq!(
            err,
            ResampleError::OutOfMemory {
                required: required_memory::<Rgba<u8>>(8, 8),
                limit: 64
            }
        );
        assert!(dst.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_empty_source() {
        let src = RgbaImage::new(0, 0);
        let mut dst = RgbaImage::new(4, 4);
        let corners = Corners::from_rect(Rect::new(0, 0, 4, 4));
        let err = draw_rotsprite(&mut dst, Point::new(0, 0), &src, &corners, Rgba([0; 4]), u64::MAX);
        assert_eq!(err, Err(ResampleError::EmptySource));
    }

    #[test]
    fn test_quarter_turn_keeps_solid_block() {
        let src = RgbaImage::from_pixel(6, 6, Rgba([200, 10, 10, 255]));
        let mut t = Transformation::new(Rect::new(2, 2, 6, 6));
        t.set_angle(PI / 2.0);
        let mut dst = RgbaImage::new(10, 10);
        draw_rotsprite(
            &mut dst,
            Point::new(0, 0),
            &src,
            &t.transform_box(),
            Rgba([0; 4]),
            u64::MAX,
        )
        .unwrap();
        assert_eq!(dst.get_pixel(5, 5), &Rgba([200, 10, 10, 255]));
        assert_eq!(dst.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }
}
