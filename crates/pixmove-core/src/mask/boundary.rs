//! Outline ("marching ants") of a selection bitmap.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Straight piece of the selection outline, on pixel edges in image space.
///
/// Horizontal segments go left to right and vertical ones top to bottom.
/// `inside_first` tells which side is selected: above/left when true,
/// below/right when false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundarySegment {
    pub from: Point,
    pub to: Point,
    pub inside_first: bool,
}

fn selected(bitmap: &GrayImage, x: i64, y: i64) -> bool {
    if x < 0 || y < 0 || x >= bitmap.width() as i64 || y >= bitmap.height() as i64 {
        return false;
    }
    bitmap.get_pixel(x as u32, y as u32)[0] != 0
}

/// Outline of every non-zero pixel in `bitmap`, whose top-left pixel sits
/// at `origin`. Collinear unit edges with the same inside side are merged.
pub fn compute_boundary(bitmap: &GrayImage, origin: Point) -> Vec<BoundarySegment> {
    let (w, h) = (bitmap.width() as i64, bitmap.height() as i64);
    let mut segments = Vec::new();

    // Horizontal edges: between row y - 1 and row y.
    for y in 0..=h {
        let mut run: Option<(i64, bool)> = None;
        for x in 0..=w {
            let edge = if x < w {
                let above = selected(bitmap, x, y - 1);
                let below = selected(bitmap, x, y);
                (above != below).then_some(above)
            } else {
                None
            };
            match (run, edge) {
                (Some((_, side)), Some(s)) if side == s => {}
                _ => {
                    if let Some((start, side)) = run.take() {
                        segments.push(BoundarySegment {
                            from: Point::new(origin.x + start as i32, origin.y + y as i32),
                            to: Point::new(origin.x + x as i32, origin.y + y as i32),
                            inside_first: side,
                        });
                    }
                    run = edge.map(|s| (x, s));
                }
            }
        }
    }

    // Vertical edges: between column x - 1 and column x.
    for x in 0..=w {
        let mut run: Option<(i64, bool)> = None;
        for y in 0..=h {
            let edge = if y < h {
                let left = selected(bitmap, x - 1, y);
                let right = selected(bitmap, x, y);
                (left != right).then_some(left)
            } else {
                None
            };
            match (run, edge) {
                (Some((_, side)), Some(s)) if side == s => {}
                _ => {
                    if let Some((start, side)) = run.take() {
                        segments.push(BoundarySegment {
                            from: Point::new(origin.x + x as i32, origin.y + start as i32),
                            to: Point::new(origin.x + x as i32, origin.y + y as i32),
                            inside_first: side,
                        });
                    }
                    run = edge.map(|s| (y, s));
                }
            }
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_rectangle_has_four_sides() {
        let bitmap = GrayImage::from_pixel(2, 3, Luma([255]));
        let segments = compute_boundary(&bitmap, Point::new(10, 20));
        assert_eq!(segments.len(), 4);
        assert!(segments.contains(&BoundarySegment {
            from: Point::new(10, 20),
            to: Point::new(12, 20),
            inside_first: false,
        }));
        assert!(segments.contains(&BoundarySegment {
            from: Point::new(10, 23),
            to: Point::new(12, 23),
            inside_first: true,
        }));
        assert!(segments.contains(&BoundarySegment {
            from: Point::new(12, 20),
            to: Point::new(12, 23),
            inside_first: true,
        }));
    }

    #[test]
    fn test_empty_bitmap_has_no_boundary() {
        let bitmap = GrayImage::new(4, 4);
        assert!(compute_boundary(&bitmap, Point::new(0, 0)).is_empty());
    }

    #[test]
    fn test_hole_adds_inner_outline() {
        let mut bitmap = GrayImage::from_pixel(3, 3, Luma([255]));
        bitmap.put_pixel(1, 1, Luma([0]));
        let segments = compute_boundary(&bitmap, Point::new(0, 0));
        // 4 outer sides + 4 sides around the hole.
        assert_eq!(segments.len(), 8);
    }
}
