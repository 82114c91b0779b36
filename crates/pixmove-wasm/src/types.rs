//! WASM-compatible wrapper types for image data and handle codes.
//!
//! JavaScript sees images as RGBA byte buffers with a position, and handles
//! as small integer codes, so nothing here needs a serializer.

use image::RgbaImage;
use pixmove_core::{Cursor, Direction, HandleType, Point, RotationAlgorithm};
use wasm_bindgen::prelude::*;

/// An RGBA image positioned on the canvas.
///
/// # Memory Management
///
/// The pixel data is stored in WASM memory. `pixels()` copies it out as a
/// `Uint8Array`. Calling `free()` releases the WASM side early; otherwise the
/// wasm-bindgen finalizer does it.
#[wasm_bindgen]
pub struct JsImage {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsImage {
    /// Create an image at the canvas origin.
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsImage {
        JsImage {
            x: 0,
            y: 0,
            width,
            height,
            pixels,
        }
    }

    /// Canvas x of the top-left pixel
    #[wasm_bindgen(getter)]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Canvas y of the top-left pixel
    #[wasm_bindgen(getter)]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in the pixel buffer (width * height * 4)
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGBA pixel data as Uint8Array (a copy).
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsImage {
    pub(crate) fn from_rgba(image: RgbaImage, origin: Point) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }

    /// Copy into an `RgbaImage`; fails when the buffer does not hold
    /// exactly `width * height` RGBA pixels.
    pub(crate) fn to_rgba(&self) -> Result<RgbaImage, String> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or_else(|| {
            format!(
                "pixel buffer holds {} bytes, expected {} for {}x{} RGBA",
                self.pixels.len(),
                self.width as usize * self.height as usize * 4,
                self.width,
                self.height
            )
        })
    }

    pub(crate) fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

const HANDLE_MOVE: u8 = 1;
const HANDLE_PIVOT: u8 = 2;
const HANDLE_SCALE: u8 = 16;
const HANDLE_ROTATE: u8 = 32;

/// Convert a handle code to the core `HandleType`.
///
/// Values:
/// - 0 = None
/// - 1 = Move
/// - 2 = Pivot
/// - 16..=23 = Scale, 32..=39 = Rotate; the low three bits pick the
///   direction counter-clockwise from east (0 = E, 2 = N, 4 = W, 6 = S)
///
/// Any other value maps to None.
pub(crate) fn handle_from_u8(value: u8) -> HandleType {
    let dir = Direction::ALL[(value & 7) as usize];
    match value {
        HANDLE_MOVE => HandleType::Move,
        HANDLE_PIVOT => HandleType::Pivot,
        16..=23 => HandleType::Scale(dir),
        32..=39 => HandleType::Rotate(dir),
        _ => HandleType::None,
    }
}

pub(crate) fn handle_to_u8(handle: HandleType) -> u8 {
    match handle {
        HandleType::None => 0,
        HandleType::Move => HANDLE_MOVE,
        HandleType::Pivot => HANDLE_PIVOT,
        HandleType::Scale(dir) => HANDLE_SCALE + dir as u8,
        HandleType::Rotate(dir) => HANDLE_ROTATE + dir as u8,
    }
}

/// 0 = Fast, 1 = RotSprite. Anything else falls back to Fast.
pub(crate) fn algorithm_from_u8(value: u8) -> RotationAlgorithm {
    match value {
        1 => RotationAlgorithm::RotSprite,
        _ => RotationAlgorithm::Fast,
    }
}

/// CSS cursor name for a cursor, "default" away from the box.
///
/// Rotation cursors have no CSS equivalent and are reported as
/// `rotate-<direction>` for the host to map onto its own images.
pub(crate) fn css_cursor(cursor: Option<Cursor>) -> String {
    let name = match cursor {
        None => "default",
        Some(Cursor::Move) => "move",
        Some(Cursor::Hand) => "grab",
        Some(Cursor::Size(Direction::E | Direction::W)) => "ew-resize",
        Some(Cursor::Size(Direction::N | Direction::S)) => "ns-resize",
        Some(Cursor::Size(Direction::NE | Direction::SW)) => "nesw-resize",
        Some(Cursor::Size(Direction::NW | Direction::SE)) => "nwse-resize",
        Some(Cursor::Rotate(dir)) => return format!("rotate-{}", format!("{dir:?}").to_lowercase()),
    };
    name.to_string()
}
