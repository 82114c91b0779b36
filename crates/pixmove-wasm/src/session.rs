//! Transform session bindings.
//!
//! A `JsTransformSession` owns an in-memory document built from the host's
//! canvas pixels and drives one core `TransformSession` over it. The host
//! forwards pointer events, reads back `render()` for display, and finally
//! calls `drop_image()` or `discard()`.

use image::{Rgba, RgbaImage};
use pixmove_core::canvas::composite_normal;
use pixmove_core::{
    lock_document, shared, Cel, Document, FlipType, MemoryDocument, MoveModifiers, Point, PointF,
    Rect, SelectionMask, SharedDocument, StartMode, TransformError, TransformSession,
    TransformSettings,
};
use wasm_bindgen::prelude::*;

use crate::types::{algorithm_from_u8, css_cursor, handle_from_u8, handle_to_u8, JsImage};

fn to_js(err: TransformError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_settings(value: JsValue) -> Result<TransformSettings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(TransformSettings::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// A selection transformation over a copy of the host canvas.
#[wasm_bindgen]
pub struct JsTransformSession {
    document: SharedDocument<MemoryDocument>,
    inner: TransformSession<MemoryDocument>,
}

#[wasm_bindgen]
impl JsTransformSession {
    /// Start transforming the rectangle `x, y, width, height` of `canvas`.
    ///
    /// With `cut` the selected pixels are cleared from the canvas while they
    /// move; otherwise they are copied. `settings` is an optional object with
    /// `rotation_algorithm`, `handle_tolerance`, `rotsprite_memory_limit` and
    /// `opacity` fields.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas: &JsImage,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        cut: bool,
        settings: JsValue,
    ) -> Result<JsTransformSession, JsValue> {
        let settings = parse_settings(settings)?;
        let mode = if cut { StartMode::Cut } else { StartMode::Copy };
        Self::open(canvas, Rect::new(x, y, width, height), mode, settings)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Start moving an external `image`, placed at its own `x`/`y`, over
    /// `canvas`.
    pub fn paste(
        canvas: &JsImage,
        image: &JsImage,
        settings: JsValue,
    ) -> Result<JsTransformSession, JsValue> {
        let settings = parse_settings(settings)?;
        Self::open_paste(canvas, image, settings).map_err(|e| JsValue::from_str(&e))
    }

    /// Grab `handle` (see `handle_at`) at canvas position `x, y`.
    pub fn catch(&mut self, x: i32, y: i32, handle: u8) -> Result<(), JsValue> {
        self.inner
            .catch_image(Point::new(x, y), handle_from_u8(handle))
            .map_err(to_js)
    }

    /// Grab again after a temporary drop, rebasing the drag on the current
    /// transform.
    pub fn catch_again(&mut self, x: i32, y: i32, handle: u8) -> Result<(), JsValue> {
        self.inner
            .catch_image_again(Point::new(x, y), handle_from_u8(handle))
            .map_err(to_js)
    }

    /// Pointer moved to `x, y`.
    ///
    /// `modifiers` bits: 1 = snap to grid, 2 = lock axis, 4 = keep aspect
    /// ratio, 8 = snap angle.
    #[wasm_bindgen(js_name = moveTo)]
    pub fn move_to(&mut self, x: i32, y: i32, modifiers: u8) -> Result<(), JsValue> {
        let result = self
            .inner
            .move_image(Point::new(x, y), MoveModifiers::from_bits(modifiers));
        self.report_advisories();
        result.map_err(to_js)
    }

    /// Pointer released; the session stays open.
    pub fn drop_temporarily(&mut self) -> Result<(), JsValue> {
        let result = self.inner.drop_image_temporarily();
        self.report_advisories();
        result.map_err(to_js)
    }

    /// Nudge by `dx, dy` pixels, as arrow keys do.
    pub fn translate(&mut self, dx: i32, dy: i32) -> Result<(), JsValue> {
        let result = self.inner.translate(Point::new(dx, dy));
        self.report_advisories();
        result.map_err(to_js)
    }

    pub fn flip(&mut self, horizontal: bool) -> Result<(), JsValue> {
        let flip = if horizontal {
            FlipType::Horizontal
        } else {
            FlipType::Vertical
        };
        let result = self.inner.flip_image(flip);
        self.report_advisories();
        result.map_err(to_js)
    }

    /// Pixels of this color are left out of the preview and the stamp.
    pub fn set_overlay_color(&mut self, r: u8, g: u8, b: u8, a: u8) -> Result<(), JsValue> {
        let result = self.inner.set_overlay_color(Rgba([r, g, b, a]));
        self.report_advisories();
        result.map_err(to_js)
    }

    /// 0 = Fast, 1 = RotSprite
    pub fn set_rotation_algorithm(&mut self, algorithm: u8) -> Result<(), JsValue> {
        let result = self.inner.set_rotation_algorithm(algorithm_from_u8(algorithm));
        self.report_advisories();
        result.map_err(to_js)
    }

    /// The transformed pixels alone, positioned on the canvas.
    pub fn dragged_copy(&mut self) -> Result<JsImage, JsValue> {
        let result = self.inner.dragged_copy();
        self.report_advisories();
        let (image, origin) = result.map_err(to_js)?;
        Ok(JsImage::from_rgba(image, origin))
    }

    /// `[x, y, width, height]` of the preview area.
    pub fn image_bounds(&self) -> Vec<i32> {
        let r = self.inner.image_bounds();
        vec![r.x, r.y, r.w, r.h]
    }

    /// `[x, y, width, height]` of the current transform before rotation.
    pub fn transform_bounds(&self) -> Vec<i32> {
        let r = self.inner.transformation().bounds();
        vec![r.x, r.y, r.w, r.h]
    }

    /// Current rotation in radians, counter-clockwise.
    #[wasm_bindgen(getter)]
    pub fn angle(&self) -> f64 {
        self.inner.transformation().angle()
    }

    /// Handle code under the pointer: 0 none, 1 move, 2 pivot, 16+dir
    /// scale, 32+dir rotate.
    pub fn handle_at(&self, x: f64, y: f64) -> u8 {
        handle_to_u8(self.inner.handle_at(PointF::new(x, y)))
    }

    /// CSS cursor name for the pointer position.
    pub fn cursor_at(&self, x: f64, y: f64) -> String {
        css_cursor(self.inner.cursor_at(PointF::new(x, y)))
    }

    #[wasm_bindgen(getter)]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    #[wasm_bindgen(getter)]
    pub fn is_dragging(&self) -> bool {
        self.inner.is_dragging()
    }

    /// Lifecycle state name: Idle, Catching, Dragging, Dropped or Discarded.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        format!("{:?}", self.inner.state())
    }

    /// Canvas with the live preview composited on top.
    pub fn render(&self) -> Result<JsImage, JsValue> {
        self.composited().map_err(to_js)
    }

    /// Stamp the transformed pixels and commit.
    pub fn drop_image(&mut self) -> Result<(), JsValue> {
        let result = self.inner.drop_image();
        self.report_advisories();
        result.map_err(to_js)
    }

    /// Deselect and end without stamping; `commit` keeps the deselection
    /// as an undo step, otherwise everything is rolled back.
    pub fn discard(&mut self, commit: bool) -> Result<(), JsValue> {
        self.inner.discard_image(commit).map_err(to_js)
    }

    /// Undo the last committed session. Returns false when there is nothing
    /// to undo.
    pub fn undo(&self) -> Result<bool, JsValue> {
        let mut doc = lock_document(&self.document).map_err(to_js)?;
        Ok(doc.undo())
    }
}

impl JsTransformSession {
    fn document_for(canvas: &JsImage) -> Result<SharedDocument<MemoryDocument>, String> {
        let pixels = canvas.to_rgba()?;
        let (w, h) = pixels.dimensions();
        let doc = MemoryDocument::new(w, h).with_cel(Some(Cel::new(Point::default(), pixels)));
        Ok(shared(doc))
    }

    pub(crate) fn open(
        canvas: &JsImage,
        selection: Rect,
        mode: StartMode,
        settings: TransformSettings,
    ) -> Result<Self, String> {
        let document = Self::document_for(canvas)?;
        {
            let mut doc = lock_document(&document).map_err(|e| e.to_string())?;
            doc.select(SelectionMask::from_rect(selection));
        }
        let inner = TransformSession::from_selection(document.clone(), mode, settings)
            .map_err(|e| e.to_string())?;
        Ok(Self { document, inner })
    }

    pub(crate) fn open_paste(
        canvas: &JsImage,
        image: &JsImage,
        settings: TransformSettings,
    ) -> Result<Self, String> {
        let document = Self::document_for(canvas)?;
        let pixels = image.to_rgba()?;
        let inner = TransformSession::paste(document.clone(), pixels, image.origin(), settings)
            .map_err(|e| e.to_string())?;
        Ok(Self { document, inner })
    }

    pub(crate) fn composited(&self) -> Result<JsImage, TransformError> {
        let doc = lock_document(&self.document)?;
        let canvas = doc.canvas_bounds();
        let mut image =
            RgbaImage::from_pixel(canvas.w as u32, canvas.h as u32, doc.transparent_color());
        if let Some(cel) = doc.cel() {
            composite_normal(&mut image, canvas.origin(), &cel.image, cel.origin, 255);
        }
        if let Some(preview) = doc.extra_cel() {
            composite_normal(
                &mut image,
                canvas.origin(),
                &preview.image,
                preview.origin,
                preview.opacity,
            );
        }
        Ok(JsImage::from_rgba(image, canvas.origin()))
    }

    fn report_advisories(&mut self) {
        for advisory in self.inner.take_advisories() {
            web_sys::console::warn_1(&JsValue::from_str(&advisory.message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmove_core::HandleType;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn red_square_canvas() -> JsImage {
        let mut pixels = vec![0u8; 16 * 16 * 4];
        for y in 0..4 {
            for x in 0..4 {
                let i = (y * 16 + x) * 4;
                pixels[i..i + 4].copy_from_slice(&RED);
            }
        }
        JsImage::new(16, 16, pixels)
    }

    fn pixel(image: &JsImage, x: usize, y: usize) -> [u8; 4] {
        let i = (y * image.width() as usize + x) * 4;
        let pixels = image.pixels();
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    #[test]
    fn test_open_rejects_bad_canvas() {
        let canvas = JsImage::new(4, 4, vec![0u8; 3]);
        let result = JsTransformSession::open(
            &canvas,
            Rect::new(0, 0, 2, 2),
            StartMode::Copy,
            TransformSettings::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_open_rejects_empty_selection() {
        let result = JsTransformSession::open(
            &red_square_canvas(),
            Rect::new(0, 0, 0, 0),
            StartMode::Copy,
            TransformSettings::default(),
        );
        assert_eq!(result.err(), Some(TransformError::NoSelection.to_string()));
    }

    #[test]
    fn test_render_shows_moved_preview() {
        let mut session = JsTransformSession::open(
            &red_square_canvas(),
            Rect::new(0, 0, 4, 4),
            StartMode::Cut,
            TransformSettings::default(),
        )
        .unwrap();
        session.inner.catch_image(Point::new(1, 1), HandleType::Move).unwrap();
        session.inner.move_image(Point::new(9, 9), MoveModifiers::NONE).unwrap();

        let frame = session.composited().unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 16));
        assert_eq!(pixel(&frame, 8, 8), RED);
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_handle_and_cursor_queries() {
        let session = JsTransformSession::open(
            &red_square_canvas(),
            Rect::new(0, 0, 4, 4),
            StartMode::Copy,
            TransformSettings::default(),
        )
        .unwrap();
        assert_eq!(session.handle_at(15.0, 15.0), 0);
        assert_eq!(session.cursor_at(15.0, 15.0), "default");
        assert_eq!(session.handle_at(2.0, 2.0), 2);
        assert_eq!(session.cursor_at(2.0, 2.0), "grab");
        assert_eq!(session.transform_bounds(), vec![0, 0, 4, 4]);
        assert!(session.is_active());
        assert_eq!(session.state(), "Idle");
    }

    #[test]
    fn test_paste_places_image() {
        let canvas = JsImage::new(8, 8, vec![0u8; 8 * 8 * 4]);
        let image = JsImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba(RED)), Point::new(3, 5));
        let session =
            JsTransformSession::open_paste(&canvas, &image, TransformSettings::default()).unwrap();
        assert_eq!(session.transform_bounds(), vec![3, 5, 2, 2]);
        let frame = session.composited().unwrap();
        assert_eq!(pixel(&frame, 4, 6), RED);
    }
}
