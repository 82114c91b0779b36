//! Interactive transform sessions.
//!
//! A [`TransformSession`] owns a snapshot of the pixels being moved, the
//! selection mask they came from and a preview buffer. Pointer input drives
//! it through the methods in [`controller`](self); the session ends with
//! [`TransformSession::drop_image`] (stamp and commit) or
//! [`TransformSession::discard_image`].
//!
//! Every document access goes through `try_lock`, so a document held by
//! someone else is reported as [`TransformError::DocumentLocked`] instead of
//! blocking.

mod commit;
mod controller;

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, info};

use crate::canvas::{clear_mask, image_from_mask, FlipType, PreviewBuffer};
use crate::document::{Document, DocumentCommand, SharedDocument};
use crate::error::{DocumentError, TransformError};
use crate::geometry::{Point, PointF, Rect};
use crate::mask::{redraw_current_mask, SelectionMask};
use crate::resample::{Advisory, ResampleOutcome, Resampler, RotationAlgorithm};
use crate::settings::TransformSettings;
use crate::transform::{cursor_for, Cursor, HandleResolver, HandleType, Transformation};

pub use controller::{apply_handle, MoveModifiers, SessionState};

/// Label of the undo step a session produces.
pub const TRANSACTION_LABEL: &str = "Transformation";

/// What happens to the selected pixels when a session starts from the
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Clear the pixels under the mask; they only exist in the session.
    Cut,
    /// Leave the pixels in place and move a copy.
    Copy,
}

/// Try to lock the document without waiting.
pub fn lock_document<D>(document: &Mutex<D>) -> Result<MutexGuard<'_, D>, TransformError> {
    document.try_lock().map_err(|err| match err {
        TryLockError::WouldBlock => TransformError::DocumentLocked,
        TryLockError::Poisoned(_) => TransformError::DocumentPoisoned,
    })
}

pub struct TransformSession<D: Document> {
    document: SharedDocument<D>,
    settings: TransformSettings,
    resampler: Resampler,
    resolver: HandleResolver,
    state: SessionState,
    handle: HandleType,
    catch_pos: Point,
    initial: Transformation,
    current: Transformation,
    original: RgbaImage,
    initial_mask: SelectionMask,
    current_mask: SelectionMask,
    preview: PreviewBuffer,
    canvas: Rect,
    transparent: Rgba<u8>,
    overlay_color: Rgba<u8>,
    adjust_pivot: bool,
    advisories: Vec<Advisory>,
}

impl<D: Document> std::fmt::Debug for TransformSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSession")
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<D: Document> TransformSession<D> {
    /// Start moving `image`, whose top-left pixel is at `origin`.
    ///
    /// Opens the session's transaction and shows the preview. The document
    /// mask is snapshotted as the initial mask, so callers must either start
    /// from that mask's pixels or replace it with the image rectangle.
    pub(crate) fn start(
        document: SharedDocument<D>,
        image: RgbaImage,
        origin: Point,
        settings: TransformSettings,
    ) -> Result<Self, TransformError> {
        let shared = Arc::clone(&document);
        let mut doc = lock_document(&shared)?;

        doc.begin_transaction(TRANSACTION_LABEL)
            .map_err(|err| match err {
                DocumentError::TransactionAlreadyOpen => TransformError::TransactionOpen,
                other => TransformError::Document(other),
            })?;

        let canvas = doc.canvas_bounds();
        let transparent = doc.transparent_color();
        let bounds = Rect::from_origin_size(origin, image.width() as i32, image.height() as i32);
        let initial = Transformation::new(bounds);
        let mask = doc.mask().clone();

        let mut session = Self {
            document,
            resampler: Resampler::new(settings.rotation_algorithm, settings.rotsprite_memory_limit),
            resolver: HandleResolver::new(settings.handle_tolerance),
            preview: PreviewBuffer::new(canvas, settings.opacity),
            settings,
            state: SessionState::Idle,
            handle: HandleType::None,
            catch_pos: Point::default(),
            current: initial.clone(),
            initial,
            original: image,
            initial_mask: mask.clone(),
            current_mask: mask,
            canvas,
            transparent,
            overlay_color: transparent,
            adjust_pivot: false,
            advisories: Vec::new(),
        };

        session.redraw_extra_image();
        doc.set_extra_cel(&session.preview);
        info!(bounds = ?bounds, "transform session started");
        Ok(session)
    }

    /// Start from the document selection: the selected pixels of the
    /// active cel become the moved image.
    ///
    /// # Arguments
    ///
    /// * `document` - Shared document; locked only for the duration of each call
    /// * `mode` - `Cut` clears the selected pixels as the first undo step,
    ///   `Copy` leaves them in place
    /// * `settings` - Algorithm, handle tolerance, memory budget and opacity
    ///
    /// # Returns
    ///
    /// An idle session with its transaction open, or
    /// [`TransformError::NoSelection`], [`TransformError::DocumentLocked`] or
    /// [`TransformError::TransactionOpen`] without touching the document.
    ///
    /// # Example
    ///
    /// ```
    /// use pixmove_core::{shared, MemoryDocument, Rect, SelectionMask};
    /// use pixmove_core::{StartMode, TransformSession, TransformSettings};
    ///
    /// let mut doc = MemoryDocument::new(32, 32);
    /// doc.select(SelectionMask::from_rect(Rect::new(4, 4, 8, 8)));
    /// let document = shared(doc);
    ///
    /// let mut session =
    ///     TransformSession::from_selection(document, StartMode::Cut, TransformSettings::default())
    ///         .unwrap();
    /// session.translate(pixmove_core::Point::new(3, 0)).unwrap();
    /// session.drop_image().unwrap();
    /// ```
    pub fn from_selection(
        document: SharedDocument<D>,
        mode: StartMode,
        settings: TransformSettings,
    ) -> Result<Self, TransformError> {
        let (image, origin) = {
            let doc = lock_document(&document)?;
            let mask = doc.mask();
            if mask.is_empty() {
                return Err(TransformError::NoSelection);
            }
            let cel = doc.active_cel().ok_or(DocumentError::NoActiveCel)?;
            (image_from_mask(cel, mask, doc.transparent_color()), mask.origin())
        };

        let mut session = Self::start(document, image, origin, settings)?;
        match mode {
            StartMode::Cut => session.cut_mask()?,
            StartMode::Copy => session.copy_mask()?,
        }
        Ok(session)
    }

    /// Start moving an external image, selecting exactly its rectangle.
    pub fn paste(
        document: SharedDocument<D>,
        image: RgbaImage,
        origin: Point,
        settings: TransformSettings,
    ) -> Result<Self, TransformError> {
        let mut session = Self::start(document, image, origin, settings)?;
        session.mask_image()?;
        Ok(session)
    }

    /// Clear the selected pixels of the active cel, then hide the outline.
    fn cut_mask(&mut self) -> Result<(), TransformError> {
        {
            let document = Arc::clone(&self.document);
            let mut doc = lock_document(&document)?;
            let cleared = doc
                .active_cel()
                .map(|cel| clear_mask(cel, doc.mask(), self.transparent));
            if let Some(cel) = cleared {
                doc.execute(DocumentCommand::ReplaceCel(cel))?;
            }
        }
        self.copy_mask()
    }

    /// Hide the outline while dragging; the mask itself stays selected.
    fn copy_mask(&mut self) -> Result<(), TransformError> {
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        doc.generate_mask_boundaries(Some(&SelectionMask::new()));
        Ok(())
    }

    /// Select the full rectangle of the moved image.
    fn mask_image(&mut self) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        self.current_mask.replace(self.current.bounds());
        self.initial_mask.copy_from(&self.current_mask);
        self.update_document_mask(&mut *doc)
    }

    /// Mirror the moved pixels and their mask. Bounds, angle and pivot
    /// are unchanged.
    pub fn flip_image(&mut self, flip: FlipType) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;

        match flip {
            FlipType::Horizontal => imageops::flip_horizontal_in_place(&mut self.original),
            FlipType::Vertical => imageops::flip_vertical_in_place(&mut self.original),
        }
        self.initial_mask.flip(flip);

        self.redraw_extra_image();
        self.redraw_mask();
        doc.set_extra_cel(&self.preview);
        self.update_document_mask(&mut *doc)
    }

    /// Treat `color` as transparent in the moved pixels.
    pub fn set_overlay_color(&mut self, color: Rgba<u8>) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        self.overlay_color = color;
        self.redraw_extra_image();
        doc.set_extra_cel(&self.preview);
        Ok(())
    }

    /// Switch algorithms mid-session and redraw with the new one.
    pub fn set_rotation_algorithm(&mut self, algorithm: RotationAlgorithm) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;
        self.settings.rotation_algorithm = algorithm;
        self.resampler.set_algorithm(algorithm);
        self.redraw_extra_image();
        self.redraw_mask();
        doc.set_extra_cel(&self.preview);
        self.update_document_mask(&mut *doc)
    }

    /// The transformed pixels on their own, cropped to the corners'
    /// bounding box, with the image-space position of their top-left pixel.
    pub fn dragged_copy(&mut self) -> Result<(RgbaImage, Point), TransformError> {
        self.ensure_active()?;
        let area = self.current.transform_box().bounding_rect();
        let mut image =
            RgbaImage::from_pixel(area.w.max(0) as u32, area.h.max(0) as u32, self.transparent);
        let outcome = self.resampler.draw(
            &mut image,
            area.origin(),
            &self.original,
            &self.current,
            self.overlay_color,
        );
        self.record(outcome);
        Ok((image, area.origin()))
    }

    /// Image-space bounds of the preview buffer.
    pub fn image_bounds(&self) -> Rect {
        self.preview.bounds()
    }

    /// Handle under `point` for the current transform.
    pub fn handle_at(&self, point: PointF) -> HandleType {
        self.resolver.handle_at(&self.current, point)
    }

    /// Cursor to show over `point`, `None` away from the box.
    pub fn cursor_at(&self, point: PointF) -> Option<Cursor> {
        cursor_for(self.handle_at(point), self.current.angle())
    }

    /// False once the session was dropped or discarded.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, SessionState::Dropped | SessionState::Discarded)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SessionState::Catching | SessionState::Dragging)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn handle(&self) -> HandleType {
        self.handle
    }

    pub fn transformation(&self) -> &Transformation {
        &self.current
    }

    pub fn initial_transformation(&self) -> &Transformation {
        &self.initial
    }

    pub fn current_mask(&self) -> &SelectionMask {
        &self.current_mask
    }

    pub fn initial_mask(&self) -> &SelectionMask {
        &self.initial_mask
    }

    /// Snapshot of the moved pixels, before any transform.
    pub fn original_image(&self) -> &RgbaImage {
        &self.original
    }

    pub fn preview(&self) -> &PreviewBuffer {
        &self.preview
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Messages collected since the last call, oldest first.
    pub fn take_advisories(&mut self) -> Vec<Advisory> {
        std::mem::take(&mut self.advisories)
    }

    fn ensure_active(&self) -> Result<(), TransformError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(TransformError::SessionEnded)
        }
    }

    fn record(&mut self, outcome: ResampleOutcome) {
        if let Some(advisory) = outcome.advisory {
            if !self.advisories.contains(&advisory) {
                self.advisories.push(advisory);
            }
        }
    }

    /// Redraw the preview from the original snapshot.
    fn redraw_extra_image(&mut self) {
        self.preview.clear(self.transparent);
        let outcome = self.resampler.draw(
            &mut self.preview.image,
            self.preview.origin,
            &self.original,
            &self.current,
            self.overlay_color,
        );
        self.record(outcome);
    }

    /// Redraw the current mask from the initial one.
    fn redraw_mask(&mut self) {
        let outcome = redraw_current_mask(
            &mut self.current_mask,
            &self.initial_mask,
            &self.current,
            self.canvas,
            &self.resampler,
        );
        self.record(outcome);
    }

    /// Push the current mask to the document and show its outline.
    fn update_document_mask(&self, doc: &mut D) -> Result<(), TransformError> {
        doc.execute(DocumentCommand::SetMask(self.current_mask.clone()))?;
        doc.generate_mask_boundaries(Some(&self.current_mask));
        debug!(bounds = ?self.current_mask.bounds(), "document mask updated");
        Ok(())
    }

    /// Release the snapshot, masks and preview.
    fn release(&mut self, state: SessionState) {
        self.state = state;
        self.handle = HandleType::None;
        self.original = RgbaImage::new(0, 0);
        self.initial_mask = SelectionMask::new();
        self.current_mask = SelectionMask::new();
        self.preview = PreviewBuffer::released();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Cel;
    use crate::document::{shared, MemoryDocument};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    pub(super) fn painted_document(selection: Rect) -> MemoryDocument {
        let image = RgbaImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                RED
            } else {
                GREEN
            }
        });
        let mut doc = MemoryDocument::new(64, 64).with_cel(Some(Cel::new(Point::default(), image)));
        doc.select(SelectionMask::from_rect(selection));
        doc
    }

    #[test]
    fn test_from_selection_snapshots_pixels() {
        let document = shared(painted_document(Rect::new(4, 6, 10, 8)));
        let session =
            TransformSession::from_selection(document.clone(), StartMode::Copy, TransformSettings::default())
                .unwrap();
        assert_eq!(session.original_image().dimensions(), (10, 8));
        assert_eq!(session.transformation().bounds(), Rect::new(4, 6, 10, 8));
        assert_eq!(session.image_bounds(), Rect::new(0, 0, 64, 64));
        assert_eq!(session.state(), SessionState::Idle);

        let doc = document.lock().unwrap();
        assert!(doc.in_transaction());
        assert!(doc.visible_boundary().is_empty());
        let preview = doc.extra_cel().unwrap();
        assert_eq!(preview.image.get_pixel(4, 6), &RED);
        assert_eq!(preview.image.get_pixel(3, 6), &CLEAR);
        // Copy mode leaves the cel alone.
        assert_eq!(doc.pixel_at(Point::new(4, 6)), RED);
    }

    #[test]
    fn test_cut_clears_selected_pixels() {
        let document = shared(painted_document(Rect::new(0, 0, 4, 4)));
        let _session =
            TransformSession::from_selection(document.clone(), StartMode::Cut, TransformSettings::default())
                .unwrap();
        let doc = document.lock().unwrap();
        assert_eq!(doc.pixel_at(Point::new(1, 1)), CLEAR);
        assert_eq!(doc.pixel_at(Point::new(4, 4)), RED);
    }

    #[test]
    fn test_empty_selection_refused() {
        let document = shared(MemoryDocument::new(8, 8));
        let err = TransformSession::from_selection(document.clone(), StartMode::Cut, TransformSettings::default())
            .unwrap_err();
        assert_eq!(err, TransformError::NoSelection);
        assert!(!document.lock().unwrap().in_transaction());
    }

    #[test]
    fn test_no_active_cel_refused() {
        let mut doc = MemoryDocument::new(8, 8).with_cel(None);
        doc.select(SelectionMask::from_rect(Rect::new(0, 0, 2, 2)));
        let err = TransformSession::from_selection(shared(doc), StartMode::Copy, TransformSettings::default())
            .unwrap_err();
        assert_eq!(err, TransformError::Document(DocumentError::NoActiveCel));
    }

    #[test]
    fn test_locked_document_refuses_start() {
        let document = shared(painted_document(Rect::new(0, 0, 4, 4)));
        let guard = document.lock().unwrap();
        let err = TransformSession::from_selection(document.clone(), StartMode::Copy, TransformSettings::default())
            .unwrap_err();
        assert_eq!(err, TransformError::DocumentLocked);
        drop(guard);
        assert!(!document.lock().unwrap().in_transaction());
    }

    #[test]
    fn test_second_session_refused() {
        let document = shared(painted_document(Rect::new(0, 0, 4, 4)));
        let _first =
            TransformSession::from_selection(document.clone(), StartMode::Copy, TransformSettings::default())
                .unwrap();
        let err = TransformSession::from_selection(document.clone(), StartMode::Copy, TransformSettings::default())
            .unwrap_err();
        assert_eq!(err, TransformError::TransactionOpen);
    }

    #[test]
    fn test_paste_selects_image_rect() {
        let document = shared(MemoryDocument::new(32, 32));
        let image = RgbaImage::from_pixel(5, 3, RED);
        let session = TransformSession::paste(
            document.clone(),
            image,
            Point::new(7, 9),
            TransformSettings::default(),
        )
        .unwrap();
        assert_eq!(session.current_mask().bounds(), Rect::new(7, 9, 5, 3));
        assert_eq!(session.initial_mask(), session.current_mask());
        let doc = document.lock().unwrap();
        assert_eq!(doc.mask().bounds(), Rect::new(7, 9, 5, 3));
        assert_eq!(doc.visible_boundary().len(), 4);
    }

    #[test]
    fn test_paste_ignores_previous_selection() {
        let document = shared(painted_document(Rect::new(20, 20, 30, 2)));
        let image = RgbaImage::from_fn(4, 2, |x, _| if x == 0 { RED } else { GREEN });
        let mut session = TransformSession::paste(
            document.clone(),
            image,
            Point::new(1, 1),
            TransformSettings::default(),
        )
        .unwrap();
        assert_eq!(session.initial_mask().bounds(), Rect::new(1, 1, 4, 2));
        assert_eq!(session.initial_mask().bitmap().dimensions(), session.original_image().dimensions());

        session.flip_image(FlipType::Horizontal).unwrap();
        assert_eq!(session.original_image().get_pixel(3, 0), &RED);
        assert_eq!(session.current_mask().bounds(), Rect::new(1, 1, 4, 2));
        let doc = document.lock().unwrap();
        assert_eq!(doc.extra_cel().unwrap().image.get_pixel(4, 1), &RED);
    }

    #[test]
    fn test_flip_twice_restores() {
        let document = shared(painted_document(Rect::new(2, 2, 8, 5)));
        let mut session =
            TransformSession::from_selection(document, StartMode::Copy, TransformSettings::default()).unwrap();
        let image = session.original_image().clone();
        let mask = session.initial_mask().clone();
        let bounds = session.transformation().clone();

        session.flip_image(FlipType::Horizontal).unwrap();
        assert_ne!(session.original_image(), &image);
        assert_eq!(session.transformation(), &bounds);
        session.flip_image(FlipType::Horizontal).unwrap();

        assert_eq!(session.original_image(), &image);
        assert_eq!(session.initial_mask(), &mask);
    }

    #[test]
    fn test_overlay_color_hides_pixels() {
        let document = shared(painted_document(Rect::new(0, 0, 4, 4)));
        let mut session =
            TransformSession::from_selection(document.clone(), StartMode::Copy, TransformSettings::default())
                .unwrap();
        session.set_overlay_color(RED).unwrap();
        let doc = document.lock().unwrap();
        let preview = doc.extra_cel().unwrap();
        assert_eq!(preview.image.get_pixel(0, 0), &CLEAR);
        assert_eq!(preview.image.get_pixel(1, 0), &GREEN);
    }

    #[test]
    fn test_dragged_copy_origin() {
        let document = shared(painted_document(Rect::new(3, 5, 4, 2)));
        let mut session =
            TransformSession::from_selection(document, StartMode::Copy, TransformSettings::default()).unwrap();
        let (image, origin) = session.dragged_copy().unwrap();
        assert_eq!(origin, Point::new(3, 5));
        assert_eq!(&image, session.original_image());
    }

    #[test]
    fn test_cursor_at_handles() {
        let document = shared(painted_document(Rect::new(0, 0, 20, 20)));
        let session =
            TransformSession::from_selection(document, StartMode::Copy, TransformSettings::default()).unwrap();
        assert_eq!(session.handle_at(PointF::new(10.0, 10.0)), HandleType::Pivot);
        assert_eq!(session.cursor_at(PointF::new(5.0, 14.0)), Some(Cursor::Move));
        assert_eq!(session.cursor_at(PointF::new(50.0, 50.0)), None);
    }
}
