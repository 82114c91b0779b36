//! The document a transform session edits.
//!
//! The engine only needs a small surface of the host editor: the canvas
//! size, the active cel, the selection mask, undoable transactions, a slot
//! for the preview cel and a few notifications. [`Document`] is that
//! surface; [`MemoryDocument`] is an in-memory implementation.

mod memory;

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use crate::canvas::{composite_normal, Cel, PreviewBuffer};
use crate::error::DocumentError;
use crate::geometry::{Point, Rect};
use crate::mask::SelectionMask;
use crate::transform::Transformation;

pub use memory::MemoryDocument;

/// Undoable edits executed inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCommand {
    /// Replace the active cel's pixels.
    ReplaceCel(Cel),
    /// Replace the selection mask.
    SetMask(SelectionMask),
    /// Clear the selection mask.
    DeselectMask,
}

/// Document as seen by a transform session.
pub trait Document {
    /// Bounds of the sprite, usually `(0, 0, width, height)`.
    fn canvas_bounds(&self) -> Rect;

    /// Color treated as transparent by the layer.
    fn transparent_color(&self) -> Rgba<u8>;

    fn mask(&self) -> &SelectionMask;

    fn active_cel(&self) -> Option<&Cel>;

    /// Grid origin and cell size; a non-positive size means no grid.
    fn grid_bounds(&self) -> Rect;

    fn begin_transaction(&mut self, label: &str) -> Result<(), DocumentError>;

    /// Run `command` as one step of the open transaction.
    fn execute(&mut self, command: DocumentCommand) -> Result<(), DocumentError>;

    fn commit_transaction(&mut self) -> Result<(), DocumentError>;

    /// Revert every step of the open transaction and close it.
    fn abandon_transaction(&mut self) -> Result<(), DocumentError>;

    fn set_extra_cel(&mut self, preview: &PreviewBuffer);

    fn destroy_extra_cel(&mut self);

    /// Regenerate the outline shown on screen: from `mask` when given,
    /// otherwise from the document's own mask.
    fn generate_mask_boundaries(&mut self, mask: Option<&SelectionMask>);

    /// Publish the live transformation for hit-testing outside the session.
    fn set_transformation(&mut self, transformation: &Transformation);

    /// Ask the host to repaint `region`.
    fn notify_pixels_modified(&mut self, region: Rect);

    /// Blend `src` over `dst`. Hosts with blend modes override this.
    fn composite(
        &self,
        dst: &mut RgbaImage,
        dst_origin: Point,
        src: &RgbaImage,
        src_origin: Point,
        opacity: u8,
    ) {
        composite_normal(dst, dst_origin, src, src_origin, opacity);
    }
}

/// A document shared between the editor and a transform session.
pub type SharedDocument<D> = Arc<Mutex<D>>;

/// Wrap a document for sharing.
pub fn shared<D: Document>(document: D) -> SharedDocument<D> {
    Arc::new(Mutex::new(document))
}
