//! In-memory document with a transactional undo stack.

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::{Document, DocumentCommand};
use crate::canvas::{Cel, PreviewBuffer};
use crate::error::DocumentError;
use crate::geometry::{Point, Rect};
use crate::mask::{BoundarySegment, SelectionMask};
use crate::transform::Transformation;

/// State captured before a step, restored on undo or abandon.
#[derive(Debug, Clone)]
enum UndoStep {
    Cel(Option<Cel>),
    Mask(SelectionMask),
}

#[derive(Debug, Clone)]
struct Transaction {
    label: String,
    steps: Vec<UndoStep>,
}

impl Transaction {
    fn saved_mask(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, UndoStep::Mask(_)))
    }
}

/// Single-layer, single-frame document kept entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    canvas: Rect,
    transparent: Rgba<u8>,
    cel: Option<Cel>,
    mask: SelectionMask,
    grid: Rect,
    layer_locked: bool,
    transaction: Option<Transaction>,
    undo_stack: Vec<Transaction>,
    extra_cel: Option<PreviewBuffer>,
    boundary: Vec<BoundarySegment>,
    transformation: Option<Transformation>,
    modified: Vec<Rect>,
}

impl MemoryDocument {
    /// Blank `width` x `height` document with a transparent cel covering it.
    pub fn new(width: u32, height: u32) -> Self {
        let transparent = Rgba([0, 0, 0, 0]);
        Self {
            canvas: Rect::new(0, 0, width as i32, height as i32),
            transparent,
            cel: Some(Cel::new(
                Point::default(),
                RgbaImage::from_pixel(width, height, transparent),
            )),
            mask: SelectionMask::new(),
            grid: Rect::new(0, 0, 16, 16),
            layer_locked: false,
            transaction: None,
            undo_stack: Vec::new(),
            extra_cel: None,
            boundary: Vec::new(),
            transformation: None,
            modified: Vec::new(),
        }
    }

    /// Replace the active cel (`None` leaves the layer empty).
    pub fn with_cel(mut self, cel: Option<Cel>) -> Self {
        self.cel = cel;
        self
    }

    pub fn with_grid(mut self, grid: Rect) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_transparent_color(mut self, color: Rgba<u8>) -> Self {
        self.transparent = color;
        self
    }

    /// Select `mask` outside of any transaction and show its outline.
    pub fn select(&mut self, mask: SelectionMask) {
        self.boundary = mask.boundary().to_vec();
        self.mask = mask;
    }

    /// A locked layer refuses cel replacements.
    pub fn set_layer_locked(&mut self, locked: bool) {
        self.layer_locked = locked;
    }

    pub fn cel(&self) -> Option<&Cel> {
        self.cel.as_ref()
    }

    /// Pixel at `p`, or the transparent color where the cel does not reach.
    pub fn pixel_at(&self, p: Point) -> Rgba<u8> {
        self.cel
            .as_ref()
            .and_then(|cel| cel.pixel_at(p))
            .unwrap_or(self.transparent)
    }

    pub fn extra_cel(&self) -> Option<&PreviewBuffer> {
        self.extra_cel.as_ref()
    }

    /// Outline currently shown on screen.
    pub fn visible_boundary(&self) -> &[BoundarySegment] {
        &self.boundary
    }

    pub fn transformation(&self) -> Option<&Transformation> {
        self.transformation.as_ref()
    }

    /// Regions reported through [`Document::notify_pixels_modified`].
    pub fn modified_regions(&self) -> &[Rect] {
        &self.modified
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Label of the most recent committed transaction.
    pub fn last_undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|t| t.label.as_str())
    }

    /// Revert the last committed transaction. Returns `false` when there is
    /// nothing to undo or a transaction is still open.
    pub fn undo(&mut self) -> bool {
        if self.transaction.is_some() {
            return false;
        }
        match self.undo_stack.pop() {
            Some(transaction) => {
                debug!(label = %transaction.label, "undo");
                self.revert(transaction.steps);
                true
            }
            None => false,
        }
    }

    fn revert(&mut self, steps: Vec<UndoStep>) {
        for step in steps.into_iter().rev() {
            match step {
                UndoStep::Cel(cel) => self.cel = cel,
                UndoStep::Mask(mask) => {
                    self.boundary = mask.boundary().to_vec();
                    self.mask = mask;
                }
            }
        }
    }

    fn open_transaction(&mut self) -> Result<&mut Transaction, DocumentError> {
        self.transaction.as_mut().ok_or(DocumentError::NoTransaction)
    }
}

impl Document for MemoryDocument {
    fn canvas_bounds(&self) -> Rect {
        self.canvas
    }

    fn transparent_color(&self) -> Rgba<u8> {
        self.transparent
    }

    fn mask(&self) -> &SelectionMask {
        &self.mask
    }

    fn active_cel(&self) -> Option<&Cel> {
        self.cel.as_ref()
    }

    fn grid_bounds(&self) -> Rect {
        self.grid
    }

    fn begin_transaction(&mut self, label: &str) -> Result<(), DocumentError> {
        if self.transaction.is_some() {
            return Err(DocumentError::TransactionAlreadyOpen);
        }
        self.transaction = Some(Transaction {
            label: label.to_string(),
            steps: Vec::new(),
        });
        Ok(())
    }

    fn execute(&mut self, command: DocumentCommand) -> Result<(), DocumentError> {
        match command {
            DocumentCommand::ReplaceCel(cel) => {
                if self.layer_locked {
                    return Err(DocumentError::LayerLocked);
                }
                let previous = self.cel.clone();
                self.open_transaction()?.steps.push(UndoStep::Cel(previous));
                self.cel = Some(cel);
            }
            DocumentCommand::SetMask(mask) => {
                self.save_mask()?;
                self.mask = mask;
            }
            DocumentCommand::DeselectMask => {
                self.save_mask()?;
                self.mask = SelectionMask::new();
            }
        }
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), DocumentError> {
        let transaction = self.transaction.take().ok_or(DocumentError::NoTransaction)?;
        debug!(label = %transaction.label, steps = transaction.steps.len(), "commit transaction");
        if !transaction.steps.is_empty() {
            self.undo_stack.push(transaction);
        }
        Ok(())
    }

    fn abandon_transaction(&mut self) -> Result<(), DocumentError> {
        let transaction = self.transaction.take().ok_or(DocumentError::NoTransaction)?;
        debug!(label = %transaction.label, steps = transaction.steps.len(), "abandon transaction");
        self.revert(transaction.steps);
        Ok(())
    }

    fn set_extra_cel(&mut self, preview: &PreviewBuffer) {
        self.extra_cel = Some(preview.clone());
    }

    fn destroy_extra_cel(&mut self) {
        self.extra_cel = None;
    }

    fn generate_mask_boundaries(&mut self, mask: Option<&SelectionMask>) {
        let mask = mask.unwrap_or(&self.mask);
        self.boundary = mask.boundary().to_vec();
    }

    fn set_transformation(&mut self, transformation: &Transformation) {
        self.transformation = Some(transformation.clone());
    }

    fn notify_pixels_modified(&mut self, region: Rect) {
        self.modified.push(region);
    }
}

impl MemoryDocument {
    /// Save the mask once per transaction; later mask edits coalesce into
    /// the same undo step.
    fn save_mask(&mut self) -> Result<(), DocumentError> {
        let previous = self.mask.clone();
        let transaction = self.open_transaction()?;
        if !transaction.saved_mask() {
            transaction.steps.push(UndoStep::Mask(previous));
        }
        Ok(())
    }
}
