//! Ending a session: stamping, discarding and abandonment.

use std::sync::Arc;

use tracing::{info, warn};

use super::{lock_document, SessionState, TransformSession};
use crate::canvas::ExpandedCanvas;
use crate::document::{Document, DocumentCommand};
use crate::error::{DocumentError, TransformError};

impl<D: Document> TransformSession<D> {
    /// Stamp the transformed pixels into the active cel and commit the
    /// whole session as one undo step.
    ///
    /// A drag still in progress is finished first, as a temporary drop.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the stamp is committed. If stamping or committing
    /// fails the transaction is abandoned, which rolls the document back to
    /// its state before the session, and [`TransformError::CommitFailed`]
    /// is returned. The session ends either way; later calls return
    /// [`TransformError::SessionEnded`].
    pub fn drop_image(&mut self) -> Result<(), TransformError> {
        self.ensure_active()?;
        if self.is_dragging() || self.adjust_pivot {
            self.drop_image_temporarily()?;
        }

        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;

        match self.stamp_and_commit(&mut *doc) {
            Ok(()) => {
                doc.destroy_extra_cel();
                self.release(SessionState::Dropped);
                info!("transform session dropped");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "commit failed, rolling back transform session");
                if let Err(abandon_err) = doc.abandon_transaction() {
                    warn!(error = %abandon_err, "could not abandon transaction");
                }
                doc.destroy_extra_cel();
                doc.generate_mask_boundaries(None);
                self.release(SessionState::Discarded);
                Err(TransformError::CommitFailed(err.to_string()))
            }
        }
    }

    fn stamp_and_commit(&self, doc: &mut D) -> Result<(), DocumentError> {
        let region = doc.canvas_bounds();
        let transparent = doc.transparent_color();
        let mut canvas = ExpandedCanvas::new(doc.active_cel(), region, transparent);
        let origin = canvas.origin();
        doc.composite(
            canvas.image_mut(),
            origin,
            &self.preview.image,
            self.preview.origin,
            self.preview.opacity,
        );
        doc.execute(DocumentCommand::ReplaceCel(canvas.commit()))?;
        doc.commit_transaction()
    }

    /// Deselect and end the session without stamping.
    ///
    /// # Arguments
    ///
    /// * `commit` - `true` commits the deselection (and any cut) as one undo
    ///   step that restores the selection before the session; `false`
    ///   abandons the whole transaction, restoring the mask and any cut
    ///   pixels with nothing added to the undo history
    ///
    /// # Returns
    ///
    /// [`TransformError::CommitFailed`] when the document refuses the
    /// deselection or the commit; the transaction is then abandoned.
    pub fn discard_image(&mut self, commit: bool) -> Result<(), TransformError> {
        self.ensure_active()?;
        let document = Arc::clone(&self.document);
        let mut doc = lock_document(&document)?;

        let result = doc.execute(DocumentCommand::DeselectMask).and_then(|()| {
            if commit {
                doc.commit_transaction()
            } else {
                doc.abandon_transaction()
            }
        });

        if let Err(err) = &result {
            warn!(error = %err, "discard failed, rolling back transform session");
            if doc.abandon_transaction().is_err() {
                warn!("no transaction left to abandon");
            }
        }

        doc.destroy_extra_cel();
        doc.generate_mask_boundaries(None);
        self.release(SessionState::Discarded);
        info!(commit, "transform session discarded");
        result.map_err(|err| TransformError::CommitFailed(err.to_string()))
    }
}

impl<D: Document> Drop for TransformSession<D> {
    fn drop(&mut self) {
        if !self.is_active() {
            return;
        }
        match self.document.try_lock() {
            Ok(mut doc) => {
                if let Err(err) = doc.abandon_transaction() {
                    warn!(error = %err, "could not abandon transaction of dropped session");
                }
                doc.destroy_extra_cel();
                doc.generate_mask_boundaries(None);
                info!("transform session abandoned");
            }
            Err(_) => warn!("document unavailable, transform session leaked its transaction"),
        }
    }
}
