//! Keeping the live mask in step with the transform.

use tracing::debug;

use super::{SelectionMask, UNSELECTED};
use crate::geometry::Rect;
use crate::resample::{ResampleOutcome, Resampler};
use crate::transform::Transformation;

/// Rebuild `current` by drawing `initial` through `transformation`.
///
/// The whole redraw runs frozen: `current` is resized to the canvas,
/// cleared, drawn with the same resampler as the pixel preview, and the
/// outline is recomputed once when it is unfrozen.
///
/// # Arguments
///
/// * `current` - Mask to rebuild
/// * `initial` - Mask at session start, in untransformed bounds
/// * `transformation` - Transform the pixel preview was drawn with
/// * `canvas` - Area `current` is resized to before drawing
/// * `resampler` - Same resampler as the pixel preview
///
/// # Returns
///
/// Outcome of the draw, including any RotSprite fallback advisory.
pub fn redraw_current_mask(
    current: &mut SelectionMask,
    initial: &SelectionMask,
    transformation: &Transformation,
    canvas: Rect,
    resampler: &Resampler,
) -> ResampleOutcome {
    current.freeze();
    current.reserve(canvas);
    let outcome = current.modify(|bitmap, origin| {
        resampler.draw(bitmap, origin, initial.bitmap(), transformation, UNSELECTED)
    });
    current.unfreeze();
    debug!(bounds = ?current.bounds(), "redrew current mask");
    outcome
}
