//! Drawing the transformed selection.
//!
//! Two algorithms are available:
//! - **Fast**: nearest-neighbor parallelogram mapping, exact for translations
//! - **RotSprite**: Scale2x-based pixel-art rotation, memory hungry
//!
//! [`Resampler::draw`] picks one, and when RotSprite cannot get its
//! supersampling buffers it redraws with Fast and reports an [`Advisory`]
//! instead of failing.

mod parallelogram;
mod rotsprite;

use image::{ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ResampleError;
use crate::geometry::Point;
use crate::settings::DEFAULT_ROTSPRITE_MEMORY_LIMIT;
use crate::transform::Transformation;

pub use parallelogram::draw_parallelogram;
pub use rotsprite::{draw_rotsprite, required_memory};

/// How rotated or scaled pixels are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationAlgorithm {
    /// Nearest-neighbor parallelogram mapping.
    #[default]
    Fast,
    /// Scale2x supersampling, better for pixel art.
    RotSprite,
}

/// Non-fatal message for the user, shown for `duration_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub message: String,
    pub duration_ms: u32,
}

impl Advisory {
    pub fn new(message: impl Into<String>, duration_ms: u32) -> Self {
        Self {
            message: message.into(),
            duration_ms,
        }
    }
}

/// Result of one draw: the algorithm that actually ran and an optional
/// advisory when the preferred one had to be abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleOutcome {
    pub algorithm: RotationAlgorithm,
    pub advisory: Option<Advisory>,
}

impl ResampleOutcome {
    fn ran(algorithm: RotationAlgorithm) -> Self {
        Self {
            algorithm,
            advisory: None,
        }
    }

    /// Whether the preferred algorithm was replaced by the fast one.
    pub fn fell_back(&self) -> bool {
        self.advisory.is_some()
    }
}

/// Draws a source image through a [`Transformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    algorithm: RotationAlgorithm,
    memory_limit: u64,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(RotationAlgorithm::Fast, DEFAULT_ROTSPRITE_MEMORY_LIMIT)
    }
}

impl Resampler {
    pub fn new(algorithm: RotationAlgorithm, memory_limit: u64) -> Self {
        Self {
            algorithm,
            memory_limit,
        }
    }

    pub fn algorithm(&self) -> RotationAlgorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: RotationAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Algorithm used for `src` under `transformation`.
    ///
    /// Fast is always used when the transform is a pure translation, so the
    /// output matches the source pixel for pixel.
    pub fn choose(&self, transformation: &Transformation, src_w: u32, src_h: u32) -> RotationAlgorithm {
        let bounds = transformation.bounds();
        let untouched = transformation.angle() == 0.0
            && bounds.w == src_w as i32
            && bounds.h == src_h as i32;
        if untouched {
            RotationAlgorithm::Fast
        } else {
            self.algorithm
        }
    }

    /// Draw `src` into `dst` through `transformation`.
    ///
    /// Picks the algorithm with [`Resampler::choose`]. When RotSprite runs
    /// out of its memory budget the fast path draws instead and the outcome
    /// carries an advisory.
    ///
    /// # Arguments
    ///
    /// * `dst` - Destination buffer
    /// * `dst_origin` - Image-space position of `dst`'s top-left pixel
    /// * `src` - Untransformed source, mapped onto the transformed corners
    /// * `transformation` - Bounds, angle and pivot to draw with
    /// * `mask_color` - Source pixels equal to this are not drawn
    ///
    /// # Returns
    ///
    /// The algorithm that actually ran and an optional advisory.
    pub fn draw<P>(
        &self,
        dst: &mut ImageBuffer<P, Vec<P::Subpixel>>,
        dst_origin: Point,
        src: &ImageBuffer<P, Vec<P::Subpixel>>,
        transformation: &Transformation,
        mask_color: P,
    ) -> ResampleOutcome
    where
        P: Pixel + PartialEq,
    {
        let (w, h) = src.dimensions();
        let corners = transformation.transform_box();

        match self.choose(transformation, w, h) {
            RotationAlgorithm::Fast => {
                draw_parallelogram(dst, dst_origin, src, &corners, mask_color);
                ResampleOutcome::ran(RotationAlgorithm::Fast)
            }
            RotationAlgorithm::RotSprite => {
                match draw_rotsprite(dst, dst_origin, src, &corners, mask_color, self.memory_limit) {
                    Ok(()) => ResampleOutcome::ran(RotationAlgorithm::RotSprite),
                    Err(ResampleError::EmptySource) => {
                        ResampleOutcome::ran(RotationAlgorithm::RotSprite)
                    }
                    Err(err @ ResampleError::OutOfMemory { .. }) => {
                        warn!(error = %err, "RotSprite failed, falling back to fast rotation");
                        draw_parallelogram(dst, dst_origin, src, &corners, mask_color);
                        ResampleOutcome {
                            algorithm: RotationAlgorithm::Fast,
                            advisory: Some(Advisory::new("Not enough memory for RotSprite", 1000)),
                        }
                    }
                }
            }
        }
    }
}
