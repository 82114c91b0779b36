//! User-configurable transform settings.

use serde::{Deserialize, Serialize};

use crate::resample::RotationAlgorithm;

/// Default supersampling budget for RotSprite: 256 MiB.
pub const DEFAULT_ROTSPRITE_MEMORY_LIMIT: u64 = 256 * 1024 * 1024;

/// Settings a session is created with.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Algorithm used for rotated or scaled previews.
    pub rotation_algorithm: RotationAlgorithm,
    /// Hit radius of handles, in image pixels.
    pub handle_tolerance: f64,
    /// Maximum bytes RotSprite may allocate for its supersampled copies.
    pub rotsprite_memory_limit: u64,
    /// Opacity of the preview cel (0-255).
    pub opacity: u8,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            rotation_algorithm: RotationAlgorithm::Fast,
            handle_tolerance: 4.0,
            rotsprite_memory_limit: DEFAULT_ROTSPRITE_MEMORY_LIMIT,
            opacity: 255,
        }
    }
}

impl TransformSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override of the rotation algorithm.
    pub fn with_rotation_algorithm(mut self, algorithm: RotationAlgorithm) -> Self {
        self.rotation_algorithm = algorithm;
        self
    }

    /// Builder-style override of the RotSprite memory budget.
    pub fn with_rotsprite_memory_limit(mut self, limit: u64) -> Self {
        self.rotsprite_memory_limit = limit;
        self
    }
}
