//! Pixmove Core - Selection transformation engine
//!
//! This crate lets an editor grab the selected pixels of a layer and move,
//! scale, rotate or flip them with live preview, then stamp the result back
//! as a single undoable step.
//!
//! The entry point is [`TransformSession`], created over a [`Document`]
//! (any host editor implementing the trait, or [`MemoryDocument`]).

pub mod canvas;
pub mod document;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod resample;
pub mod session;
pub mod settings;
pub mod transform;

pub use canvas::{Cel, FlipType, PreviewBuffer};
pub use document::{shared, Document, DocumentCommand, MemoryDocument, SharedDocument};
pub use error::{DocumentError, ResampleError, TransformError};
pub use geometry::{Point, PointF, Rect};
pub use mask::SelectionMask;
pub use resample::{Advisory, RotationAlgorithm};
pub use session::{lock_document, MoveModifiers, SessionState, StartMode, TransformSession};
pub use settings::TransformSettings;
pub use transform::{Corners, Cursor, Direction, HandleType, Transformation};
