//! Error types for transform sessions, resampling and documents.

use thiserror::Error;

/// Refusals and failures of a transform session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// Another writer holds the document.
    #[error("Document is locked by another session")]
    DocumentLocked,

    /// A previous holder of the document lock panicked.
    #[error("Document lock is poisoned")]
    DocumentPoisoned,

    /// The selection mask is empty, there is nothing to transform.
    #[error("No selection to transform")]
    NoSelection,

    /// The document already has an open transaction.
    #[error("A transaction is already open on the document")]
    TransactionOpen,

    /// The session was already dropped or discarded.
    #[error("Transform session has ended")]
    SessionEnded,

    /// Stamping or committing failed; the document was rolled back.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// The document rejected an operation outside of a commit.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Failures of a resampling pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResampleError {
    /// The supersampling buffers do not fit in the configured budget, or
    /// the allocator refused them.
    #[error("Not enough memory for RotSprite: {required} bytes required, limit is {limit}")]
    OutOfMemory { required: u64, limit: u64 },

    /// The source image has no pixels.
    #[error("Source image is empty")]
    EmptySource,
}

/// Failures reported by a [`Document`](crate::document::Document).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("No transaction is open")]
    NoTransaction,

    #[error("A transaction is already open")]
    TransactionAlreadyOpen,

    #[error("The active layer has no cel")]
    NoActiveCel,

    #[error("The active layer is locked")]
    LayerLocked,

    #[error("Operation rejected: {0}")]
    Rejected(String),
}
