//! Error taxonomy for the retrieval engine.
//!
//! Library operations return [`RagResult`]. Application layers (config
//! loading, corpus scanning, CLI drivers) use `anyhow` and wrap these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding backend failed, timed out, or returned malformed vectors.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector's length disagrees with the index dimensionality.
    #[error("dimension mismatch: expected {expected}-dimensional vector, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A chunk id was inserted twice.
    #[error("duplicate chunk id: {0}")]
    DuplicateId(String),

    /// No snapshot was successfully loaded for this process.
    #[error("retrieval index unavailable: {0}")]
    IndexUnavailable(String),

    /// The chat-completion backend failed or returned no text.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("invalid chunk '{id}': {reason}")]
    InvalidChunk { id: String, reason: String },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type RagResult<T> = std::result::Result<T, RagError>;
