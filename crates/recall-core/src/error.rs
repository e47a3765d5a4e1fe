//! Error taxonomy for indexing and retrieval.
//!
//! Tokenization and vector math never fail; they degrade to empty or zero
//! results. The variants here are the failures a caller can observe.
//! An empty corpus is deliberately absent: fitting on zero documents yields
//! an empty, valid model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecallError {
    /// A transform or search was attempted before any vocabulary was fit.
    #[error("vocabulary model has not been fit")]
    ModelNotFit,

    /// Reading or writing documents, chunks, or the model failed.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// A persisted vector could not be decoded.
    #[error("malformed stored vector: {0}")]
    MalformedVector(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("top_k must be >= 1")]
    InvalidTopK,

    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The model was replaced while a search was using an older snapshot.
    #[error("vocabulary model changed during search (snapshot v{expected}, now v{actual})")]
    ModelChanged { expected: u64, actual: u64 },

    #[error("indexing cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RecallError>;
