use thiserror::Error;

use crate::types::ChunkId;

#[derive(Debug, Error)]
pub enum Error {
    /// Text was empty after trimming.
    #[error("input text is empty")]
    EmptyInput,

    /// The semantic model could not be used and fallback is disabled.
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("chunk not found: {0}")]
    NotFound(ChunkId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Operation(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
