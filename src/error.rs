//! Error taxonomy for the retrieval-and-grounding pipeline.
//!
//! Every core operation returns [`Result<T>`]. Provider failures are
//! surfaced unchanged and never retried; "no relevant context" is not an
//! error and has no variant here.

use thiserror::Error;

/// Errors produced by chunking, indexing, retrieval, and generation.
#[derive(Error, Debug)]
pub enum CoachError {
    /// Bad chunking or retrieval parameters. The caller must fix its config.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A vector's length disagrees with the index's established dimensionality.
    #[error("embedding dimension mismatch: index has {expected} dims, got {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    /// The embedding service failed or returned an unusable response.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// The chat-completion service failed or returned an unusable response.
    #[error("generation provider error: {0}")]
    GenerationProvider(String),

    /// A tutor mode string outside the fixed set.
    #[error("unsupported mode: '{0}' (expected qa, quiz, explain_simple, or explain_analogy)")]
    UnsupportedMode(String),

    /// A model response that should have been JSON could not be parsed.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// True for failures of an external provider (embedding or generation).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoachError::EmbeddingProvider(_) | CoachError::GenerationProvider(_)
        )
    }
}
