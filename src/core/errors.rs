use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("upsert committed {committed} chunks, {} not committed: {reason}", uncommitted.len())]
    PartialUpsert {
        committed: usize,
        uncommitted: Vec<String>,
        reason: String,
    },
    #[error("corpus produced no indexable chunks")]
    EmptyCorpus,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    /// Transient failures worth another attempt under a retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::RateLimited(_) | RagError::Unavailable(_) | RagError::Timeout(_)
        )
    }
}
