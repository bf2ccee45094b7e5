//! Error types for vector store backends.

/// Errors returned by vector store implementations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    /// The backing collection has not been created yet.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    /// A persistent collection already exists and extending it was not requested.
    #[error("collection already exists: {0} (open with extend to reuse it)")]
    CollectionExists(String),
    /// The backend could not serve the request.
    #[error("vector store unavailable: {0}")]
    Unavailable(String),
    /// The backend did not answer in time.
    #[error("vector store timed out: {0}")]
    Timeout(String),
    /// Request arguments were inconsistent (e.g. mismatched batch lengths).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
