//! Error types for memory operations.

use amem_rs_vector::VectorStoreError;

/// Errors returned by the codec, records and the memory system.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// A value does not have the shape its field requires.
    #[error("invalid value for {field}: {message}")]
    Validation { field: String, message: String },
    /// A stored value could not be converted to its field type.
    #[error("type error for {field}: {message}")]
    Type { field: String, message: String },
    /// No memory with this id.
    #[error("memory not found: {0}")]
    NotFound(String),
    /// A memory with this id already exists.
    #[error("memory already exists: {0}")]
    DuplicateId(String),
    /// The vector store failed outside of a mutation.
    #[error("vector store error: {0}")]
    Backend(#[from] VectorStoreError),
    /// The local record changed but pushing it to the vector store failed.
    #[error("vector store out of sync for memory {id}: {source}")]
    Desynchronized {
        id: String,
        #[source]
        source: VectorStoreError,
    },
}

impl MemoryError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
