//! Error type for the facade.

use amem_rs_config::ConfigError;
use amem_rs_memory::MemoryError;
use amem_rs_vector::VectorStoreError;
use thiserror::Error;

/// Errors returned while opening or driving a configured memory system.
#[derive(Debug, Error)]
pub enum AmemError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Opening the configured store failed.
    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
