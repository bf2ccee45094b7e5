//! Vector store interface and reference backends for amem.
//!
//! The memory system only ever talks to a [`VectorStore`]; the in-memory and
//! file-backed stores here embed documents with a deterministic hashing
//! embedder so the whole stack runs without a model server.

mod collection;
pub mod embedding;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;
pub mod types;

/// Embedding and distance primitives.
pub use embedding::{DistanceMetric, Embedder, HashingEmbedder};
/// Vector store error type.
pub use error::VectorStoreError;
/// File-backed persistent collection.
pub use file::{FileStoreOptions, FileVectorStore};
/// Ephemeral in-process collection.
pub use memory::InMemoryVectorStore;
/// Store interface and collection helpers.
pub use store::{VectorStore, copy_collection};
/// Batch-shaped results and flat metadata.
pub use types::{GetResult, Metadata, QueryHit, QueryResult};
