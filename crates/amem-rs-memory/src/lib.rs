//! Memory notes for agents: typed records, the field codec that flattens them
//! for a vector store, and the memory system that keeps both in sync and
//! answers hybrid exact-filter + similarity queries.

pub mod codec;
pub mod error;
pub mod field;
pub mod record;
pub mod search;
pub mod system;
pub mod value;

/// Field codec registry and per-field rules.
pub use codec::{FieldKind, FieldRegistry, FieldRule};
/// Memory error type.
pub use error::MemoryError;
/// Fixed record schema.
pub use field::RecordField;
/// Memory record model.
pub use record::MemoryRecord;
/// Search options and merged results.
pub use search::{MatchOrigin, SearchHit, SearchOptions, SearchResult};
/// Memory system orchestrator.
pub use system::{MemorySystem, MemorySystemOptions, UpsertOutcome};
/// Attribute values.
pub use value::{Attributes, Extras, FieldValue, attributes};
