//! Test helpers shared across amem crates.

pub mod failing;
pub mod metadata;
pub mod recording;
pub mod stub;

pub use failing::{FailingVectorStore, StoreOperation};
pub use metadata::flat_metadata;
pub use recording::{RecordingVectorStore, StoreCall};
pub use stub::{StubVectorStore, hit};
