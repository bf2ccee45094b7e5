//! Public surface for amem.
//!
//! Re-exports the building blocks and wires a configured vector store into a
//! [`MemorySystem`](memory::MemorySystem).

mod error;
mod open;

/// Re-export for convenience.
pub use amem_rs_config as config;
/// Re-export for convenience.
pub use amem_rs_memory as memory;
/// Re-export for convenience.
pub use amem_rs_vector as vector;

pub use error::AmemError;
pub use open::{open_memory_system, open_store, search_options};

/// Initialize `env_logger` with millisecond timestamps, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
