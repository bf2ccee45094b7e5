//! Configuration models and layered config loading for amem.
//!
//! Reads `amem.json5` layers (system, user, project, cwd, runtime), checks
//! each against the schema, merges them and produces an [`AmemConfig`].

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
