//! Layered configuration loader.
//!
//! Discovers config layers (system/user/project/cwd/runtime), checks each
//! against the schema, merges them and produces the final `AmemConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{AmemConfig, ConfigError, StoreProvider};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config filename in every layer.
const DEFAULT_CONFIG_FILE: &str = "amem.json5";
/// Config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".amem";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/amem/amem.json5";

/// Effective config plus the layers it was merged from.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: AmemConfig,
    /// Every layer that contributed, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Origin of a single config layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    System,
    User,
    /// `amem.json5` at the project root.
    Project,
    /// `amem.json5` in the working directory.
    Cwd,
    /// Explicit override paths (highest precedence).
    Runtime,
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: Option<PathBuf>,
}

/// Schema validation mode for layered configs.
#[derive(Debug, Clone, Copy)]
enum SchemaMode {
    /// Partial validation for individual layers.
    Partial,
    /// Full validation for the effective config.
    Full,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the project root and the cwd layer.
    pub cwd: PathBuf,
    /// System config path (defaults to `/etc/amem/amem.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// User config path (defaults to `~/.amem/amem.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Override config paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Options that only read the given runtime paths, skipping system and user layers.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            system_config_path: None,
            user_config_path: None,
            ..Self::new(cwd)
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl AmemConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the layer stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load the layer stack from explicit locations.
    ///
    /// Precedence (low -> high): system, user, project, cwd, runtime.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut loaded = Vec::new();
        let mut seen_paths = HashSet::new();

        for (source, path) in [
            (
                ConfigLayerSource::System,
                options.system_config_path.as_deref(),
            ),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
        ] {
            if let Some(layer) = layer_io::load_optional_layer(source, path)? {
                seen_paths.insert(utils::unique_path(&layer.path));
                loaded.push(layer);
            }
        }

        let mut local = Vec::new();
        match utils::find_project_root(&cwd, &options.project_root_markers) {
            Some(root) => {
                debug!("resolved project root: {}", root.display());
                local.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
            }
            None => debug!("project root not found; skipping project layer"),
        }
        local.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        for (source, path) in local {
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, Some(&path))? {
                loaded.push(layer);
            }
        }

        for runtime_path in &options.runtime_paths {
            loaded.push(layer_io::load_required_layer(
                ConfigLayerSource::Runtime,
                runtime_path,
            )?);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        let mut layers = Vec::with_capacity(loaded.len());
        for layer in loaded {
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(ConfigLayer {
                source: layer.source,
                path: Some(layer.path),
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "store.dimensions must be greater than zero".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.collection must not be empty".to_string(),
            ));
        }
        if self.store.provider == StoreProvider::File
            && self
                .store
                .path
                .as_deref()
                .is_none_or(|path| path.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "store.path is required for the file provider".to_string(),
            ));
        }
        if self.search.k == 0 {
            return Err(ConfigError::Invalid(
                "search.k must be greater than zero".to_string(),
            ));
        }
        if let Some(threshold) = self.search.similarity_threshold {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "search.similarity_threshold must be non-negative, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

/// A layer read from disk.
#[derive(Debug, Clone)]
struct LoadedLayer {
    source: ConfigLayerSource,
    path: PathBuf,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<AmemConfig, ConfigError> {
    schema::validate_layer_schema(&value, SchemaMode::Full, label)?;
    let config: AmemConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
