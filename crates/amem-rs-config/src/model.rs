//! Configuration schema for amem.

use serde::{Deserialize, Serialize};

/// Root config for an amem memory system.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AmemConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Vector store backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// Ephemeral in-process collection.
    Memory,
    /// JSONL collection under `store.path`.
    #[default]
    File,
}

/// Distance used to rank similarity hits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDistance {
    #[default]
    Cosine,
    L2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    /// Directory holding collection files; relative paths resolve against the cwd.
    #[serde(default = "default_store_path")]
    pub path: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Reopen an existing collection instead of refusing it.
    #[serde(default = "default_extend")]
    pub extend: bool,
    #[serde(default)]
    pub distance: StoreDistance,
    /// Embedding width of the hashing embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::default(),
            path: default_store_path(),
            collection: default_collection(),
            extend: default_extend(),
            distance: StoreDistance::default(),
            dimensions: default_dimensions(),
        }
    }
}

fn default_store_path() -> Option<String> {
    Some(".amem/store".to_string())
}

fn default_collection() -> String {
    "memories".to_string()
}

fn default_extend() -> bool {
    true
}

fn default_dimensions() -> usize {
    256
}

/// Memory system startup behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    /// Load documents already in the store on startup.
    #[serde(default = "default_load_existing")]
    pub load_existing: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            load_existing: default_load_existing(),
        }
    }
}

fn default_load_existing() -> bool {
    true
}

/// Defaults applied to searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_search_k")]
    pub k: usize,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k: default_search_k(),
            similarity_threshold: None,
        }
    }
}

/// Default number of search results.
fn default_search_k() -> usize {
    5
}
