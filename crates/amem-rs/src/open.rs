//! Build stores and memory systems from configuration.

use crate::AmemError;
use amem_rs_config::{AmemConfig, ConfigError, SearchConfig, StoreConfig, StoreDistance, StoreProvider};
use amem_rs_memory::{FieldRegistry, MemorySystem, MemorySystemOptions, SearchOptions};
use amem_rs_vector::{
    DistanceMetric, FileStoreOptions, FileVectorStore, HashingEmbedder, InMemoryVectorStore,
    VectorStore,
};
use log::info;
use std::sync::Arc;

fn metric(distance: StoreDistance) -> DistanceMetric {
    match distance {
        StoreDistance::Cosine => DistanceMetric::Cosine,
        StoreDistance::L2 => DistanceMetric::L2,
    }
}

/// Open the configured vector store. Failures here are fatal to startup.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>, AmemError> {
    let metric = metric(config.distance);
    let store: Arc<dyn VectorStore> = match config.provider {
        StoreProvider::Memory => Arc::new(InMemoryVectorStore::with_embedder(
            config.collection.clone(),
            Arc::new(HashingEmbedder::new(config.dimensions)),
            metric,
        )),
        StoreProvider::File => {
            let Some(path) = config.path.as_deref() else {
                return Err(ConfigError::Invalid(
                    "store.path is required for the file provider".to_string(),
                )
                .into());
            };
            Arc::new(FileVectorStore::open(
                path,
                &config.collection,
                FileStoreOptions {
                    extend: config.extend,
                    metric,
                    dimensions: config.dimensions,
                },
            )?)
        }
    };
    info!(
        "opened vector store (provider={:?}, collection={})",
        config.provider, config.collection
    );
    Ok(store)
}

/// Open the configured store and build a memory system over it.
pub async fn open_memory_system(config: &AmemConfig) -> Result<MemorySystem, AmemError> {
    let store = open_store(&config.store)?;
    let system = MemorySystem::new(
        store,
        Arc::new(FieldRegistry::for_memory_records()),
        MemorySystemOptions {
            load_existing: config.system.load_existing,
        },
    )
    .await;
    Ok(system)
}

/// Default search options from the `search` config block.
pub fn search_options(config: &SearchConfig) -> SearchOptions {
    SearchOptions {
        k: config.k,
        similarity_threshold: config.similarity_threshold,
        filter: None,
    }
}
