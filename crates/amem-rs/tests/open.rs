//! Opening configured stores and memory systems.

use amem_rs::config::{AmemConfig, SearchConfig, StoreConfig, StoreProvider};
use amem_rs::memory::{Attributes, SearchOptions, attributes};
use amem_rs::vector::{VectorStore, VectorStoreError};
use amem_rs::{AmemError, open_memory_system, open_store, search_options};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn file_config(path: &std::path::Path) -> AmemConfig {
    AmemConfig {
        store: StoreConfig {
            provider: StoreProvider::File,
            path: Some(path.display().to_string()),
            ..StoreConfig::default()
        },
        ..AmemConfig::default()
    }
}

#[tokio::test]
async fn file_backed_memories_persist_across_reopen() {
    let temp = tempdir().expect("tempdir");
    let config = file_config(temp.path());

    let id = {
        let system = open_memory_system(&config).await.expect("open");
        assert!(system.is_empty());
        let id = system
            .add("rust ownership notes", attributes([("topic", "rust")]))
            .await
            .expect("add");
        system
            .add("garden planting schedule", Attributes::new())
            .await
            .expect("add");
        id
    };

    let system = open_memory_system(&config).await.expect("reopen");
    assert_eq!(system.len(), 2);
    let record = system.peek(&id).expect("record");
    assert_eq!(record.content(), "rust ownership notes");
    assert_eq!(record.extras()["topic"], "rust");

    let results = system
        .search("ownership", &SearchOptions::default().with_k(1))
        .await
        .expect("search");
    assert_eq!(results[0].id(), id);
}

#[tokio::test]
async fn read_counts_persist_in_the_file_store() {
    let temp = tempdir().expect("tempdir");
    let config = file_config(temp.path());
    let id = {
        let system = open_memory_system(&config).await.expect("open");
        let id = system.add("counted note", Attributes::new()).await.expect("add");
        let record = system.read(&id).await.expect("read").expect("record");
        assert_eq!(record.retrieval_count(), 1);
        id
    };

    let system = open_memory_system(&config).await.expect("reopen");
    let record = system.read(&id).await.expect("read").expect("record");
    assert_eq!(record.retrieval_count(), 2);
}

#[tokio::test]
async fn load_existing_can_be_disabled() {
    let temp = tempdir().expect("tempdir");
    let mut config = file_config(temp.path());
    {
        let system = open_memory_system(&config).await.expect("open");
        system.add("kept on disk", Attributes::new()).await.expect("add");
    }
    config.system.load_existing = false;
    let system = open_memory_system(&config).await.expect("reopen");
    assert!(system.is_empty());
    assert_eq!(system.store().count().await.expect("count"), 1);
}

#[test]
fn existing_collection_without_extend_is_fatal() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(temp.path().join("memories.jsonl"), "").expect("seed");
    let mut config = file_config(temp.path());
    config.store.extend = false;
    let err = open_store(&config.store).err().expect("must refuse");
    assert!(matches!(
        err,
        AmemError::Store(VectorStoreError::CollectionExists(_))
    ));
}

#[test]
fn file_provider_requires_a_path() {
    let config = StoreConfig {
        provider: StoreProvider::File,
        path: None,
        ..StoreConfig::default()
    };
    let err = open_store(&config).err().expect("must refuse");
    assert!(matches!(err, AmemError::Config(_)));
}

#[tokio::test]
async fn memory_provider_uses_configured_collection() {
    let config = StoreConfig {
        provider: StoreProvider::Memory,
        collection: "scratch".to_string(),
        ..StoreConfig::default()
    };
    let store = open_store(&config).expect("open");
    assert_eq!(store.collection_name(), "scratch");
    assert_eq!(store.count().await.expect("count"), 0);
}

#[test]
fn search_config_maps_to_options() {
    let options = search_options(&SearchConfig {
        k: 3,
        similarity_threshold: Some(0.4),
    });
    assert_eq!(
        options,
        SearchOptions::default().with_k(3).with_threshold(0.4)
    );
}
