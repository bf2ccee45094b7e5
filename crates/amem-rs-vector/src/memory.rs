//! Ephemeral in-process vector store.

use crate::collection::{Collection, DocumentRow, rows_from_columns};
use crate::embedding::{DistanceMetric, Embedder, HashingEmbedder};
use crate::error::VectorStoreError;
use crate::store::{VectorStore, check_update_batch, copy_collection};
use crate::types::{GetResult, Metadata, QueryResult};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use std::sync::Arc;

/// Vector store that keeps a single collection in memory.
pub struct InMemoryVectorStore {
    name: String,
    collection: RwLock<Collection>,
}

impl InMemoryVectorStore {
    /// Create an empty collection using the default hashing embedder and cosine distance.
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self::with_embedder(
            collection_name,
            Arc::new(HashingEmbedder::default()),
            DistanceMetric::Cosine,
        )
    }

    /// Create an empty collection with an explicit embedder and metric.
    pub fn with_embedder(
        collection_name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        metric: DistanceMetric,
    ) -> Self {
        let name = collection_name.into();
        info!("initialized in-memory vector store (collection={})", name);
        Self {
            collection: RwLock::new(Collection::new(name.clone(), embedder, metric)),
            name,
        }
    }

    /// Build an isolated scratch copy of `src`, named `<src>__clone`.
    pub async fn copy_of(src: &dyn VectorStore, batch_size: usize) -> Result<Self, VectorStoreError> {
        let store = Self::new(format!("{}__clone", src.collection_name()));
        copy_collection(src, &store, batch_size).await?;
        Ok(store)
    }

    /// Remove every document.
    pub fn reset(&self) {
        let removed = self.collection.write().clear();
        debug!(
            "reset in-memory collection (collection={}, removed={})",
            self.name, removed
        );
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn add_document(
        &self,
        text: &str,
        metadata: Metadata,
        id: &str,
    ) -> Result<(), VectorStoreError> {
        self.collection.write().upsert(DocumentRow {
            id: id.to_string(),
            document: text.to_string(),
            metadata,
        });
        debug!("stored document (id={}, text_len={})", id, text.len());
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), VectorStoreError> {
        let removed = self.collection.write().remove(id);
        debug!("deleted document (id={}, removed={})", id, removed);
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<QueryResult, VectorStoreError> {
        let hits = self.collection.read().query(query, k);
        debug!("vector search (k={}, returned={})", k, hits.len());
        Ok(QueryResult::single(hits))
    }

    async fn get(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GetResult, VectorStoreError> {
        Ok(self.collection.read().list(offset, limit))
    }

    async fn update_documents(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError> {
        check_update_batch(ids, documents, metadatas)?;
        self.collection
            .write()
            .update(rows_from_columns(ids, documents, metadatas))
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        Ok(self.collection.read().len())
    }
}
