//! Vector store interface consumed by the memory system.

use crate::error::VectorStoreError;
use crate::types::{GetResult, Metadata, QueryResult};
use async_trait::async_trait;
use log::{debug, info};

#[async_trait]
/// Similarity-search backend holding document text plus flat metadata by id.
pub trait VectorStore: Send + Sync {
    /// Name of the backing collection.
    fn collection_name(&self) -> &str;

    /// Insert or overwrite a document by id.
    async fn add_document(
        &self,
        text: &str,
        metadata: Metadata,
        id: &str,
    ) -> Result<(), VectorStoreError>;

    /// Remove a document by id. Removing an unknown id is not an error.
    async fn delete_document(&self, id: &str) -> Result<(), VectorStoreError>;

    /// Return up to `k` nearest neighbours of `query`, as a one-element batch.
    async fn search(&self, query: &str, k: usize) -> Result<QueryResult, VectorStoreError>;

    /// List stored documents in insertion order, starting at `offset`.
    async fn get(&self, offset: usize, limit: Option<usize>)
    -> Result<GetResult, VectorStoreError>;

    /// Overwrite existing documents; `ids`, `documents` and `metadatas` are parallel.
    async fn update_documents(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize, VectorStoreError>;

    /// List every stored document.
    async fn get_all(&self) -> Result<GetResult, VectorStoreError> {
        self.get(0, None).await
    }
}

/// Copy every document of `src` into `dest`, `batch_size` documents at a time.
///
/// Returns the number of copied documents.
pub async fn copy_collection(
    src: &dyn VectorStore,
    dest: &dyn VectorStore,
    batch_size: usize,
) -> Result<usize, VectorStoreError> {
    let batch_size = batch_size.max(1);
    let total = src.count().await?;
    let mut copied = 0;
    let mut offset = 0;
    while offset < total {
        let batch = src.get(offset, Some(batch_size)).await?;
        if batch.is_empty() {
            break;
        }
        for (id, document, metadata) in batch.entries() {
            dest.add_document(document, metadata.cloned().unwrap_or_default(), id)
                .await?;
            copied += 1;
        }
        debug!(
            "copied collection batch (src={}, dest={}, offset={}, len={})",
            src.collection_name(),
            dest.collection_name(),
            offset,
            batch.len()
        );
        offset += batch.len();
    }
    info!(
        "collection copied (src={}, dest={}, documents={})",
        src.collection_name(),
        dest.collection_name(),
        copied
    );
    Ok(copied)
}

/// Validate that batch update columns line up.
pub(crate) fn check_update_batch(
    ids: &[String],
    documents: &[String],
    metadatas: &[Metadata],
) -> Result<(), VectorStoreError> {
    if ids.len() != documents.len() || ids.len() != metadatas.len() {
        return Err(VectorStoreError::InvalidRequest(format!(
            "update batch lengths differ (ids={}, documents={}, metadatas={})",
            ids.len(),
            documents.len(),
            metadatas.len()
        )));
    }
    Ok(())
}
