use amem_rs_vector::{
    GetResult, InMemoryVectorStore, Metadata, QueryResult, VectorStore, VectorStoreError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Vector store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Add,
    Delete,
    Search,
    Get,
    Update,
    Count,
}

/// In-memory store whose operations fail on demand.
pub struct FailingVectorStore {
    inner: InMemoryVectorStore,
    failing: Mutex<HashSet<StoreOperation>>,
    missing_collection: bool,
}

impl FailingVectorStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: InMemoryVectorStore::new(name),
            failing: Mutex::new(HashSet::new()),
            missing_collection: false,
        }
    }

    /// Listings report the collection as missing instead of a generic failure.
    pub fn missing_collection(name: &str) -> Self {
        let store = Self::new(name);
        store.fail_on(StoreOperation::Get);
        Self {
            missing_collection: true,
            ..store
        }
    }

    pub fn fail_on(&self, operation: StoreOperation) {
        self.failing.lock().insert(operation);
    }

    pub fn recover(&self, operation: StoreOperation) {
        self.failing.lock().remove(&operation);
    }

    /// Underlying store, unaffected by failure switches.
    pub fn inner(&self) -> &InMemoryVectorStore {
        &self.inner
    }

    fn check(&self, operation: StoreOperation) -> Result<(), VectorStoreError> {
        if !self.failing.lock().contains(&operation) {
            return Ok(());
        }
        if operation == StoreOperation::Get && self.missing_collection {
            return Err(VectorStoreError::CollectionNotFound(
                self.inner.collection_name().to_string(),
            ));
        }
        Err(VectorStoreError::Unavailable(format!(
            "injected {operation:?} failure"
        )))
    }
}

#[async_trait]
impl VectorStore for FailingVectorStore {
    fn collection_name(&self) -> &str {
        self.inner.collection_name()
    }

    async fn add_document(
        &self,
        text: &str,
        metadata: Metadata,
        id: &str,
    ) -> Result<(), VectorStoreError> {
        self.check(StoreOperation::Add)?;
        self.inner.add_document(text, metadata, id).await
    }

    async fn delete_document(&self, id: &str) -> Result<(), VectorStoreError> {
        self.check(StoreOperation::Delete)?;
        self.inner.delete_document(id).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<QueryResult, VectorStoreError> {
        self.check(StoreOperation::Search)?;
        self.inner.search(query, k).await
    }

    async fn get(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GetResult, VectorStoreError> {
        self.check(StoreOperation::Get)?;
        self.inner.get(offset, limit).await
    }

    async fn update_documents(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError> {
        self.check(StoreOperation::Update)?;
        self.inner.update_documents(ids, documents, metadatas).await
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        self.check(StoreOperation::Count)?;
        self.inner.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::{FailingVectorStore, StoreOperation};
    use amem_rs_vector::{VectorStore, VectorStoreError};
    use serde_json::Map;

    #[tokio::test]
    async fn switches_toggle_failures() {
        let store = FailingVectorStore::new("flaky");
        store.fail_on(StoreOperation::Add);
        assert!(store.add_document("x", Map::new(), "x").await.is_err());
        store.recover(StoreOperation::Add);
        store
            .add_document("x", Map::new(), "x")
            .await
            .expect("add after recover");
        assert_eq!(store.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn missing_collection_reports_not_found() {
        let store = FailingVectorStore::missing_collection("gone");
        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }
}
