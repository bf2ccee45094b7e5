use amem_rs_vector::{
    GetResult, InMemoryVectorStore, Metadata, QueryResult, VectorStore, VectorStoreError,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// A call observed by [`RecordingVectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Add {
        id: String,
        text: String,
        metadata: Metadata,
    },
    Delete {
        id: String,
    },
    Search {
        query: String,
        k: usize,
    },
    Get {
        offset: usize,
        limit: Option<usize>,
    },
    Update {
        ids: Vec<String>,
        documents: Vec<String>,
    },
}

/// In-memory store that logs every call it receives.
pub struct RecordingVectorStore {
    inner: InMemoryVectorStore,
    calls: Mutex<Vec<StoreCall>>,
}

impl RecordingVectorStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: InMemoryVectorStore::new(name),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Number of backend similarity searches so far.
    pub fn search_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, StoreCall::Search { .. }))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    fn collection_name(&self) -> &str {
        self.inner.collection_name()
    }

    async fn add_document(
        &self,
        text: &str,
        metadata: Metadata,
        id: &str,
    ) -> Result<(), VectorStoreError> {
        self.record(StoreCall::Add {
            id: id.to_string(),
            text: text.to_string(),
            metadata: metadata.clone(),
        });
        self.inner.add_document(text, metadata, id).await
    }

    async fn delete_document(&self, id: &str) -> Result<(), VectorStoreError> {
        self.record(StoreCall::Delete { id: id.to_string() });
        self.inner.delete_document(id).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<QueryResult, VectorStoreError> {
        self.record(StoreCall::Search {
            query: query.to_string(),
            k,
        });
        self.inner.search(query, k).await
    }

    async fn get(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GetResult, VectorStoreError> {
        self.record(StoreCall::Get { offset, limit });
        self.inner.get(offset, limit).await
    }

    async fn update_documents(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError> {
        self.record(StoreCall::Update {
            ids: ids.to_vec(),
            documents: documents.to_vec(),
        });
        self.inner.update_documents(ids, documents, metadatas).await
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        self.inner.count().await
    }
}
