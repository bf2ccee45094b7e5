use amem_rs_vector::{GetResult, Metadata, QueryHit, QueryResult, VectorStore, VectorStoreError};
use async_trait::async_trait;

/// Store that answers searches and listings from scripted data and accepts
/// every mutation without keeping it.
#[derive(Debug, Clone, Default)]
pub struct StubVectorStore {
    name: String,
    hits: Vec<QueryHit>,
    listing: GetResult,
}

impl StubVectorStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Hits returned (truncated to `k`) by every search.
    pub fn with_hits(mut self, hits: Vec<QueryHit>) -> Self {
        self.hits = hits;
        self
    }

    /// Documents returned by listings.
    pub fn with_document(mut self, id: &str, document: &str, metadata: Metadata) -> Self {
        self.listing.ids.push(id.to_string());
        self.listing.documents.push(document.to_string());
        self.listing.metadatas.push(metadata);
        self
    }
}

/// Scripted similarity hit.
pub fn hit(id: &str, document: &str, metadata: Metadata, distance: f32) -> QueryHit {
    QueryHit {
        id: id.to_string(),
        document: document.to_string(),
        metadata,
        distance,
    }
}

#[async_trait]
impl VectorStore for StubVectorStore {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn add_document(
        &self,
        _text: &str,
        _metadata: Metadata,
        _id: &str,
    ) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn delete_document(&self, _id: &str) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn search(&self, _query: &str, k: usize) -> Result<QueryResult, VectorStoreError> {
        Ok(QueryResult::single(
            self.hits.iter().take(k).cloned().collect(),
        ))
    }

    async fn get(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GetResult, VectorStoreError> {
        let mut page = GetResult::default();
        for (id, document, metadata) in self
            .listing
            .entries()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
        {
            page.ids.push(id.to_string());
            page.documents.push(document.to_string());
            page.metadatas.push(metadata.cloned().unwrap_or_default());
        }
        Ok(page)
    }

    async fn update_documents(
        &self,
        _ids: &[String],
        _documents: &[String],
        _metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        Ok(self.listing.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{StubVectorStore, hit};
    use amem_rs_vector::VectorStore;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    #[tokio::test]
    async fn returns_scripted_hits_and_listing() {
        let store = StubVectorStore::new("stub")
            .with_hits(vec![
                hit("a", "alpha", Map::new(), 0.1),
                hit("b", "beta", Map::new(), 0.2),
            ])
            .with_document("a", "alpha", Map::new());
        let hits = store.search("anything", 1).await.expect("search").first_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(store.get_all().await.expect("get").ids, vec!["a".to_string()]);
    }
}
