//! In-process document collection shared by the reference stores.

use crate::embedding::{DistanceMetric, Embedder};
use crate::error::VectorStoreError;
use crate::types::{GetResult, Metadata, QueryHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted form of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct DocumentRow {
    pub(crate) id: String,
    pub(crate) document: String,
    #[serde(default)]
    pub(crate) metadata: Metadata,
}

#[derive(Clone)]
struct StoredDocument {
    row: DocumentRow,
    embedding: Vec<f32>,
}

/// Insertion-ordered documents plus their embeddings.
#[derive(Clone)]
pub(crate) struct Collection {
    name: String,
    embedder: Arc<dyn Embedder>,
    metric: DistanceMetric,
    documents: Vec<StoredDocument>,
}

impl Collection {
    pub(crate) fn new(
        name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            name: name.into(),
            embedder,
            metric,
            documents: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|doc| doc.row.id == id)
    }

    /// Insert a row, overwriting any row with the same id in place.
    pub(crate) fn upsert(&mut self, row: DocumentRow) {
        let embedding = self.embedder.embed(&row.document);
        let stored = StoredDocument { row, embedding };
        match self.position(&stored.row.id) {
            Some(pos) => self.documents[pos] = stored,
            None => self.documents.push(stored),
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.documents.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Overwrite existing rows. Fails without changes if any id is unknown.
    pub(crate) fn update(&mut self, rows: Vec<DocumentRow>) -> Result<(), VectorStoreError> {
        if let Some(missing) = rows.iter().find(|row| self.position(&row.id).is_none()) {
            return Err(VectorStoreError::InvalidRequest(format!(
                "cannot update unknown document {} in collection {}",
                missing.id, self.name
            )));
        }
        for row in rows {
            self.upsert(row);
        }
        Ok(())
    }

    /// Nearest neighbours by ascending distance; ties keep insertion order.
    pub(crate) fn query(&self, text: &str, k: usize) -> Vec<QueryHit> {
        let query = self.embedder.embed(text);
        let mut scored: Vec<(f32, &StoredDocument)> = self
            .documents
            .iter()
            .map(|doc| (self.metric.distance(&query, &doc.embedding), doc))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(distance, doc)| QueryHit {
                id: doc.row.id.clone(),
                document: doc.row.document.clone(),
                metadata: doc.row.metadata.clone(),
                distance,
            })
            .collect()
    }

    pub(crate) fn list(&self, offset: usize, limit: Option<usize>) -> GetResult {
        let limit = limit.unwrap_or(usize::MAX);
        let mut result = GetResult::default();
        for doc in self.documents.iter().skip(offset).take(limit) {
            result.ids.push(doc.row.id.clone());
            result.documents.push(doc.row.document.clone());
            result.metadatas.push(doc.row.metadata.clone());
        }
        result
    }

    /// Drop every document, returning how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.documents.len();
        self.documents.clear();
        removed
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &DocumentRow> {
        self.documents.iter().map(|doc| &doc.row)
    }
}

/// Zip update columns into rows.
pub(crate) fn rows_from_columns(
    ids: &[String],
    documents: &[String],
    metadatas: &[Metadata],
) -> Vec<DocumentRow> {
    ids.iter()
        .zip(documents)
        .zip(metadatas)
        .map(|((id, document), metadata)| DocumentRow {
            id: id.clone(),
            document: document.clone(),
            metadata: metadata.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Collection, DocumentRow};
    use crate::embedding::{DistanceMetric, HashingEmbedder};
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use std::sync::Arc;

    fn row(id: &str, document: &str) -> DocumentRow {
        DocumentRow {
            id: id.to_string(),
            document: document.to_string(),
            metadata: Map::new(),
        }
    }

    fn collection() -> Collection {
        Collection::new(
            "test",
            Arc::new(HashingEmbedder::default()),
            DistanceMetric::Cosine,
        )
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut collection = collection();
        collection.upsert(row("a", "first"));
        collection.upsert(row("b", "second"));
        collection.upsert(row("a", "replaced"));
        let listing = collection.list(0, None);
        assert_eq!(listing.ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(listing.documents[0], "replaced");
    }

    #[test]
    fn update_rejects_unknown_ids_atomically() {
        let mut collection = collection();
        collection.upsert(row("a", "first"));
        let err = collection
            .update(vec![row("a", "changed"), row("zzz", "missing")])
            .unwrap_err();
        assert!(format!("{err}").contains("zzz"));
        assert_eq!(collection.list(0, None).documents, vec!["first".to_string()]);
    }

    #[test]
    fn query_orders_by_distance_and_limits() {
        let mut collection = collection();
        collection.upsert(row("py", "python"));
        collection.upsert(row("ml", "ml"));
        collection.upsert(row("db", "db"));
        let hits = collection.query("ml", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "ml");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn list_honours_offset_and_limit() {
        let mut collection = collection();
        for idx in 0..5 {
            collection.upsert(row(&format!("doc_{idx}"), "text"));
        }
        let page = collection.list(1, Some(2));
        assert_eq!(page.ids, vec!["doc_1".to_string(), "doc_2".to_string()]);
        assert!(collection.remove("doc_0"));
        assert!(!collection.remove("doc_0"));
        assert_eq!(collection.len(), 4);
    }
}
