//! Wire shapes exchanged with vector stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat metadata attached to a stored document.
///
/// Values are expected to be strings or JSON scalars; structured values are
/// flattened by the caller before they reach a store.
pub type Metadata = Map<String, Value>;

/// Batch-shaped similarity query result.
///
/// Each outer element corresponds to one submitted query. Inner vectors are
/// parallel and ordered by ascending distance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Metadata>>,
    pub distances: Vec<Vec<f32>>,
}

/// A single nearest-neighbour hit taken from a [`QueryResult`] batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
}

impl QueryResult {
    /// Wrap a single query's hits in the batch shape.
    pub fn single(hits: Vec<QueryHit>) -> Self {
        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for hit in hits {
            ids.push(hit.id);
            documents.push(hit.document);
            metadatas.push(hit.metadata);
            distances.push(hit.distance);
        }
        Self {
            ids: vec![ids],
            documents: vec![documents],
            metadatas: vec![metadatas],
            distances: vec![distances],
        }
    }

    /// Hits for the batch at `index`, empty when the batch is absent.
    ///
    /// Missing documents, metadata or distances (backends may omit them) are
    /// filled with an empty string, empty map and `f32::INFINITY`.
    pub fn hits(&self, index: usize) -> Vec<QueryHit> {
        let Some(ids) = self.ids.get(index) else {
            return Vec::new();
        };
        let documents = self.documents.get(index);
        let metadatas = self.metadatas.get(index);
        let distances = self.distances.get(index);
        ids.iter()
            .enumerate()
            .map(|(pos, id)| QueryHit {
                id: id.clone(),
                document: documents
                    .and_then(|docs| docs.get(pos))
                    .cloned()
                    .unwrap_or_default(),
                metadata: metadatas
                    .and_then(|metas| metas.get(pos))
                    .cloned()
                    .unwrap_or_default(),
                distance: distances
                    .and_then(|dists| dists.get(pos))
                    .copied()
                    .unwrap_or(f32::INFINITY),
            })
            .collect()
    }

    /// Hits for the first (and usually only) submitted query.
    pub fn first_hits(&self) -> Vec<QueryHit> {
        self.hits(0)
    }
}

/// Flat bulk listing of stored documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

impl GetResult {
    /// Number of listed documents.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate `(id, document, metadata)` triples.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, Option<&Metadata>)> {
        self.ids.iter().enumerate().map(|(pos, id)| {
            let document = self.documents.get(pos).map_or("", String::as_str);
            (id.as_str(), document, self.metadatas.get(pos))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryHit, QueryResult};
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    #[test]
    fn hits_fill_missing_columns() {
        let result = QueryResult {
            ids: vec![vec!["a".to_string(), "b".to_string()]],
            documents: vec![vec!["doc a".to_string()]],
            metadatas: Vec::new(),
            distances: vec![vec![0.25]],
        };
        let hits = result.first_hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document, "doc a");
        assert_eq!(hits[1].document, "");
        assert_eq!(hits[1].distance, f32::INFINITY);
        assert!(hits[1].metadata.is_empty());
    }

    #[test]
    fn single_builds_one_batch() {
        let result = QueryResult::single(vec![QueryHit {
            id: "x".to_string(),
            document: "text".to_string(),
            metadata: Map::new(),
            distance: 0.5,
        }]);
        assert_eq!(result.ids, vec![vec!["x".to_string()]]);
        assert!(result.hits(1).is_empty());
    }
}
