//! Hybrid search options and results.

use crate::record::MemoryRecord;
use crate::value::{Attributes, Extras};
use serde::Serialize;

pub const DEFAULT_SEARCH_K: usize = 5;

/// Parameters for [`MemorySystem::search`](crate::MemorySystem::search).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub k: usize,
    /// Similarity hits farther than this distance are dropped.
    pub similarity_threshold: Option<f32>,
    /// Extras that exact-filter matches must equal.
    pub filter: Option<Extras>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_SEARCH_K,
            similarity_threshold: None,
            filter: None,
        }
    }
}

impl SearchOptions {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_filter(mut self, filter: Extras) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Which phase produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    ExactFilter,
    Similarity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchHit {
    /// A record known to the memory system.
    Record(MemoryRecord),
    /// A store document with no local record, decoded from its metadata.
    Projection {
        id: String,
        content: String,
        metadata: Attributes,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub hit: SearchHit,
    pub origin: MatchOrigin,
    /// Store distance; `None` for exact-filter matches.
    pub distance: Option<f32>,
}

impl SearchResult {
    pub fn id(&self) -> &str {
        match &self.hit {
            SearchHit::Record(record) => record.id(),
            SearchHit::Projection { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match &self.hit {
            SearchHit::Record(record) => record.content(),
            SearchHit::Projection { content, .. } => content,
        }
    }

    pub fn record(&self) -> Option<&MemoryRecord> {
        match &self.hit {
            SearchHit::Record(record) => Some(record),
            SearchHit::Projection { .. } => None,
        }
    }
}
