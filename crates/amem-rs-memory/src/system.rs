//! Memory system: authoritative record map kept in sync with a vector store.

use crate::codec::FieldRegistry;
use crate::error::MemoryError;
use crate::field::RecordField;
use crate::record::{MemoryRecord, UPSERT_REASON};
use crate::search::{MatchOrigin, SearchHit, SearchOptions, SearchResult};
use crate::value::{Attributes, Extras, FieldValue};
use amem_rs_vector::{VectorStore, VectorStoreError};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Options for [`MemorySystem::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySystemOptions {
    /// Populate the record map from the store on startup.
    pub load_existing: bool,
}

impl Default for MemorySystemOptions {
    fn default() -> Self {
        Self {
            load_existing: true,
        }
    }
}

/// Result of [`MemorySystem::upsert_by_exact_attributes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted(String),
    Updated(String),
}

impl UpsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Updated(id) => id,
        }
    }
}

/// Insertion-ordered id to record map.
#[derive(Default)]
struct RecordMap {
    by_id: HashMap<String, MemoryRecord>,
    order: Vec<String>,
}

impl RecordMap {
    fn insert(&mut self, record: MemoryRecord) {
        let id = record.id().to_string();
        if self.by_id.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &str) -> Option<MemoryRecord> {
        let removed = self.by_id.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    fn get(&self, id: &str) -> Option<&MemoryRecord> {
        self.by_id.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut MemoryRecord> {
        self.by_id.get_mut(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

/// Owns the canonical memory records and mirrors every mutation into a
/// [`VectorStore`].
///
/// Mutations and counted reads are serialized by an async write gate held
/// across the single backend call; peeks and searches never take it.
pub struct MemorySystem {
    records: RwLock<RecordMap>,
    store: Arc<dyn VectorStore>,
    registry: Arc<FieldRegistry>,
    write_gate: Mutex<()>,
}

impl MemorySystem {
    /// Create a system over `store`, loading its documents when requested.
    ///
    /// Load problems never fail construction: a missing collection or an
    /// unreadable store yields an empty system, and corrupt documents are skipped.
    pub async fn new(
        store: Arc<dyn VectorStore>,
        registry: Arc<FieldRegistry>,
        options: MemorySystemOptions,
    ) -> Self {
        let mut records = RecordMap::default();
        if options.load_existing {
            load_records(store.as_ref(), &registry, &mut records).await;
        }
        info!(
            "initialized memory system (collection={}, records={})",
            store.collection_name(),
            records.len()
        );
        Self {
            records: RwLock::new(records),
            store,
            registry,
            write_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.records.read().order.clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains(id)
    }

    /// Snapshots of every record in insertion order.
    pub fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Create a memory and push it to the store. Returns its id.
    pub async fn add(
        &self,
        content: impl Into<String>,
        attrs: Attributes,
    ) -> Result<String, MemoryError> {
        let _gate = self.write_gate.lock().await;
        self.add_locked(content.into(), attrs).await
    }

    /// Snapshot of a record, counting the retrieval and pushing the new
    /// count to the store.
    ///
    /// Returns `Ok(None)` when no record has this id. A failed push keeps the
    /// local count and reports [`MemoryError::Desynchronized`].
    pub async fn read(&self, id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut records = self.records.write();
            let Some(record) = records.get_mut(id) else {
                return Ok(None);
            };
            record.record_access();
            record.clone()
        };
        self.push_update(&snapshot).await?;
        debug!(
            "read memory (id={}, retrieval_count={})",
            id,
            snapshot.retrieval_count()
        );
        Ok(Some(snapshot))
    }

    /// Snapshot of a record without side effects.
    pub fn peek(&self, id: &str) -> Option<MemoryRecord> {
        self.records.read().get(id).cloned()
    }

    /// Update a record from attributes. A changed `content` attribute is
    /// recorded in the edit history; other keys override schema fields.
    ///
    /// Returns `Ok(false)` when no record has this id.
    pub async fn update(&self, id: &str, attrs: Attributes) -> Result<bool, MemoryError> {
        let _gate = self.write_gate.lock().await;
        self.update_locked(id, attrs, None).await
    }

    /// [`update`](Self::update) with an explicit edit reason.
    pub async fn update_with_reason(
        &self,
        id: &str,
        attrs: Attributes,
        reason: &str,
    ) -> Result<bool, MemoryError> {
        let _gate = self.write_gate.lock().await;
        self.update_locked(id, attrs, Some(reason)).await
    }

    /// Remove a record locally and from the store. Returns whether it existed locally.
    pub async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let _gate = self.write_gate.lock().await;
        let removed = self.records.write().remove(id).is_some();
        self.store
            .delete_document(id)
            .await
            .map_err(|source| desync(id, source))?;
        debug!("deleted memory (id={}, existed={})", id, removed);
        Ok(removed)
    }

    /// Push the local copy of a record to the store again.
    pub async fn resync(&self, id: &str) -> Result<bool, MemoryError> {
        let _gate = self.write_gate.lock().await;
        let Some(record) = self.peek(id) else {
            return Ok(false);
        };
        self.store
            .add_document(record.content(), record.to_metadata(&self.registry), id)
            .await
            .map_err(|source| desync(id, source))?;
        info!("resynchronized memory (id={})", id);
        Ok(true)
    }

    /// Ids whose extras equal `criteria` exactly, in insertion order.
    pub fn filter_by_exact_attributes(&self, criteria: &Extras) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|record| record.extras() == criteria)
            .map(|record| record.id().to_string())
            .collect()
    }

    /// Exact-filter matches first, then similarity hits, truncated to `k`.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        if options.k == 0 {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        if let Some(filter) = options.filter.as_ref().filter(|filter| !filter.is_empty()) {
            let records = self.records.read();
            for record in records.iter().filter(|record| record.extras() == filter) {
                seen.insert(record.id().to_string());
                results.push(SearchResult {
                    hit: SearchHit::Record(record.clone()),
                    origin: MatchOrigin::ExactFilter,
                    distance: None,
                });
            }
        }

        if results.len() < options.k {
            let hits = self.store.search(query, options.k).await?.first_hits();
            let records = self.records.read();
            for hit in hits {
                let within = options
                    .similarity_threshold
                    .is_none_or(|threshold| hit.distance <= threshold);
                if !within || !seen.insert(hit.id.clone()) {
                    continue;
                }
                let entry = match records.get(&hit.id) {
                    Some(record) => SearchHit::Record(record.clone()),
                    None => SearchHit::Projection {
                        metadata: self.registry.deserialize_all(&hit.metadata),
                        id: hit.id,
                        content: hit.document,
                    },
                };
                results.push(SearchResult {
                    hit: entry,
                    origin: MatchOrigin::Similarity,
                    distance: Some(hit.distance),
                });
            }
        }

        results.truncate(options.k);
        debug!(
            "memory search (k={}, filtered={}, returned={})",
            options.k,
            options.filter.is_some(),
            results.len()
        );
        Ok(results)
    }

    /// Update the first record whose extras equal `criteria`, or insert a new
    /// one carrying `criteria` as attributes.
    ///
    /// Only the first match is updated when several records match.
    pub async fn upsert_by_exact_attributes(
        &self,
        content: impl Into<String>,
        criteria: Extras,
    ) -> Result<UpsertOutcome, MemoryError> {
        let content = content.into();
        let _gate = self.write_gate.lock().await;
        let matches = self.filter_by_exact_attributes(&criteria);
        match matches.first() {
            None => {
                let attrs = criteria
                    .into_iter()
                    .map(|(key, value)| (key, FieldValue::Text(value)))
                    .collect();
                let id = self.add_locked(content, attrs).await?;
                Ok(UpsertOutcome::Inserted(id))
            }
            Some(first) => {
                if matches.len() > 1 {
                    warn!(
                        "upsert matched several memories, updating the first (id={}, matches={})",
                        first,
                        matches.len()
                    );
                }
                let mut attrs = Attributes::new();
                attrs.insert(RecordField::Content.as_str().to_string(), content.into());
                self.update_locked(first, attrs, Some(UPSERT_REASON))
                    .await?;
                Ok(UpsertOutcome::Updated(first.clone()))
            }
        }
    }

    async fn add_locked(&self, content: String, attrs: Attributes) -> Result<String, MemoryError> {
        let record = MemoryRecord::with_attributes(content, attrs, &self.registry)?;
        let id = record.id().to_string();
        {
            let mut records = self.records.write();
            if records.contains(&id) {
                return Err(MemoryError::DuplicateId(id));
            }
            records.insert(record.clone());
        }
        self.store
            .add_document(record.content(), record.to_metadata(&self.registry), &id)
            .await
            .map_err(|source| desync(&id, source))?;
        debug!("added memory (id={}, content_len={})", id, record.content().len());
        Ok(id)
    }

    async fn update_locked(
        &self,
        id: &str,
        mut attrs: Attributes,
        reason: Option<&str>,
    ) -> Result<bool, MemoryError> {
        let new_content = match attrs.remove(RecordField::Content.as_str()) {
            None => None,
            Some(FieldValue::Text(text)) => Some(text),
            Some(other) => {
                return Err(MemoryError::validation(
                    RecordField::Content.as_str(),
                    format!("expected text, got {}", other.kind()),
                ));
            }
        };
        let snapshot = {
            let mut records = self.records.write();
            let Some(record) = records.get_mut(id) else {
                debug!("update skipped, unknown memory (id={})", id);
                return Ok(false);
            };
            match new_content {
                Some(text) if text != record.content() => {
                    record.update(text, reason, &attrs, &self.registry)?
                }
                _ => record.apply_overrides(&attrs, &self.registry)?,
            }
            record.clone()
        };
        self.push_update(&snapshot).await?;
        debug!(
            "updated memory (id={}, revisions={})",
            id,
            snapshot.edit_history().len()
        );
        Ok(true)
    }

    async fn push_update(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let id = record.id();
        self.store
            .update_documents(
                &[id.to_string()],
                &[record.content().to_string()],
                &[record.to_metadata(&self.registry)],
            )
            .await
            .map_err(|source| desync(id, source))
    }
}

fn desync(id: &str, source: VectorStoreError) -> MemoryError {
    warn!("vector store push failed, local state is ahead (id={}, error={})", id, source);
    MemoryError::Desynchronized {
        id: id.to_string(),
        source,
    }
}

async fn load_records(store: &dyn VectorStore, registry: &FieldRegistry, records: &mut RecordMap) {
    let listing = match store.get_all().await {
        Ok(listing) => listing,
        Err(VectorStoreError::CollectionNotFound(name)) => {
            info!("no existing collection, starting empty (collection={})", name);
            return;
        }
        Err(err) => {
            warn!(
                "failed to load existing memories, starting empty (collection={}, error={})",
                store.collection_name(),
                err
            );
            return;
        }
    };
    for (id, document, metadata) in listing.entries() {
        let empty = amem_rs_vector::Metadata::new();
        let metadata = metadata.unwrap_or(&empty);
        match MemoryRecord::from_metadata(id, document, metadata, registry) {
            Ok(record) => records.insert(record),
            Err(err) => warn!("skipping corrupt memory (id={}, error={})", id, err),
        }
    }
}
