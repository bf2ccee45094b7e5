//! File-backed vector store persisting one JSONL file per collection.

use crate::collection::{Collection, DocumentRow, rows_from_columns};
use crate::embedding::{DistanceMetric, HashingEmbedder};
use crate::error::VectorStoreError;
use crate::store::{VectorStore, check_update_batch};
use crate::types::{GetResult, Metadata, QueryResult};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for opening a [`FileVectorStore`].
#[derive(Debug, Clone, Copy)]
pub struct FileStoreOptions {
    /// Reuse an existing collection file instead of refusing to open it.
    pub extend: bool,
    /// Distance metric for queries.
    pub metric: DistanceMetric,
    /// Width of the hashing embedder.
    pub dimensions: usize,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            extend: false,
            metric: DistanceMetric::Cosine,
            dimensions: crate::embedding::DEFAULT_DIMENSIONS,
        }
    }
}

/// Persistent collection rewritten atomically after every mutation.
///
/// Embeddings are not persisted; they are recomputed when the file is opened.
pub struct FileVectorStore {
    name: String,
    path: PathBuf,
    collection: RwLock<Collection>,
}

impl FileVectorStore {
    /// Open (or prepare) the collection `collection_name` under `root`.
    ///
    /// Fails with [`VectorStoreError::CollectionExists`] when the collection
    /// already has a file on disk and `options.extend` is false.
    pub fn open(
        root: impl AsRef<Path>,
        collection_name: &str,
        options: FileStoreOptions,
    ) -> Result<Self, VectorStoreError> {
        let root = root.as_ref();
        if collection_name.is_empty()
            || collection_name.contains(['/', '\\'])
            || collection_name.starts_with('.')
        {
            return Err(VectorStoreError::InvalidRequest(format!(
                "invalid collection name: {collection_name:?}"
            )));
        }
        std::fs::create_dir_all(root)?;
        let path = root.join(format!("{collection_name}.jsonl"));
        let mut collection = Collection::new(
            collection_name,
            Arc::new(HashingEmbedder::new(options.dimensions)),
            options.metric,
        );
        if path.exists() {
            if !options.extend {
                return Err(VectorStoreError::CollectionExists(
                    collection_name.to_string(),
                ));
            }
            for row in load_rows(&path)? {
                collection.upsert(row);
            }
        }
        info!(
            "opened file vector store (collection={}, path={}, documents={})",
            collection_name,
            path.display(),
            collection.len()
        );
        Ok(Self {
            name: collection_name.to_string(),
            path,
            collection: RwLock::new(collection),
        })
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("jsonl.tmp")
    }

    /// Rewrite the collection file atomically.
    fn persist(&self, collection: &Collection) -> Result<(), VectorStoreError> {
        let temp_path = self.temp_path();
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            for row in collection.rows() {
                let line = serde_json::to_string(row)?;
                writeln!(file, "{line}")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;
        debug!(
            "persisted collection (collection={}, documents={})",
            self.name,
            collection.len()
        );
        Ok(())
    }

    /// Apply `change` to a copy of the collection and swap it in once the
    /// file is rewritten. `change` returns whether anything changed.
    fn commit(
        &self,
        change: impl FnOnce(&mut Collection) -> Result<bool, VectorStoreError>,
    ) -> Result<(), VectorStoreError> {
        let mut collection = self.collection.write();
        let mut staged = collection.clone();
        if !change(&mut staged)? {
            return Ok(());
        }
        self.persist(&staged)?;
        *collection = staged;
        Ok(())
    }
}

/// Read rows from a collection file, skipping lines that do not parse.
fn load_rows(path: &Path) -> Result<Vec<DocumentRow>, VectorStoreError> {
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DocumentRow>(&line) {
            Ok(row) => rows.push(row),
            Err(err) => warn!(
                "skipping corrupt collection row (path={}, line={}, error={})",
                path.display(),
                line_no + 1,
                err
            ),
        }
    }
    Ok(rows)
}

#[async_trait]
impl VectorStore for FileVectorStore {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn add_document(
        &self,
        text: &str,
        metadata: Metadata,
        id: &str,
    ) -> Result<(), VectorStoreError> {
        self.commit(|staged| {
            staged.upsert(DocumentRow {
                id: id.to_string(),
                document: text.to_string(),
                metadata,
            });
            Ok(true)
        })
    }

    async fn delete_document(&self, id: &str) -> Result<(), VectorStoreError> {
        self.commit(|staged| Ok(staged.remove(id)))
    }

    async fn search(&self, query: &str, k: usize) -> Result<QueryResult, VectorStoreError> {
        Ok(QueryResult::single(self.collection.read().query(query, k)))
    }

    async fn get(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GetResult, VectorStoreError> {
        if !self.path.exists() {
            return Err(VectorStoreError::CollectionNotFound(self.name.clone()));
        }
        Ok(self.collection.read().list(offset, limit))
    }

    async fn update_documents(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<(), VectorStoreError> {
        check_update_batch(ids, documents, metadatas)?;
        self.commit(|staged| {
            staged.update(rows_from_columns(ids, documents, metadatas))?;
            Ok(true)
        })
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        Ok(self.collection.read().len())
    }
}
