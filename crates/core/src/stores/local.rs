use crate::models::{ChunkMetadata, CollectionSpec, EmbeddedChunk, QueryResult};
use crate::store::{rank_hits, validate_collection_name};
use crate::traits::VectorStore;
use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

const BACKEND: &str = "local";

const STAGING_SUFFIX: &str = ".staging";

/// Exhaustive-search vector store persisted as one JSON file per collection.
///
/// Files are replaced with a write-then-rename, so a reader never observes a
/// half-written collection. Staged collections live in memory and are
/// written once when committed. The in-process cache assumes this process is
/// the only writer of `root`.
pub struct LocalVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, CollectionFile>>,
    staged: RwLock<HashMap<String, CollectionFile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    #[serde(flatten)]
    spec: CollectionSpec,
    created_at: DateTime<Utc>,
    records: BTreeMap<String, StoredRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    text: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

impl LocalVectorStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            collections: RwLock::new(HashMap::new()),
            staged: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    async fn read_from_disk(&self, name: &str) -> Result<Option<CollectionFile>, StoreError> {
        match tokio::fs::read(self.collection_path(name)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn load<'a>(
        &self,
        cache: &'a mut HashMap<String, CollectionFile>,
        name: &str,
    ) -> Result<Option<&'a mut CollectionFile>, StoreError> {
        if !cache.contains_key(name) {
            match self.read_from_disk(name).await? {
                Some(collection) => {
                    cache.insert(name.to_string(), collection);
                }
                None => return Ok(None),
            }
        }
        Ok(cache.get_mut(name))
    }

    async fn persist(&self, collection: &CollectionFile) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(collection)?;
        let target = self.collection_path(&collection.name);
        let staging = self.root.join(format!(".{}.json.tmp", collection.name));
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &target).await?;
        Ok(())
    }
}

fn check_compatible(existing: &CollectionSpec, requested: &CollectionSpec) -> Result<(), StoreError> {
    if existing.dimensions != requested.dimensions {
        return Err(StoreError::DimensionMismatch {
            expected: existing.dimensions,
            actual: requested.dimensions,
        });
    }
    if existing.metric != requested.metric || existing.model != requested.model {
        return Err(StoreError::Request(format!(
            "collection was built with {:?}/{} but {:?}/{} was requested",
            existing.metric, existing.model, requested.metric, requested.model
        )));
    }
    Ok(())
}

fn check_dimensions(collection: &CollectionFile, records: &[EmbeddedChunk]) -> Result<(), StoreError> {
    match records
        .iter()
        .find(|record| record.vector.len() != collection.spec.dimensions)
    {
        Some(record) => Err(StoreError::DimensionMismatch {
            expected: collection.spec.dimensions,
            actual: record.vector.len(),
        }),
        None => Ok(()),
    }
}

fn upsert(collection: &mut CollectionFile, records: &[EmbeddedChunk]) {
    for record in records {
        collection.records.insert(
            record.chunk.id.clone(),
            StoredRecord {
                text: record.chunk.text.clone(),
                metadata: record.chunk.metadata.clone(),
                vector: record.vector.clone(),
            },
        );
    }
}

fn search(collection: &CollectionFile, vector: &[f32], k: usize) -> Result<Vec<QueryResult>, StoreError> {
    if vector.len() != collection.spec.dimensions {
        return Err(StoreError::DimensionMismatch {
            expected: collection.spec.dimensions,
            actual: vector.len(),
        });
    }

    let hits = collection
        .records
        .iter()
        .map(|(id, record)| QueryResult {
            id: id.clone(),
            text: record.text.clone(),
            metadata: record.metadata.clone(),
            distance: collection.spec.metric.distance(&record.vector, vector),
        })
        .collect();

    Ok(rank_hits(hits, k))
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<(), StoreError> {
        validate_collection_name(name)?;
        let mut cache = self.collections.write().await;

        if let Some(existing) = self.load(&mut cache, name).await? {
            return check_compatible(&existing.spec, spec);
        }

        let collection = CollectionFile {
            name: name.to_string(),
            spec: spec.clone(),
            created_at: Utc::now(),
            records: BTreeMap::new(),
        };
        self.persist(&collection).await?;
        debug!(backend = BACKEND, collection = name, dimensions = spec.dimensions, "created collection");
        cache.insert(name.to_string(), collection);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError> {
        validate_collection_name(name)?;
        let mut cache = self.collections.write().await;
        let cached = cache.remove(name).is_some();

        let on_disk = match tokio::fs::remove_file(self.collection_path(name)).await {
            Ok(()) => true,
            Err(error) if error.kind() == ErrorKind::NotFound => false,
            Err(error) => return Err(error.into()),
        };

        Ok(cached || on_disk)
    }

    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<(), StoreError> {
        {
            let mut staged = self.staged.write().await;
            if let Some(target) = staged.get_mut(collection) {
                check_dimensions(target, records)?;
                upsert(target, records);
                return Ok(());
            }
        }

        validate_collection_name(collection)?;
        let mut cache = self.collections.write().await;
        let current = self
            .load(&mut cache, collection)
            .await?
            .ok_or_else(|| StoreError::CollectionMissing(collection.to_string()))?;
        check_dimensions(current, records)?;

        let mut updated = current.clone();
        upsert(&mut updated, records);
        self.persist(&updated).await?;
        cache.insert(collection.to_string(), updated);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, StoreError> {
        validate_collection_name(collection)?;
        {
            let cache = self.collections.read().await;
            if let Some(cached) = cache.get(collection) {
                return search(cached, vector, k);
            }
        }

        let mut cache = self.collections.write().await;
        let loaded = self
            .load(&mut cache, collection)
            .await?
            .ok_or_else(|| StoreError::CollectionMissing(collection.to_string()))?;
        search(loaded, vector, k)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        validate_collection_name(collection)?;
        let mut cache = self.collections.write().await;
        self.load(&mut cache, collection)
            .await?
            .map(|loaded| loaded.records.len())
            .ok_or_else(|| StoreError::CollectionMissing(collection.to_string()))
    }

    async fn stage_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
    ) -> Result<Option<String>, StoreError> {
        validate_collection_name(name)?;
        let handle = format!("{name}{STAGING_SUFFIX}");
        let collection = CollectionFile {
            name: handle.clone(),
            spec: spec.clone(),
            created_at: Utc::now(),
            records: BTreeMap::new(),
        };
        self.staged.write().await.insert(handle.clone(), collection);
        Ok(Some(handle))
    }

    async fn commit_staged(&self, staged: &str, name: &str) -> Result<(), StoreError> {
        validate_collection_name(name)?;
        let mut collection = self
            .staged
            .write()
            .await
            .remove(staged)
            .ok_or_else(|| StoreError::CollectionMissing(staged.to_string()))?;
        collection.name = name.to_string();

        let mut cache = self.collections.write().await;
        self.persist(&collection).await?;
        debug!(
            backend = BACKEND,
            collection = name,
            records = collection.records.len(),
            "committed staged collection"
        );
        cache.insert(name.to_string(), collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LocalVectorStore;
    use crate::models::{Chunk, ChunkMetadata, CollectionSpec, DistanceMetric, EmbeddedChunk};
    use crate::traits::VectorStore;
    use crate::StoreError;
    use tempfile::tempdir;

    fn spec(dimensions: usize) -> CollectionSpec {
        CollectionSpec {
            dimensions,
            metric: DistanceMetric::Cosine,
            model: "test-model".to_string(),
        }
    }

    fn record(id: &str, text: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id: id.to_string(),
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source: "a.pdf".to_string(),
                    page: 1,
                },
            },
            vector,
        }
    }

    #[tokio::test]
    async fn query_returns_nearest_first() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        store
            .add(
                "docs",
                &[
                    record("far", "far", vec![0.0, 1.0]),
                    record("near", "near", vec![1.0, 0.1]),
                    record("mid", "mid", vec![1.0, 1.0]),
                ],
            )
            .await?;

        let hits = store.query("docs", &[1.0, 0.0], 2).await?;
        let ids: Vec<_> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits.iter().all(|hit| hit.distance >= 0.0));
        Ok(())
    }

    #[tokio::test]
    async fn k_larger_than_collection_returns_everything() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        store.add("docs", &[record("only", "only", vec![1.0, 0.0])]).await?;

        assert_eq!(store.query("docs", &[1.0, 0.0], 10).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_ids_overwrite() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        store.add("docs", &[record("x", "old", vec![1.0, 0.0])]).await?;
        store.add("docs", &[record("x", "new", vec![0.0, 1.0])]).await?;

        assert_eq!(store.count("docs").await?, 1);
        let hits = store.query("docs", &[0.0, 1.0], 5).await?;
        assert_eq!(hits[0].text, "new");
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        assert!(!store.delete_collection("docs").await?);

        store.create_collection("docs", &spec(2)).await?;
        assert!(store.delete_collection("docs").await?);
        assert!(!store.delete_collection("docs").await?);
        assert!(!dir.path().join("docs.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_collection_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;

        let result = store.query("docs", &[1.0, 0.0], 3).await;
        assert!(matches!(result, Err(StoreError::CollectionMissing(_))));
        let result = store.add("docs", &[record("x", "x", vec![1.0, 0.0])]).await;
        assert!(matches!(result, Err(StoreError::CollectionMissing(_))));
        Ok(())
    }

    #[tokio::test]
    async fn collection_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        {
            let store = LocalVectorStore::open(dir.path())?;
            store.create_collection("docs", &spec(2)).await?;
            store.add("docs", &[record("kept", "kept", vec![1.0, 0.0])]).await?;
        }

        let reopened = LocalVectorStore::open(dir.path())?;
        let hits = reopened.query("docs", &[1.0, 0.0], 1).await?;
        assert_eq!(hits[0].id, "kept");
        assert_eq!(hits[0].metadata.source, "a.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;

        let add = store.add("docs", &[record("x", "x", vec![1.0, 0.0, 0.0])]).await;
        assert!(matches!(add, Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })));
        let query = store.query("docs", &[1.0], 1).await;
        assert!(matches!(query, Err(StoreError::DimensionMismatch { .. })));
        let create = store.create_collection("docs", &spec(3)).await;
        assert!(matches!(create, Err(StoreError::DimensionMismatch { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn create_is_create_or_get() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        store.add("docs", &[record("x", "x", vec![1.0, 0.0])]).await?;
        store.create_collection("docs", &spec(2)).await?;

        assert_eq!(store.count("docs").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        std::fs::create_dir(dir.path().join(".docs.json.tmp"))?;

        let add = store.add("docs", &[record("x", "x", vec![1.0, 0.0])]).await;

        assert!(matches!(add, Err(StoreError::Io(_))));
        assert_eq!(store.count("docs").await?, 0);
        assert!(store.query("docs", &[1.0, 0.0], 5).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn staged_records_are_hidden_until_commit() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;
        store.add("docs", &[record("old", "old", vec![1.0, 0.0])]).await?;

        let staged = store
            .stage_collection("docs", &spec(2))
            .await?
            .ok_or("local store should stage")?;
        store.add(&staged, &[record("new", "new", vec![0.0, 1.0])]).await?;

        let ids: Vec<_> = store
            .query("docs", &[1.0, 0.0], 5)
            .await?
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(ids, vec!["old"]);

        store.commit_staged(&staged, "docs").await?;
        let hits = store.query("docs", &[0.0, 1.0], 5).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "new");

        let reopened = LocalVectorStore::open(dir.path())?;
        assert_eq!(reopened.count("docs").await?, 1);
        assert!(!dir.path().join("docs.staging.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn staged_collection_may_change_dimensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::open(dir.path())?;
        store.create_collection("docs", &spec(2)).await?;

        let staged = store
            .stage_collection("docs", &spec(3))
            .await?
            .ok_or("local store should stage")?;
        let add = store.add(&staged, &[record("x", "x", vec![1.0, 0.0])]).await;
        assert!(matches!(add, Err(StoreError::DimensionMismatch { expected: 3, actual: 2 })));

        store.add(&staged, &[record("x", "x", vec![1.0, 0.0, 0.0])]).await?;
        store.commit_staged(&staged, "docs").await?;
        assert_eq!(store.query("docs", &[1.0, 0.0, 0.0], 1).await?.len(), 1);
        Ok(())
    }
}
