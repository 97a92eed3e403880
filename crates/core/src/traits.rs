use crate::{CollectionSpec, EmbeddedChunk, QueryResult, StoreError};
use async_trait::async_trait;

/// A nearest-neighbor store holding named collections of embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection, or returns the existing one when it is
    /// compatible with `spec`.
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<(), StoreError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError>;

    /// Upserts by chunk id.
    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<(), StoreError>;

    /// At most `k` hits in ascending distance order. Fails with
    /// [`StoreError::CollectionMissing`] when the collection does not exist.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, StoreError>;

    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Opens an empty replacement for `name` that queries cannot see until
    /// [`VectorStore::commit_staged`]. Records go to it through `add` under
    /// the returned handle. `None` means the backend only rebuilds in place.
    async fn stage_collection(
        &self,
        _name: &str,
        _spec: &CollectionSpec,
    ) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    /// Replaces `name` with the staged collection in one step.
    async fn commit_staged(&self, staged: &str, name: &str) -> Result<(), StoreError> {
        Err(StoreError::Request(format!(
            "cannot commit {staged} into {name}: staging is not supported"
        )))
    }
}
