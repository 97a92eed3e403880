use crate::config::RagConfig;
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::error::{RagError, StoreError};
use crate::indexer::IndexManager;
use crate::models::{QueryReport, RebuildReport};
use crate::query::QueryEngine;
use crate::stores::LocalVectorStore;
use crate::traits::VectorStore;
use std::sync::Arc;

/// The two operations a front end needs, wired to shared long-lived handles.
pub struct RagService<S: ?Sized, E: ?Sized> {
    indexer: IndexManager<S, E>,
    engine: QueryEngine<S, E>,
    store: Arc<S>,
    collection: String,
}

impl<S, E> RagService<S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: RagConfig) -> Self {
        let collection = config.collection.clone();
        Self {
            engine: QueryEngine::new(store.clone(), embedder.clone(), collection.clone()),
            indexer: IndexManager::new(store.clone(), embedder, config),
            store,
            collection,
        }
    }

    pub fn config(&self) -> &RagConfig {
        self.indexer.config()
    }

    pub async fn rebuild_index(&self) -> Result<RebuildReport, RagError> {
        self.indexer.rebuild_index().await
    }

    pub async fn query_index(&self, question: &str, k: usize) -> Result<QueryReport, RagError> {
        self.engine.query_index(question, k).await
    }

    /// Number of stored chunks, or `None` before the first rebuild.
    pub async fn indexed_count(&self) -> Result<Option<usize>, RagError> {
        match self.store.count(&self.collection).await {
            Ok(count) => Ok(Some(count)),
            Err(StoreError::CollectionMissing(_)) => Ok(None),
            Err(error) => Err(RagError::Store(error)),
        }
    }
}

impl RagService<LocalVectorStore, CharacterNgramEmbedder> {
    /// Local store under `config.index_dir` with the default embedder.
    pub fn open_local(config: RagConfig) -> Result<Self, RagError> {
        let store = LocalVectorStore::open(&config.index_dir).map_err(RagError::Store)?;
        Ok(Self::new(
            Arc::new(store),
            Arc::new(CharacterNgramEmbedder::default()),
            config,
        ))
    }
}
