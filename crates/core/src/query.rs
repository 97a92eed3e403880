use crate::embeddings::Embedder;
use crate::error::{IngestError, RagError, StoreError};
use crate::models::QueryReport;
use crate::traits::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only side of the pipeline.
pub struct QueryEngine<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    embedder: Arc<E>,
    collection: String,
}

impl<S, E> QueryEngine<S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, collection: impl Into<String>) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    /// Returns at most `k` passages, closest first.
    ///
    /// Only `k == 0` is an error. A missing collection yields no hits, and a
    /// store failure yields no hits plus a warning in the report.
    pub async fn query_index(&self, question: &str, k: usize) -> Result<QueryReport, RagError> {
        if k < 1 {
            return Err(RagError::Config(IngestError::InvalidArgument(
                "k must be at least 1".to_string(),
            )));
        }

        if question.trim().is_empty() {
            return Ok(QueryReport::default());
        }

        let vector = self.embedder.embed(question);
        match self.store.query(&self.collection, &vector, k).await {
            Ok(mut hits) => {
                hits.truncate(k);
                debug!(collection = %self.collection, hit_count = hits.len(), "query answered");
                Ok(QueryReport {
                    hits,
                    warning: None,
                })
            }
            Err(StoreError::CollectionMissing(collection)) => {
                debug!(collection = %collection, "query against missing collection");
                Ok(QueryReport::default())
            }
            Err(error) => {
                let error = RagError::StoreQuery(error);
                warn!(collection = %self.collection, error = %error, "query failed");
                Ok(QueryReport {
                    hits: Vec::new(),
                    warning: Some(error.to_string()),
                })
            }
        }
    }
}
