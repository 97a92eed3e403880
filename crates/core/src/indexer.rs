use crate::config::{EmptyCorpusPolicy, RagConfig};
use crate::embeddings::Embedder;
use crate::error::{RagError, StoreError};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::ingest::{chunk_document, discover_pdf_files};
use crate::models::{Chunk, CollectionSpec, DistanceMetric, EmbeddedChunk, RebuildReport, SkippedPdf};
use crate::traits::VectorStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sole writer of the collection: rebuilds it wholesale from the data
/// directory.
pub struct IndexManager<S: ?Sized, E: ?Sized, X = LopdfExtractor> {
    store: Arc<S>,
    embedder: Arc<E>,
    extractor: X,
    config: RagConfig,
}

impl<S, E> IndexManager<S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: RagConfig) -> Self {
        Self {
            store,
            embedder,
            extractor: LopdfExtractor,
            config,
        }
    }
}

impl<S, E, X> IndexManager<S, E, X>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
    X: PdfExtractor,
{
    pub fn with_extractor<Y: PdfExtractor>(self, extractor: Y) -> IndexManager<S, E, Y> {
        IndexManager {
            store: self.store,
            embedder: self.embedder,
            extractor,
            config: self.config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            dimensions: self.embedder.dimensions(),
            metric: DistanceMetric::Cosine,
            model: self.embedder.model_id(),
        }
    }

    /// Replaces the collection with the chunks of every readable PDF.
    ///
    /// Unreadable files are skipped and listed in the report. On a backend
    /// that stages, queries keep seeing the previous collection until the
    /// new one is complete, and a failed rebuild leaves it untouched.
    /// Otherwise the collection is dropped and refilled in place, so an
    /// insert failure may leave it partial; running the rebuild again yields
    /// the same ids.
    pub async fn rebuild_index(&self) -> Result<RebuildReport, RagError> {
        self.config.validate().map_err(RagError::Config)?;

        let collection = self.config.collection.as_str();
        let discovery = discover_pdf_files(&self.config.data_dir, self.config.recursive);
        let mut report = RebuildReport::default();

        for skipped in discovery.skipped {
            warn!(source = %skipped.name, reason = %skipped.reason, "skipped pdf");
            report.skipped.push(skipped);
        }

        if discovery.documents.is_empty() {
            match self.config.empty_corpus {
                EmptyCorpusPolicy::Preserve => {
                    info!(
                        data_dir = %self.config.data_dir.display(),
                        collection,
                        files_skipped = report.skipped.len(),
                        "no pdf files found; keeping existing collection"
                    );
                    return Ok(report);
                }
                EmptyCorpusPolicy::Clear => {
                    let staged = self.begin_replacement().await?;
                    self.finish_replacement(staged.as_deref()).await?;
                    report.cleared = true;
                    info!(collection, "no pdf files found; collection cleared");
                    return Ok(report);
                }
            }
        }

        let staged = self.begin_replacement().await?;
        let target = staged.as_deref().unwrap_or(collection);

        let batch_size = self.config.batch_size;
        let mut batch: Vec<Chunk> = Vec::with_capacity(batch_size);

        for document in &discovery.documents {
            let chunks = match chunk_document(&self.extractor, document, &self.config.chunking) {
                Ok(chunks) => chunks,
                Err(error) => {
                    warn!(source = %document.name, reason = %error, "skipped pdf");
                    report.skipped.push(SkippedPdf {
                        name: document.name.clone(),
                        path: document.path.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            debug!(source = %document.name, chunk_count = chunks.len(), "chunked pdf");
            report.files_indexed += 1;

            for chunk in chunks {
                batch.push(chunk);
                if batch.len() >= batch_size {
                    report.indexed += self.flush(target, &mut batch).await?;
                }
            }
        }

        report.indexed += self.flush(target, &mut batch).await?;
        self.finish_replacement(staged.as_deref()).await?;

        info!(
            collection,
            chunk_count = report.indexed,
            files_indexed = report.files_indexed,
            files_skipped = report.skipped.len(),
            "rebuilt index"
        );
        Ok(report)
    }

    /// Stages a fresh collection when the backend can, otherwise drops the
    /// old collection (a missing one is fine) and creates it empty.
    async fn begin_replacement(&self) -> Result<Option<String>, RagError> {
        let collection = self.config.collection.as_str();
        let spec = self.collection_spec();

        if let Some(staged) = self
            .store
            .stage_collection(collection, &spec)
            .await
            .map_err(RagError::Store)?
        {
            debug!(collection, staged = %staged, "staged replacement collection");
            return Ok(Some(staged));
        }

        let existed = self
            .store
            .delete_collection(collection)
            .await
            .map_err(RagError::Store)?;
        debug!(collection, existed, "dropped previous collection");

        self.store
            .create_collection(collection, &spec)
            .await
            .map_err(RagError::Store)?;
        Ok(None)
    }

    async fn finish_replacement(&self, staged: Option<&str>) -> Result<(), RagError> {
        let Some(staged) = staged else {
            return Ok(());
        };
        let collection = self.config.collection.as_str();
        self.store
            .commit_staged(staged, collection)
            .await
            .map_err(RagError::Store)?;
        debug!(collection, staged, "committed staged collection");
        Ok(())
    }

    async fn flush(&self, collection: &str, batch: &mut Vec<Chunk>) -> Result<usize, RagError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts);
        if vectors.len() != batch.len() {
            return Err(RagError::StoreInsert(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                batch.len()
            ))));
        }

        let records: Vec<EmbeddedChunk> = batch
            .drain(..)
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();

        self.store
            .add(collection, &records)
            .await
            .map_err(RagError::StoreInsert)?;
        debug!(collection, batch_len = records.len(), "inserted batch");
        Ok(records.len())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{CollectionSpec, EmbeddedChunk, PageRecord, QueryResult};
    use crate::traits::VectorStore;
    use crate::{IngestError, PdfExtractor, StoreError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;

    /// Serves page texts by file name; a `None` entry fails extraction.
    #[derive(Default)]
    pub struct FakeExtractor {
        pub files: HashMap<String, Option<Vec<String>>>,
    }

    impl FakeExtractor {
        pub fn with(mut self, name: &str, pages: &[&str]) -> Self {
            self.files.insert(
                name.to_string(),
                Some(pages.iter().map(|page| page.to_string()).collect()),
            );
            self
        }

        pub fn failing(mut self, name: &str) -> Self {
            self.files.insert(name.to_string(), None);
            self
        }
    }

    impl PdfExtractor for FakeExtractor {
        fn extract_pages(&self, source: &str, _path: &Path) -> Result<Vec<PageRecord>, IngestError> {
            match self.files.get(source) {
                Some(Some(pages)) => Ok(pages
                    .iter()
                    .enumerate()
                    .filter(|(_, text)| !text.trim().is_empty())
                    .map(|(index, text)| PageRecord {
                        source: source.to_string(),
                        page: index as u32 + 1,
                        text: text.clone(),
                    })
                    .collect()),
                _ => Err(IngestError::PdfParse(format!("cannot read {source}"))),
            }
        }
    }

    /// Accepts lifecycle calls but fails every insert and query.
    pub struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn create_collection(&self, _name: &str, _spec: &CollectionSpec) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete_collection(&self, _name: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn add(&self, _collection: &str, _records: &[EmbeddedChunk]) -> Result<(), StoreError> {
            Err(StoreError::Request("disk full".to_string()))
        }

        async fn query(
            &self,
            _collection: &str,
            _vector: &[f32],
            _k: usize,
        ) -> Result<Vec<QueryResult>, StoreError> {
            Err(StoreError::Request("index corrupted".to_string()))
        }

        async fn count(&self, _collection: &str) -> Result<usize, StoreError> {
            Err(StoreError::Request("index corrupted".to_string()))
        }
    }
}
