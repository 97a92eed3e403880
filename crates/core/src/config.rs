use crate::chunking::ChunkingConfig;
use crate::error::IngestError;
use crate::store::validate_collection_name;
use std::path::PathBuf;

pub const DEFAULT_COLLECTION: &str = "docs";
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// What a rebuild does when the data directory holds no PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyCorpusPolicy {
    /// Leave the previous collection untouched and report 0.
    #[default]
    Preserve,
    /// Replace the previous collection with an empty one.
    Clear,
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub collection: String,
    pub chunking: ChunkingConfig,
    /// Chunks embedded and inserted per store call.
    pub batch_size: usize,
    /// Descend into subdirectories of `data_dir`.
    pub recursive: bool,
    pub empty_corpus: EmptyCorpusPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("chroma_db"),
            collection: DEFAULT_COLLECTION.to_string(),
            chunking: ChunkingConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            recursive: false,
            empty_corpus: EmptyCorpusPolicy::default(),
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        self.chunking.validate()?;

        if self.batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch_size must be at least 1".to_string(),
            ));
        }

        validate_collection_name(&self.collection)
            .map_err(|error| IngestError::InvalidArgument(error.to_string()))
    }
}
