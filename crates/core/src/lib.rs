pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod indexer;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, chunk_text, normalize_whitespace, ChunkStrategy, ChunkingConfig};
pub use config::{EmptyCorpusPolicy, RagConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, RagError, StoreError};
pub use extractor::{extract_page_texts, LopdfExtractor, PdfExtractor};
pub use identity::chunk_id;
pub use indexer::IndexManager;
pub use ingest::{chunk_document, discover_pdf_files, Discovery};
pub use models::{
    Chunk, ChunkMetadata, CollectionSpec, DistanceMetric, EmbeddedChunk, PageRecord, PdfDocument,
    QueryReport, QueryResult, RebuildReport, SkippedPdf,
};
pub use orchestrator::RagService;
pub use query::QueryEngine;
pub use stores::{LocalVectorStore, QdrantStore};
pub use traits::VectorStore;
