use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_rag_core::{
    CharacterNgramEmbedder, ChunkStrategy, ChunkingConfig, EmptyCorpusPolicy, LocalVectorStore,
    QdrantStore, RagConfig, RagService, VectorStore, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version, about = "Index local PDFs and retrieve matching passages")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder scanned for *.pdf files
    #[arg(long, env = "PDF_RAG_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Folder holding the local vector index
    #[arg(long, env = "PDF_RAG_INDEX_DIR", default_value = "chroma_db")]
    index_dir: PathBuf,

    /// Collection name
    #[arg(long, env = "PDF_RAG_COLLECTION", default_value = "docs")]
    collection: String,

    /// Vector store backend
    #[arg(long, env = "PDF_RAG_BACKEND", value_enum, default_value_t = Backend::Local)]
    backend: Backend,

    /// Qdrant base URL, used with --backend qdrant
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Embedding dimensions of the trigram embedder
    #[arg(long, env = "PDF_RAG_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    dimensions: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Local,
    Qdrant,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Window,
    Paragraph,
}

#[derive(Clone, Copy, ValueEnum)]
enum OnEmpty {
    Preserve,
    Clear,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the collection with chunks from every PDF in the data folder.
    Rebuild {
        /// Maximum characters per chunk.
        #[arg(long, default_value = "900")]
        chunk_size: usize,
        /// Characters shared by consecutive chunks.
        #[arg(long, default_value = "150")]
        overlap: usize,
        #[arg(long, value_enum, default_value_t = Strategy::Window)]
        strategy: Strategy,
        /// Chunks embedded and inserted per store call.
        #[arg(long, default_value = "64")]
        batch_size: usize,
        /// Also scan subfolders.
        #[arg(long, default_value_t = false)]
        recursive: bool,
        /// What to do with the existing collection when no PDFs are found.
        #[arg(long, value_enum, default_value_t = OnEmpty::Preserve)]
        on_empty: OnEmpty,
    },
    /// Return the passages nearest to a question.
    Query {
        question: String,
        /// Number of passages to return.
        #[arg(short, long, default_value = "3")]
        k: usize,
    },
    /// Report how many chunks are indexed.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    let mut config = RagConfig {
        data_dir: cli.data_dir.clone(),
        index_dir: cli.index_dir.clone(),
        collection: cli.collection.clone(),
        ..RagConfig::default()
    };

    if let Command::Rebuild {
        chunk_size,
        overlap,
        strategy,
        batch_size,
        recursive,
        on_empty,
    } = &cli.command
    {
        config.chunking = ChunkingConfig {
            chunk_size: *chunk_size,
            overlap: *overlap,
            strategy: match strategy {
                Strategy::Window => ChunkStrategy::SlidingWindow,
                Strategy::Paragraph => ChunkStrategy::Paragraph,
            },
        };
        config.batch_size = *batch_size;
        config.recursive = *recursive;
        config.empty_corpus = match on_empty {
            OnEmpty::Preserve => EmptyCorpusPolicy::Preserve,
            OnEmpty::Clear => EmptyCorpusPolicy::Clear,
        };
    }

    let store: Arc<dyn VectorStore> = match cli.backend {
        Backend::Local => Arc::new(
            LocalVectorStore::open(&config.index_dir)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?,
        ),
        Backend::Qdrant => Arc::new(
            QdrantStore::new(&cli.qdrant_url)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?,
        ),
    };
    let embedder = Arc::new(CharacterNgramEmbedder {
        dimensions: cli.dimensions,
    });
    let service = RagService::new(store, embedder, config);

    match cli.command {
        Command::Rebuild { .. } => {
            let report = service
                .rebuild_index()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for skipped in &report.skipped {
                println!("warning: failed to read {}: {}", skipped.name, skipped.reason);
            }

            if report.indexed == 0 && !report.cleared && report.files_indexed == 0 {
                println!(
                    "0 chunks indexed (no readable pdf in {})",
                    service.config().data_dir.display()
                );
            } else {
                println!(
                    "{} chunks indexed from {} file(s) at {}",
                    report.indexed,
                    report.files_indexed,
                    Utc::now().to_rfc3339()
                );
            }
        }
        Command::Query { question, k } => {
            let report = service
                .query_index(&question, k)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if let Some(warning) = &report.warning {
                println!("warning: {warning}");
            }

            if report.hits.is_empty() {
                println!("no results yet; try rebuilding the index or asking a different question");
            }

            for (rank, hit) in report.hits.iter().enumerate() {
                println!(
                    "{}. {} p.{} id={} distance={:.4}",
                    rank + 1,
                    hit.metadata.source,
                    hit.metadata.page,
                    hit.id,
                    hit.distance
                );
                println!("  {}", hit.text);
            }
        }
        Command::Status => {
            let count = service
                .indexed_count()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            match count {
                Some(count) => println!("collection={} chunks={count}", cli.collection),
                None => println!("collection={} not built yet", cli.collection),
            }
        }
    }

    Ok(())
}
