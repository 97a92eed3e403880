use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A PDF found in the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    /// Path relative to the data directory, `/`-separated.
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub source: String,
    /// 1-based.
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One ranked hit. `distance` is non-negative and smaller means closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl DistanceMetric {
    /// Cosine distance is `1 - cos`, clamped to `[0, 2]`; a zero vector is
    /// treated as orthogonal to everything.
    pub fn distance(self, left: &[f32], right: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
                let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
                let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
                if left_norm == 0.0 || right_norm == 0.0 {
                    return 1.0;
                }
                (1.0 - dot / (left_norm * right_norm)).clamp(0.0, 2.0)
            }
            DistanceMetric::Euclidean => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

/// Parameters a collection is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub dimensions: usize,
    pub metric: DistanceMetric,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub name: String,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub indexed: usize,
    pub files_indexed: usize,
    pub skipped: Vec<SkippedPdf>,
    /// True when an empty corpus cleared the previous collection.
    pub cleared: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueryReport {
    pub hits: Vec<QueryResult>,
    /// Set when the store failed and `hits` was left empty.
    pub warning: Option<String>,
}
