use crate::error::IngestError;
use crate::identity::chunk_id;
use crate::models::{Chunk, ChunkMetadata, PageRecord};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChunkStrategy {
    #[default]
    SlidingWindow,
    Paragraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    pub overlap: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            strategy: ChunkStrategy::default(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Character ranges of the sliding windows over a text of `len` characters.
///
/// The walk stops once a window touches the end of the text, so the tail is
/// never emitted twice.
pub fn window_spans(len: usize, config: &ChunkingConfig) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + config.chunk_size).min(len);
        spans.push(start..end);
        if end == len {
            break;
        }
        start = start.saturating_add(config.step());
    }
    spans
}

pub fn chunk_sliding_window(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    window_spans(chars.len(), config)
        .into_iter()
        .map(|span| chars[span].iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Splits raw text on blank lines; paragraphs longer than `chunk_size` fall
/// back to the sliding window so the size bound still holds.
pub fn chunk_by_paragraph(raw: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut paragraph = String::new();

    for line in raw.lines().chain(std::iter::once("")) {
        if !line.replace('\u{a0}', " ").trim().is_empty() {
            paragraph.push_str(line);
            paragraph.push('\n');
            continue;
        }

        let normalized = normalize_whitespace(&paragraph);
        paragraph.clear();
        if normalized.is_empty() {
            continue;
        }

        if normalized.chars().count() <= config.chunk_size {
            chunks.push(normalized);
        } else {
            chunks.extend(chunk_sliding_window(&normalized, config));
        }
    }
    chunks
}

pub fn chunk_text(raw: &str, config: &ChunkingConfig) -> Vec<String> {
    match config.strategy {
        ChunkStrategy::SlidingWindow => chunk_sliding_window(&normalize_whitespace(raw), config),
        ChunkStrategy::Paragraph => chunk_by_paragraph(raw, config),
    }
}

pub fn build_chunks(page: &PageRecord, config: &ChunkingConfig) -> Vec<Chunk> {
    chunk_text(&page.text, config)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: chunk_id(&page.source, page.page, index),
            text,
            metadata: ChunkMetadata {
                source: page.source.clone(),
                page: page.page,
            },
        })
        .collect()
}
