use crate::chunking::{build_chunks, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::PdfExtractor;
use crate::models::{Chunk, PdfDocument, SkippedPdf};
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

/// Result of scanning the data directory.
#[derive(Debug, Default)]
pub struct Discovery {
    pub documents: Vec<PdfDocument>,
    /// Entries that could not be listed or named, so they never reach the
    /// extractor.
    pub skipped: Vec<SkippedPdf>,
}

/// PDFs under `folder`, sorted by name. A missing folder is an empty corpus;
/// any other walk failure is reported in [`Discovery::skipped`].
pub fn discover_pdf_files(folder: &Path, recursive: bool) -> Discovery {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut discovery = Discovery::default();

    for item in WalkDir::new(folder).min_depth(1).max_depth(max_depth) {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                let missing_root = error.depth() == 0
                    && error
                        .io_error()
                        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
                if !missing_root {
                    let path = error.path().unwrap_or(folder).to_path_buf();
                    discovery.skipped.push(SkippedPdf {
                        name: display_name(folder, &path),
                        path,
                        reason: error.to_string(),
                    });
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if !is_pdf {
            continue;
        }

        match document_name(folder, entry.path()) {
            Ok(name) => discovery.documents.push(PdfDocument {
                name,
                path: entry.path().to_path_buf(),
            }),
            Err(error) => discovery.skipped.push(SkippedPdf {
                name: display_name(folder, entry.path()),
                path: entry.path().to_path_buf(),
                reason: error.to_string(),
            }),
        }
    }

    discovery
        .documents
        .sort_unstable_by(|left, right| left.name.cmp(&right.name));
    discovery
        .skipped
        .sort_unstable_by(|left, right| left.path.cmp(&right.path));
    discovery
}

fn document_name(folder: &Path, path: &Path) -> Result<String, IngestError> {
    let relative = path.strip_prefix(folder).unwrap_or(path);
    let parts = relative
        .components()
        .map(|part| part.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path is not valid utf-8: {}", path.display()))
        })?;

    if parts.is_empty() {
        return Err(IngestError::MissingFileName(path.display().to_string()));
    }
    Ok(parts.join("/"))
}

fn display_name(folder: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(folder).unwrap_or(path);
    if relative.as_os_str().is_empty() {
        path.display().to_string()
    } else {
        relative.to_string_lossy().into_owned()
    }
}

/// Extracts and chunks one document. Any extraction failure fails the whole
/// document so callers can skip it.
pub fn chunk_document(
    extractor: &dyn PdfExtractor,
    document: &PdfDocument,
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let pages = extractor.extract_pages(&document.name, &document.path)?;
    Ok(pages
        .iter()
        .flat_map(|page| build_chunks(page, config))
        .collect())
}
