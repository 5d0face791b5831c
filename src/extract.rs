//! Text extraction for raw course files.
//!
//! PDFs go through `pdf-extract`; `.txt` and `.md` files are read as UTF-8.
//! Extraction never panics: a file that cannot be read returns
//! [`CoachError::Extraction`] and the ingestion loop skips it.

use std::path::Path;

use crate::error::{CoachError, Result};

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Extract plain text from the file at `path`, dispatching on its extension.
pub fn extract_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    match extension(path).as_deref() {
        Some("pdf") => extract_pdf(&bytes),
        Some("txt") | Some("md") => String::from_utf8(bytes)
            .map_err(|e| CoachError::Extraction(format!("{}: {}", path.display(), e))),
        _ => Err(CoachError::Extraction(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

/// Extract the text layer of a PDF held in memory.
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| CoachError::Extraction(format!("PDF extraction failed: {}", e)))
}
