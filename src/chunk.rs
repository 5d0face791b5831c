//! Whitespace normalizer and sliding-window word chunker.
//!
//! Splits normalized document text into overlapping windows of
//! `chunk_size` words. Consecutive windows start `chunk_size - overlap`
//! words apart, so every adjacent pair shares `overlap` words and an answer
//! spanning a window boundary is still retrievable from one chunk.
//!
//! # Algorithm
//!
//! 1. Split text on whitespace into words.
//! 2. Emit `words[start..start + chunk_size]` joined by single spaces.
//! 3. Advance `start` by the stride `chunk_size - overlap`.
//! 4. Stop once `start` reaches or passes the word count.
//!
//! The last window may be shorter than `chunk_size`; it is never padded.
//!
//! # Example
//!
//! ```rust
//! use study_coach::chunk::{chunk_text, normalize};
//!
//! let text = normalize("one  two\nthree four\r\nfive");
//! let chunks = chunk_text(&text, 3, 1).unwrap();
//! assert_eq!(chunks, vec!["one two three", "three four five", "five"]);
//! ```

use crate::error::{CoachError, Result};
use crate::models::{Chunk, ChunkMetadata, Document};

/// Collapse every whitespace run (including `\r`) to one space and trim.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check `0 <= overlap < chunk_size` and return the window stride.
pub fn stride(chunk_size: usize, overlap: usize) -> Result<usize> {
    if chunk_size == 0 {
        return Err(CoachError::InvalidConfiguration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(CoachError::InvalidConfiguration(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(chunk_size - overlap)
}

/// Split text into overlapping word windows.
///
/// Returns zero chunks for empty (or all-whitespace) text and exactly one
/// chunk when the text has fewer than `chunk_size` words.
///
/// # Errors
///
/// [`CoachError::InvalidConfiguration`] when `overlap >= chunk_size` or
/// `chunk_size == 0`; such a stride would never advance.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let step = stride(chunk_size, overlap)?;
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    Ok(chunks)
}

/// Chunk a [`Document`] and attach typed metadata with contiguous indices.
pub fn chunk_document(doc: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let windows = chunk_text(&doc.text, chunk_size, overlap)?;
    Ok(windows
        .into_iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            content,
            metadata: ChunkMetadata {
                course: doc.course.clone(),
                source_file: doc.source_file.clone(),
                chunk_index: i as u32,
            },
        })
        .collect())
}
