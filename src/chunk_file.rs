//! Plain-text chunk file interchange between chunking and ingestion.
//!
//! Each chunk is written as a delimiter line `---chunk-<i>---` followed by
//! the chunk text. The index in the delimiter is advisory only: when
//! reading, a chunk's index is its position among the non-empty chunks.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;

const DELIMITER_PREFIX: &str = "---chunk-";

/// Render chunks in the interchange format.
pub fn render_chunks(chunks: &[String]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out, "{}{}---", DELIMITER_PREFIX, i);
        let _ = writeln!(out, "{}", chunk);
    }
    out
}

/// Parse the interchange format back into ordered chunk texts.
///
/// Lines between delimiters are trimmed and joined with single spaces.
/// Empty chunks are dropped, so the returned position is the chunk index.
pub fn parse_chunks(contents: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in contents.lines() {
        if line.starts_with(DELIMITER_PREFIX) {
            flush(&mut current, &mut chunks);
        } else {
            current.push(line.trim());
        }
    }
    flush(&mut current, &mut chunks);

    chunks
}

fn flush(lines: &mut Vec<&str>, chunks: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let content = lines.join(" ").trim().to_string();
    if !content.is_empty() {
        chunks.push(content);
    }
    lines.clear();
}

/// Write chunks to `path`, creating parent directories.
pub fn write_chunk_file(path: &Path, chunks: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_chunks(chunks))?;
    Ok(())
}

/// Read and parse a chunk file.
pub fn read_chunk_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_chunks(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_format() {
        let rendered = render_chunks(&["a b".to_string(), "c".to_string()]);
        assert_eq!(rendered, "---chunk-0---\na b\n---chunk-1---\nc\n");
    }

    #[test]
    fn test_parse_rendered() {
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        assert_eq!(parse_chunks(&render_chunks(&chunks)), chunks);
    }

    #[test]
    fn test_parse_skips_empty_and_ignores_delimiter_index() {
        let contents = "---chunk-7---\nalpha\n  beta  \n---chunk-2---\n\n   \n---chunk-9---\ngamma\n";
        let chunks = parse_chunks(contents);
        assert_eq!(chunks, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_parse_text_before_first_delimiter() {
        let chunks = parse_chunks("preamble\n---chunk-0---\nbody");
        assert_eq!(chunks, vec!["preamble", "body"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_chunks("").is_empty());
        assert!(parse_chunks("---chunk-0---\n").is_empty());
    }

    #[test]
    fn test_file_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("c.txt");
        let chunks = vec!["one two".to_string(), "three".to_string()];
        write_chunk_file(&path, &chunks).unwrap();
        assert_eq!(read_chunk_file(&path).unwrap(), chunks);
    }
}
