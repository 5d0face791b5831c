//! Ingestion pipeline orchestration.
//!
//! Two stages, each usable on its own:
//!
//! 1. [`process_file`]: raw file → extract → normalize → chunk → chunk file
//!    `{processed_dir}/{course}_{stem}_chunks.txt`.
//! 2. [`ingest_chunk_file`]: chunk file → embed in batches → replace that
//!    document's chunks in the store.
//!
//! [`run_ingest`] runs both over every PDF under the raw directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::{chunk_document, normalize};
use crate::chunk_file::{read_chunk_file, write_chunk_file};
use crate::config::{ChunkingConfig, Config};
use crate::embedding::{self, EmbeddingProvider};
use crate::extract;
use crate::models::{Chunk, ChunkMetadata, Document, EmbeddedChunk};
use crate::store::{SqliteStore, VectorStore};

/// Counts reported after an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub files_found: usize,
    pub files_ingested: usize,
    pub files_skipped: usize,
    pub chunks_written: usize,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Extract, normalize, and chunk one raw file, writing its chunk file
/// `{processed_dir}/{document name}_chunks.txt`.
///
/// Returns the chunk file path and the number of chunks written.
pub fn process_file(
    path: &Path,
    course: &str,
    chunking: &ChunkingConfig,
    processed_dir: &Path,
) -> crate::error::Result<(PathBuf, usize)> {
    let doc = Document {
        course: course.to_string(),
        source_file: file_name(path),
        text: normalize(&extract::extract_file(path)?),
    };
    let chunks = chunk_document(&doc, chunking.chunk_size, chunking.overlap)?;
    let texts: Vec<String> = chunks.into_iter().map(|c| c.content).collect();

    let out = processed_dir.join(format!("{}_chunks.txt", doc.name()));
    write_chunk_file(&out, &texts)?;
    Ok((out, texts.len()))
}

/// Load the chunks of a chunk file, attributed to the file's name.
pub fn load_chunks(path: &Path, course: &str) -> crate::error::Result<Vec<Chunk>> {
    let source_file = file_name(path);

    Ok(read_chunk_file(path)?
        .into_iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            content,
            metadata: ChunkMetadata {
                course: course.to_string(),
                source_file: source_file.clone(),
                chunk_index: i as u32,
            },
        })
        .collect())
}

/// Embed a chunk file and replace its document's chunks in the store.
///
/// Every batch is embedded before the store is touched, and the swap itself
/// is a single [`VectorStore::replace_source`], so a failure at any point
/// leaves the previous version of the document intact.
pub async fn ingest_chunk_file(
    path: &Path,
    course: &str,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    batch_size: usize,
) -> crate::error::Result<usize> {
    let chunks = load_chunks(path, course)?;
    let source_file = file_name(path);

    let mut embedded = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        embedding::check_count(texts.len(), vectors.len())?;
        for (chunk, vector) in batch.iter().zip(vectors) {
            embedded.push(EmbeddedChunk::new(chunk.clone(), vector));
        }
    }

    let removed = store
        .replace_source(course, &source_file, &embedded)
        .await?;
    if removed > 0 {
        debug!(source_file = %source_file, removed, "replaced previous chunks");
    }
    Ok(embedded.len())
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Every raw file under `root` matching `**/*.pdf`, sorted by path.
pub fn scan_raw_dir(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("Raw directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&["**/*.pdf", "**/*.PDF"])?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Process and index every raw file under `dir` with the given providers.
///
/// Files that fail extraction are logged and skipped. Embedding and storage
/// errors abort the run.
pub async fn ingest_dir(
    config: &Config,
    course: &str,
    dir: &Path,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<IngestSummary> {
    let files = scan_raw_dir(dir)?;
    let mut summary = IngestSummary {
        files_found: files.len(),
        ..Default::default()
    };

    for path in &files {
        let (chunk_path, count) =
            match process_file(path, course, &config.chunking, &config.paths.processed_dir) {
                Ok(out) => out,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping file");
                    summary.files_skipped += 1;
                    continue;
                }
            };
        debug!(file = %path.display(), chunks = count, "chunked");

        let written = ingest_chunk_file(
            &chunk_path,
            course,
            embedder,
            store,
            config.embedding.batch_size,
        )
        .await
        .with_context(|| format!("Failed to index {}", chunk_path.display()))?;

        info!(file = %path.display(), chunks = written, "indexed");
        summary.files_ingested += 1;
        summary.chunks_written += written;
    }

    Ok(summary)
}

/// `coach ingest`: build providers from config and ingest the raw directory.
pub async fn run_ingest(config: &Config, course: &str, dir: Option<PathBuf>) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let dir = dir.unwrap_or_else(|| config.paths.raw_dir.clone());
    let embedder: Arc<dyn EmbeddingProvider> = embedding::create_provider(&config.embedding)?;
    let store = SqliteStore::open(&config.db.path, config.retrieval.metric).await?;

    info!(course, dir = %dir.display(), model = embedder.model_name(), "ingest started");
    let summary = ingest_dir(config, course, &dir, embedder.as_ref(), &store).await?;

    println!("ingest {}", course);
    println!("  files found: {}", summary.files_found);
    println!("  files ingested: {}", summary.files_ingested);
    println!("  files skipped: {}", summary.files_skipped);
    println!("  chunks written: {}", summary.chunks_written);
    println!("ok");

    store.pool().close().await;
    Ok(())
}
