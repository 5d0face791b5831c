//! Vector index abstraction.
//!
//! The [`VectorStore`] trait is the only owner of persisted
//! [`EmbeddedChunk`]s. Retrieval holds nothing but transient projections of
//! what [`VectorStore::query`] returns.
//!
//! Two backends are provided:
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | SQLite (WAL, pooled) | [`sqlite`] | Durable deployments, concurrent readers |
//! | In-memory (`RwLock`) | [`memory`] | Tests and ephemeral sessions |
//!
//! Both brute-force the nearest neighbours over all stored vectors, which is
//! adequate for a single course collection.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CoachError, Result};
use crate::models::{ChunkHit, EmbeddedChunk, StoredChunk};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Distance used for nearest-neighbour ordering. Both metrics are `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `[0, 2]`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0),
            DistanceMetric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-magnitude operand.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Durable chunk storage with nearest-neighbour query.
///
/// Implementations must be safe for concurrent `query` calls. Writes
/// (`upsert`, `delete_source`) are maintenance operations and need no
/// isolation from readers.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert or overwrite chunks by `(course, source_file, chunk_index)` |
/// | [`query`](VectorStore::query) | `k` nearest chunks, closest first |
/// | [`get_all`](VectorStore::get_all) | Every stored chunk without vectors |
/// | [`delete_source`](VectorStore::delete_source) | Drop one document's chunks |
/// | [`replace_source`](VectorStore::replace_source) | Swap one document's chunks atomically |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunks keyed by their metadata tuple.
    ///
    /// The whole batch is validated before anything is written. The first
    /// vector ever stored fixes the index dimensionality; any later vector
    /// of a different length fails with
    /// [`CoachError::EmbeddingDimensionMismatch`].
    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()>;

    /// Return up to `k` chunks ordered by ascending distance.
    ///
    /// An empty store yields an empty vector, never an error.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkHit>>;

    /// All stored chunks, ordered by `(course, source_file, chunk_index)`.
    async fn get_all(&self) -> Result<Vec<StoredChunk>>;

    /// Remove every chunk of one document. Returns the number removed.
    async fn delete_source(&self, course: &str, source_file: &str) -> Result<u64>;

    /// Replace every chunk of one document with `chunks` in one step.
    ///
    /// `chunks` is validated against the dimensionality fixed by the rest of
    /// the index (if the document is the only one, the batch may establish a
    /// new one). On error the old chunks are left in place. Returns the
    /// number of chunks removed.
    async fn replace_source(
        &self,
        course: &str,
        source_file: &str,
        chunks: &[EmbeddedChunk],
    ) -> Result<u64>;

    async fn count(&self) -> Result<usize>;

    /// Established dimensionality, or `None` while the store is empty.
    async fn dims(&self) -> Result<Option<usize>>;
}

/// Validate a batch against the established dimensionality.
///
/// Returns the dimensionality the index has after the batch is applied.
pub(crate) fn check_batch_dims(
    established: Option<usize>,
    chunks: &[EmbeddedChunk],
) -> Result<Option<usize>> {
    let mut expected = established;
    for chunk in chunks {
        let actual = chunk.embedding.len();
        match expected {
            Some(dims) if dims != actual => {
                return Err(CoachError::EmbeddingDimensionMismatch {
                    expected: dims,
                    actual,
                });
            }
            Some(_) => {}
            None => expected = Some(actual),
        }
    }
    Ok(expected)
}

/// Validate a query vector against the established dimensionality.
pub(crate) fn check_query_dims(established: Option<usize>, embedding: &[f32]) -> Result<()> {
    match established {
        Some(dims) if dims != embedding.len() => Err(CoachError::EmbeddingDimensionMismatch {
            expected: dims,
            actual: embedding.len(),
        }),
        _ => Ok(()),
    }
}

/// Sort hits closest first (ties broken by metadata tuple) and keep `k`.
pub(crate) fn rank_hits(mut hits: Vec<ChunkHit>, k: usize) -> Vec<ChunkHit> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.metadata.cmp(&b.metadata))
    });
    hits.truncate(k);
    hits
}
