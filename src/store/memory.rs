//! In-memory [`VectorStore`] implementation for tests and ephemeral sessions.
//!
//! Chunks live in a `BTreeMap` keyed by [`ChunkMetadata`] behind
//! `std::sync::RwLock`, so concurrent queries share a read lock and
//! iteration is already in `get_all` order. Vector search is brute force
//! over all stored vectors.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkHit, ChunkMetadata, EmbeddedChunk, StoredChunk};

use super::{check_batch_dims, check_query_dims, rank_hits, DistanceMetric, VectorStore};

#[derive(Default)]
struct State {
    dims: Option<usize>,
    chunks: BTreeMap<ChunkMetadata, EmbeddedChunk>,
}

impl State {
    fn remove_source(&mut self, course: &str, source_file: &str) -> u64 {
        let before = self.chunks.len();
        self.chunks
            .retain(|m, _| !(m.course == course && m.source_file == source_file));
        (before - self.chunks.len()) as u64
    }
}

/// In-memory store keyed by chunk metadata.
pub struct InMemoryStore {
    metric: DistanceMetric,
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            state: RwLock::new(State::default()),
        }
    }

    // A panic while holding the lock cannot leave `State` half-written
    // (every mutation is a single insert/retain), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut state = self.write();
        let dims = check_batch_dims(state.dims, chunks)?;
        state.dims = dims;
        for chunk in chunks {
            state.chunks.insert(chunk.metadata.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        let state = self.read();
        if state.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        check_query_dims(state.dims, embedding)?;

        let hits = state
            .chunks
            .values()
            .map(|c| ChunkHit {
                id: c.id.clone(),
                content: c.content.clone(),
                metadata: c.metadata.clone(),
                distance: self.metric.distance(embedding, &c.embedding),
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn get_all(&self) -> Result<Vec<StoredChunk>> {
        Ok(self
            .read()
            .chunks
            .values()
            .map(|c| StoredChunk {
                id: c.id.clone(),
                content: c.content.clone(),
                metadata: c.metadata.clone(),
            })
            .collect())
    }

    async fn delete_source(&self, course: &str, source_file: &str) -> Result<u64> {
        let mut state = self.write();
        let removed = state.remove_source(course, source_file);
        if state.chunks.is_empty() {
            state.dims = None;
        }
        Ok(removed)
    }

    async fn replace_source(
        &self,
        course: &str,
        source_file: &str,
        chunks: &[EmbeddedChunk],
    ) -> Result<u64> {
        let mut state = self.write();
        let others = state
            .chunks
            .keys()
            .any(|m| !(m.course == course && m.source_file == source_file));
        let dims = check_batch_dims(if others { state.dims } else { None }, chunks)?;

        let removed = state.remove_source(course, source_file);
        for chunk in chunks {
            state.chunks.insert(chunk.metadata.clone(), chunk.clone());
        }
        state.dims = if state.chunks.is_empty() { None } else { dims };
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read().chunks.len())
    }

    async fn dims(&self) -> Result<Option<usize>> {
        Ok(self.read().dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;
    use crate::models::ChunkMetadata;

    fn embedded(source_file: &str, index: u32, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        let metadata = ChunkMetadata {
            course: "ds".to_string(),
            source_file: source_file.to_string(),
            chunk_index: index,
        };
        EmbeddedChunk {
            id: metadata.chunk_id(),
            content: text.to_string(),
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_empty_store_query() {
        let store = InMemoryStore::default();
        assert!(store.query(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert_eq!(store.dims().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = InMemoryStore::new(DistanceMetric::L2);
        store
            .upsert(&[
                embedded("a.txt", 0, "far", vec![10.0, 0.0]),
                embedded("a.txt", 1, "near", vec![1.0, 0.0]),
                embedded("a.txt", 2, "mid", vec![4.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[0.0, 0.0], 2).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid"]);
        assert!(hits[0].distance <= hits[1].distance);

        let all = store.query(&[0.0, 0.0], 10).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = InMemoryStore::default();
        store
            .upsert(&[embedded("a.txt", 0, "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(&[embedded("a.txt", 0, "new", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_all().await.unwrap()[0].content, "new");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_writes_nothing() {
        let store = InMemoryStore::default();
        store
            .upsert(&[embedded("a.txt", 0, "x", vec![1.0, 0.0])])
            .await
            .unwrap();
        let err = store
            .upsert(&[
                embedded("a.txt", 1, "ok", vec![1.0, 1.0]),
                embedded("a.txt", 2, "bad", vec![1.0, 1.0, 1.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EmbeddingDimensionMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 1);

        let err = store.query(&[1.0, 2.0, 3.0], 1).await.unwrap_err();
        assert!(matches!(err, CoachError::EmbeddingDimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_colliding_display_ids_are_distinct_chunks() {
        let a = EmbeddedChunk::new(
            crate::models::Chunk {
                content: "course a".to_string(),
                metadata: ChunkMetadata {
                    course: "a".to_string(),
                    source_file: "a_a_x.txt".to_string(),
                    chunk_index: 0,
                },
            },
            vec![1.0, 0.0],
        );
        let b = EmbeddedChunk::new(
            crate::models::Chunk {
                content: "course a_a".to_string(),
                metadata: ChunkMetadata {
                    course: "a_a".to_string(),
                    source_file: "x.txt".to_string(),
                    chunk_index: 0,
                },
            },
            vec![0.0, 1.0],
        );
        assert_eq!(a.id, b.id);

        let store = InMemoryStore::default();
        store.upsert(&[a, b]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        let contents: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["course a", "course a_a"]);
    }

    #[tokio::test]
    async fn test_replace_source_mismatch_keeps_old_chunks() {
        let store = InMemoryStore::default();
        store
            .upsert(&[
                embedded("a.txt", 0, "a0", vec![1.0, 0.0]),
                embedded("a.txt", 1, "a1", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let err = store
            .replace_source(
                "ds",
                "a.txt",
                &[
                    embedded("a.txt", 0, "new0", vec![1.0, 0.0]),
                    embedded("a.txt", 1, "new1", vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EmbeddingDimensionMismatch { .. }));

        let contents: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["a0", "a1"]);
        assert_eq!(store.dims().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_replace_source() {
        let store = InMemoryStore::default();
        store
            .upsert(&[
                embedded("a.txt", 0, "a0", vec![1.0, 0.0]),
                embedded("a.txt", 1, "a1", vec![1.0, 0.0]),
                embedded("b.txt", 0, "b0", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .replace_source("ds", "a.txt", &[embedded("a.txt", 0, "a0'", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        // Another document holds the index at 2 dims.
        let err = store
            .replace_source("ds", "a.txt", &[embedded("a.txt", 0, "wide", vec![1.0; 3])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoachError::EmbeddingDimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        // Once it is the only document, it may re-establish the dimensionality.
        store.delete_source("ds", "b.txt").await.unwrap();
        store
            .replace_source("ds", "a.txt", &[embedded("a.txt", 0, "wide", vec![1.0; 3])])
            .await
            .unwrap();
        assert_eq!(store.dims().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_get_all_and_delete_source() {
        let store = InMemoryStore::default();
        store
            .upsert(&[
                embedded("b.txt", 1, "b1", vec![1.0]),
                embedded("a.txt", 0, "a0", vec![1.0]),
                embedded("b.txt", 0, "b0", vec![1.0]),
            ])
            .await
            .unwrap();
        let all: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(all, vec!["a0", "b0", "b1"]);

        assert_eq!(store.delete_source("ds", "b.txt").await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
