//! Similarity retrieval over the vector store.
//!
//! A [`Retriever`] embeds the query once, asks the store for the `k`
//! nearest chunks, converts each distance to a similarity score with
//! `1 / (1 + distance)`, and drops everything below the threshold. Order
//! is the store's ascending-distance order.

use std::sync::Arc;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{CoachError, Result};
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

/// Map a non-negative distance to a similarity in `(0, 1]`.
///
/// Negative inputs (which a well-behaved store never produces) are clamped
/// to zero so the score never exceeds `1.0`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Query-time view over an embedding provider and a store.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return up to `k` chunks with similarity `>= min_similarity`.
    ///
    /// An empty result is a normal outcome. A blank query is embedded like
    /// any other text; `k == 0` returns immediately without embedding.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        min_similarity: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(CoachError::InvalidConfiguration(format!(
                "min_similarity must be in [0.0, 1.0], got {}",
                min_similarity
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        let hits = self.store.query(&query_vec, k).await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let score = similarity_from_distance(hit.distance);
                (score >= min_similarity).then(|| RetrievedChunk {
                    source_id: hit.metadata.source_id(),
                    content: hit.content,
                    score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, EmbeddedChunk};
    use crate::store::{DistanceMetric, InMemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Projects text onto fixed axes; counts calls.
    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl AxisEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "origin" => vec![0.0, 0.0],
                    "far" => vec![100.0, 0.0],
                    _ => vec![0.0, 0.0],
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(CoachError::EmbeddingProvider("rate limited".to_string()))
        }
    }

    fn embedded(index: u32, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        let metadata = ChunkMetadata {
            course: "ds".to_string(),
            source_file: "ds_trees_chunks.txt".to_string(),
            chunk_index: index,
        };
        EmbeddedChunk {
            id: metadata.chunk_id(),
            content: text.to_string(),
            metadata,
            embedding,
        }
    }

    /// Distances from the origin under L2: 0, 1, 3, 9.
    async fn populated_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new(DistanceMetric::L2));
        store
            .upsert(&[
                embedded(0, "d9", vec![9.0, 0.0]),
                embedded(1, "d0", vec![0.0, 0.0]),
                embedded(2, "d3", vec![3.0, 0.0]),
                embedded(3, "d1", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_similarity_from_distance() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.5);
        assert_eq!(similarity_from_distance(-0.5), 1.0);
        assert!(similarity_from_distance(1e6) > 0.0);
    }

    #[tokio::test]
    async fn test_threshold_and_order() {
        let retriever = Retriever::new(Arc::new(AxisEmbedder::new()), populated_store().await);

        // Scores: 1.0, 0.5, 0.25, 0.1
        let chunks = retriever.retrieve("origin", 5, 0.3).await.unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["d0", "d1"]);
        assert_eq!(chunks[0].score, 1.0);
        assert_eq!(chunks[1].score, 0.5);
        assert_eq!(chunks[0].source_id, "ds_trees_chunks.txt#1");
        assert!(chunks.iter().all(|c| c.score >= 0.3));
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let retriever = Retriever::new(Arc::new(AxisEmbedder::new()), populated_store().await);
        let chunks = retriever.retrieve("origin", 3, 0.0).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_nothing_relevant_is_empty() {
        let retriever = Retriever::new(Arc::new(AxisEmbedder::new()), populated_store().await);
        let chunks = retriever.retrieve("far", 5, 0.3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let retriever = Retriever::new(
            Arc::new(AxisEmbedder::new()),
            Arc::new(InMemoryStore::default()),
        );
        assert!(retriever.retrieve("origin", 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_k_skips_embedding() {
        let embedder = Arc::new(AxisEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), populated_store().await);
        assert!(retriever.retrieve("origin", 0, 0.0).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_query_still_embeds() {
        let embedder = Arc::new(AxisEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), populated_store().await);
        retriever.retrieve("   ", 2, 0.0).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let retriever = Retriever::new(Arc::new(FailingEmbedder), populated_store().await);
        let err = retriever.retrieve("origin", 5, 0.3).await.unwrap_err();
        assert!(matches!(err, CoachError::EmbeddingProvider(_)));
    }

    #[tokio::test]
    async fn test_invalid_threshold() {
        let retriever = Retriever::new(Arc::new(AxisEmbedder::new()), populated_store().await);
        let err = retriever.retrieve("origin", 5, 1.5).await.unwrap_err();
        assert!(matches!(err, CoachError::InvalidConfiguration(_)));
    }
}
