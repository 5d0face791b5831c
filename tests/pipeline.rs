//! End-to-end pipeline tests with in-process providers: raw text → chunk
//! file → SQLite index → grounded answer.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use study_coach::config::ChunkingConfig;
use study_coach::embedding::EmbeddingProvider;
use study_coach::error::{CoachError, Result};
use study_coach::generation::{ChatMessage, GenerationProvider};
use study_coach::ingest::{ingest_chunk_file, process_file};
use study_coach::models::TutorMode;
use study_coach::prompt::PromptComposer;
use study_coach::rag::Tutor;
use study_coach::retrieve::Retriever;
use study_coach::store::{DistanceMetric, InMemoryStore, SqliteStore, VectorStore};

const TOPICS: [&str; 3] = ["stack", "queue", "tree"];

/// One axis per topic word; a text's vector counts topic mentions.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn model_name(&self) -> &str {
        "topic"
    }
    fn dims(&self) -> usize {
        TOPICS.len()
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                TOPICS
                    .iter()
                    .map(|topic| lower.matches(topic).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Answers with the first context line and records every prompt.
#[derive(Default)]
struct EchoGenerator {
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok("Based on [Source 1].".to_string())
    }
}

fn write_course(dir: &std::path::Path) {
    fs::write(
        dir.join("stacks.txt"),
        "A stack is a last in first out structure. Push adds to the stack and pop \
         removes from the stack.",
    )
    .unwrap();
    fs::write(
        dir.join("queues.txt"),
        "A queue is a first in first out structure. Enqueue adds to the queue \
         and dequeue removes from the queue.",
    )
    .unwrap();
}

async fn build_index(tmp: &TempDir, store: &dyn VectorStore) -> Vec<String> {
    let raw = tmp.path().join("raw");
    let processed = tmp.path().join("processed");
    fs::create_dir_all(&raw).unwrap();
    write_course(&raw);

    let chunking = ChunkingConfig {
        chunk_size: 50,
        overlap: 10,
    };
    let mut files = Vec::new();
    for name in ["stacks.txt", "queues.txt"] {
        let (chunk_path, _) = process_file(&raw.join(name), "ds", &chunking, &processed).unwrap();
        ingest_chunk_file(&chunk_path, "ds", &TopicEmbedder, store, 16)
            .await
            .unwrap();
        files.push(chunk_path.file_name().unwrap().to_string_lossy().to_string());
    }
    files
}

fn tutor(store: Arc<dyn VectorStore>, generator: Arc<dyn GenerationProvider>) -> Tutor {
    Tutor::new(
        Retriever::new(Arc::new(TopicEmbedder), store),
        PromptComposer::new("Introduction to Data Structures"),
        generator,
        5,
        // Orthogonal topics score exactly 0.5.
        0.6,
    )
}

#[tokio::test]
async fn test_sqlite_pipeline_answers_with_citations() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(
        SqliteStore::open(&tmp.path().join("coach.sqlite"), DistanceMetric::Cosine)
            .await
            .unwrap(),
    );
    let files = build_index(&tmp, store.as_ref()).await;
    assert_eq!(files, vec!["ds_stacks_chunks.txt", "ds_queues_chunks.txt"]);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.dims().await.unwrap(), Some(3));

    let generator = Arc::new(EchoGenerator::default());
    let tutor = tutor(store.clone(), generator.clone());

    let answer = tutor
        .answer("How does a stack work?", TutorMode::Qa)
        .await
        .unwrap();
    assert_eq!(answer.text, "Based on [Source 1].");
    assert_eq!(answer.source_ids(), vec!["ds_stacks_chunks.txt#0"]);
    assert!(answer.used_chunks[0].score > 0.9);

    let prompts = generator.prompts.lock().unwrap();
    let user = &prompts[0][1].content;
    assert!(user.contains("[Source 1 | id=ds_stacks_chunks.txt#0 | score=1.00]"));
    assert!(user.contains("Push adds to the stack"));
    assert!(!user.contains("Enqueue"));
}

#[tokio::test]
async fn test_unrelated_question_gets_empty_context() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryStore::new(DistanceMetric::Cosine));
    build_index(&tmp, store.as_ref()).await;

    let generator = Arc::new(EchoGenerator::default());
    let tutor = tutor(store, generator.clone());

    let answer = tutor
        .answer("Explain hash maps", TutorMode::ExplainSimple)
        .await
        .unwrap();
    assert!(answer.used_chunks.is_empty());

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0][1].content.contains("(no relevant context found)"));
    assert!(prompts[0][0]
        .content
        .contains("I don't know from the provided materials."));
}

#[tokio::test]
async fn test_reingestion_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&tmp.path().join("coach.sqlite"), DistanceMetric::L2)
        .await
        .unwrap();

    build_index(&tmp, &store).await;
    let first: Vec<String> = store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    build_index(&tmp, &store).await;
    let second: Vec<String> = store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec!["ds_ds_queues_chunks_chunk_0", "ds_ds_stacks_chunks_chunk_0"]
    );
}

#[tokio::test]
async fn test_concurrent_answers_share_store() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(
        SqliteStore::open(&tmp.path().join("coach.sqlite"), DistanceMetric::Cosine)
            .await
            .unwrap(),
    );
    build_index(&tmp, store.as_ref()).await;

    let tutor = Arc::new(tutor(store, Arc::new(EchoGenerator::default())));
    let (a, b) = tokio::join!(
        tutor.answer("stack?", TutorMode::Qa),
        tutor.answer("queue?", TutorMode::Quiz)
    );
    assert_eq!(a.unwrap().source_ids(), vec!["ds_stacks_chunks.txt#0"]);
    assert_eq!(b.unwrap().source_ids(), vec!["ds_queues_chunks.txt#0"]);
}

#[tokio::test]
async fn test_embedding_dimension_change_aborts_ingestion() {
    struct WideEmbedder;

    #[async_trait]
    impl EmbeddingProvider for WideEmbedder {
        fn model_name(&self) -> &str {
            "wide"
        }
        fn dims(&self) -> usize {
            8
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 8]).collect())
        }
    }

    let tmp = TempDir::new().unwrap();
    let store = InMemoryStore::default();
    let files = build_index(&tmp, &store).await;

    let chunk_path = tmp.path().join("processed").join(&files[0]);
    let err = ingest_chunk_file(&chunk_path, "ds", &WideEmbedder, &store, 16)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoachError::EmbeddingDimensionMismatch {
            expected: 3,
            actual: 8
        }
    ));
}
