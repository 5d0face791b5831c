//! Core data models used throughout the study coach.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the ingestion and grounding pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoachError;

/// Raw extracted text of one course file, before chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// Course label supplied at ingestion (e.g. `"intro_data_structures"`).
    pub course: String,
    /// File name the chunks are attributed to.
    pub source_file: String,
    /// Normalized body text.
    pub text: String,
}

impl Document {
    /// Stable document name: `{course}_{source_stem}`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.course, file_stem(&self.source_file))
    }
}

/// Typed chunk metadata. Identity within the store is the full tuple;
/// field order gives the `(course, source_file, chunk_index)` ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course: String,
    pub source_file: String,
    pub chunk_index: u32,
}

impl ChunkMetadata {
    /// Display id: `{course}_{source_stem}_chunk_{chunk_index}`.
    ///
    /// Not unique when labels contain `_`; stores key on the metadata tuple.
    pub fn chunk_id(&self) -> String {
        format!(
            "{}_{}_chunk_{}",
            self.course,
            file_stem(&self.source_file),
            self.chunk_index
        )
    }

    /// Human-readable citation key: `{source_file}#{chunk_index}`.
    pub fn source_id(&self) -> String {
        format!("{}#{}", self.source_file, self.chunk_index)
    }
}

/// A contiguous window of words drawn from a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn id(&self) -> String {
        self.metadata.chunk_id()
    }
}

/// A [`Chunk`] together with its embedding vector, ready for the store.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            content: chunk.content,
            metadata: chunk.metadata,
            embedding,
        }
    }
}

/// A stored chunk without its vector, as returned by `get_all`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// One nearest-neighbour result from the store.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Non-negative distance; smaller is closer.
    pub distance: f32,
}

/// Read-only projection of a hit, scoped to a single retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub source_id: String,
    /// Similarity in `(0, 1]`; higher is more relevant.
    pub score: f32,
}

/// Interaction style selecting the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TutorMode {
    #[default]
    Qa,
    Quiz,
    ExplainSimple,
    ExplainAnalogy,
}

impl TutorMode {
    pub const ALL: [TutorMode; 4] = [
        TutorMode::Qa,
        TutorMode::Quiz,
        TutorMode::ExplainSimple,
        TutorMode::ExplainAnalogy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TutorMode::Qa => "qa",
            TutorMode::Quiz => "quiz",
            TutorMode::ExplainSimple => "explain_simple",
            TutorMode::ExplainAnalogy => "explain_analogy",
        }
    }
}

impl fmt::Display for TutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TutorMode {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(TutorMode::Qa),
            "quiz" => Ok(TutorMode::Quiz),
            "explain_simple" => Ok(TutorMode::ExplainSimple),
            "explain_analogy" => Ok(TutorMode::ExplainAnalogy),
            other => Err(CoachError::UnsupportedMode(other.to_string())),
        }
    }
}

/// File stem of a name like `notes_chunks.txt`, falling back to the whole name.
pub fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}
