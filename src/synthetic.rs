//! Synthetic exam question generation from stored chunks.
//!
//! For each of the first `max_chunks` chunks of a course, the generator is
//! asked for three question/answer pairs as JSON. Responses that are not a
//! JSON array of items are logged and skipped; provider errors abort.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::CoachError;
use crate::generation::{ChatMessage, GenerationProvider};
use crate::store::VectorStore;

pub const DEFAULT_MAX_CHUNKS: usize = 20;

/// Sampling temperature for question writing.
pub const SYNTHETIC_TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str =
    "You generate exam questions and answers strictly from provided context.";

/// One question/answer pair as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticItem {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: String,
}

/// A [`SyntheticItem`] tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticEntry {
    #[serde(flatten)]
    pub item: SyntheticItem,
    /// Id of the chunk the item was generated from.
    pub source_id: String,
    pub course: String,
}

/// The generation settings used for question writing.
pub fn generator_config(base: &GenerationConfig) -> GenerationConfig {
    GenerationConfig {
        temperature: SYNTHETIC_TEMPERATURE,
        ..base.clone()
    }
}

pub fn output_path(out_dir: &Path, course: &str) -> PathBuf {
    out_dir.join(format!("{}_synthetic_qa.json", course))
}

fn user_prompt(context: &str) -> String {
    format!(
        "You are an exam question writer.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         TASK:\n\
         Generate 3 exam-style questions and detailed answers based ONLY on the context.\n\
         \n\
         Return JSON with:\n\
         [\n  \
           {{\n    \
             \"question\": \"...\",\n    \
             \"answer\": \"...\",\n    \
             \"difficulty\": \"easy|medium|hard\"\n  \
           }},\n  \
           ...\n\
         ]\n"
    )
}

/// Strip a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````).
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model response into items.
///
/// Accepts a bare JSON array or one wrapped in a code fence.
pub fn parse_synthetic_items(content: &str) -> crate::error::Result<Vec<SyntheticItem>> {
    serde_json::from_str(strip_fence(content))
        .map_err(|e| CoachError::MalformedResponse(e.to_string()))
}

/// Generate and write synthetic Q&A for `course`. Returns the output path.
pub async fn generate_synthetic_questions(
    store: &dyn VectorStore,
    generator: &dyn GenerationProvider,
    course: &str,
    max_chunks: usize,
    out_dir: &Path,
) -> Result<PathBuf> {
    let selected: Vec<_> = store
        .get_all()
        .await?
        .into_iter()
        .filter(|c| c.metadata.course == course)
        .take(max_chunks)
        .collect();

    info!(course, chunks = selected.len(), "generating synthetic questions");

    let mut entries = Vec::new();
    for chunk in &selected {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(&chunk.content)),
        ];
        let content = generator.generate(&messages).await?;

        match parse_synthetic_items(&content) {
            Ok(items) => entries.extend(items.into_iter().map(|item| SyntheticEntry {
                item,
                source_id: chunk.id.clone(),
                course: course.to_string(),
            })),
            Err(e) => warn!(chunk = %chunk.id, error = %e, "skipping malformed response"),
        }
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = output_path(out_dir, course);
    std::fs::write(&path, serde_json::to_string_pretty(&entries)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), items = entries.len(), "synthetic questions written");
    Ok(path)
}
