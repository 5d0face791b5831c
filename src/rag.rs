//! Retrieve → compose → generate.
//!
//! [`Tutor`] is the single entry point the boundary layers (CLI, HTTP)
//! call. One `answer` performs one embedding call and one generation call;
//! the chunks shown to the model are exactly the chunks returned.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::generation::GenerationProvider;
use crate::models::{RetrievedChunk, TutorMode};
use crate::prompt::PromptComposer;
use crate::retrieve::Retriever;

/// A generated answer together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub used_chunks: Vec<RetrievedChunk>,
}

impl Answer {
    /// Citation keys in prompt order (`[Source 1]` first).
    pub fn source_ids(&self) -> Vec<String> {
        self.used_chunks.iter().map(|c| c.source_id.clone()).collect()
    }
}

pub struct Tutor {
    retriever: Retriever,
    composer: PromptComposer,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    min_similarity: f32,
}

impl Tutor {
    pub fn new(
        retriever: Retriever,
        composer: PromptComposer,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        min_similarity: f32,
    ) -> Self {
        Self {
            retriever,
            composer,
            generator,
            top_k,
            min_similarity,
        }
    }

    /// Wire a tutor from config with already-constructed providers.
    pub fn from_config(
        config: &Config,
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self::new(
            retriever,
            PromptComposer::new(config.course.title.clone()),
            generator,
            config.retrieval.top_k,
            config.retrieval.min_similarity,
        )
    }

    /// Answer `question` in `mode`, grounded on retrieved course material.
    ///
    /// When nothing clears the similarity threshold the model is still
    /// called, with an empty context that tells it to decline.
    pub async fn answer(&self, question: &str, mode: TutorMode) -> Result<Answer> {
        let chunks = self
            .retriever
            .retrieve(question, self.top_k, self.min_similarity)
            .await?;

        let messages = self.composer.compose(mode, question, &chunks);
        let text = self.generator.generate(&messages).await?;

        Ok(Answer {
            text,
            used_chunks: chunks,
        })
    }

    /// [`answer`](Self::answer) with the mode given as a string.
    pub async fn answer_str(&self, question: &str, mode: &str) -> Result<Answer> {
        let mode: TutorMode = mode.parse()?;
        self.answer(question, mode).await
    }
}
