//! Grounded prompt construction for each tutor mode.
//!
//! Every prompt is exactly two messages: a fixed system message carrying the
//! grounding policy, then a user message with the mode's template wrapped
//! around a numbered citation block. Numbering is 1-based in retrieval
//! order, so `[Source 1]` is always the most relevant chunk.

use crate::error::Result;
use crate::generation::ChatMessage;
use crate::models::{RetrievedChunk, TutorMode};

/// The decline phrase the model is told to use when the context is silent.
pub const DECLINE_PHRASE: &str = "I don't know from the provided materials.";

/// Context block used when retrieval found nothing above the threshold.
pub const NO_CONTEXT: &str = "(no relevant context found)";

/// Render chunks as `[Source i | id=… | score=…]` blocks separated by blank lines.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "[Source {} | id={} | score={:.2}]\n{}\n",
                i + 1,
                c.source_id,
                c.score,
                c.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds chat messages for a configured course.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    course_title: String,
}

impl PromptComposer {
    pub fn new(course_title: impl Into<String>) -> Self {
        Self {
            course_title: course_title.into(),
        }
    }

    pub fn system_message(&self) -> String {
        format!(
            "You are an AI study coach for the course \"{}\".\n\
             You answer questions STRICTLY based on the provided context.\n\
             If the answer is not in the context, say \"{}\"\n\
             Be concise but clear, and show which sources you used.\n",
            self.course_title, DECLINE_PHRASE
        )
    }

    /// Compose `[system, user]` for `mode`.
    pub fn compose(
        &self,
        mode: TutorMode,
        question: &str,
        chunks: &[RetrievedChunk],
    ) -> Vec<ChatMessage> {
        let context = format_context(chunks);
        let user = match mode {
            TutorMode::Qa => qa_body(&context, question),
            TutorMode::Quiz => quiz_body(&context),
            TutorMode::ExplainSimple => explain_simple_body(&context, question),
            TutorMode::ExplainAnalogy => explain_analogy_body(&context, question),
        };
        vec![
            ChatMessage::system(self.system_message()),
            ChatMessage::user(user),
        ]
    }

    /// Like [`compose`](Self::compose) but takes the mode as a string.
    ///
    /// Unknown modes fail with `UnsupportedMode`; there is no fallback.
    pub fn compose_for(
        &self,
        mode: &str,
        question: &str,
        chunks: &[RetrievedChunk],
    ) -> Result<Vec<ChatMessage>> {
        let mode: TutorMode = mode.parse()?;
        Ok(self.compose(mode, question, chunks))
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new("Introduction to Data Structures")
    }
}

fn qa_body(context: &str, question: &str) -> String {
    format!(
        "You are helping a student answer a question.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         INSTRUCTIONS:\n\
         - ONLY use the context.\n\
         - If you cannot find the answer, say you don't know from the provided materials.\n\
         - Cite sources like [Source 1], [Source 2] when relevant.\n"
    )
}

// The quiz is drawn from whatever the question retrieved; the question
// itself is not repeated to the model.
fn quiz_body(context: &str) -> String {
    format!(
        "You are generating practice questions based on course notes.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         TASK:\n\
         Generate 5 multiple-choice questions (MCQs) based ONLY on the context.\n\
         For each question, produce JSON with:\n\
         - question (string)\n\
         - options (array of 4 strings)\n\
         - correct_index (0-3)\n\
         - explanation (string)\n\
         - source (e.g. \"Source 1\")\n\
         \n\
         Return a JSON array ONLY. No extra commentary.\n"
    )
}

fn explain_simple_body(context: &str, question: &str) -> String {
    format!(
        "You are explaining a concept to a beginner student.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         INSTRUCTIONS:\n\
         - Explain the answer like you're talking to a motivated 12-year-old.\n\
         - Use simple language and short sentences.\n\
         - Avoid jargon unless necessary and explain it when used.\n\
         - Only use the context. If you don't know, say so.\n"
    )
}

fn explain_analogy_body(context: &str, question: &str) -> String {
    format!(
        "You are explaining a concept using real-world analogies.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         INSTRUCTIONS:\n\
         - Provide a clear answer PLUS at least one concrete real-world analogy.\n\
         - Only use the context. If you don't know, say so.\n"
    )
}
