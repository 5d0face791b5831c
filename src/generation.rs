//! Chat-completion providers used to generate tutor answers.
//!
//! A [`GenerationProvider`] takes the ordered, role-tagged messages built by
//! [`crate::prompt`] and returns the model's full response text in one
//! blocking round-trip. There is no streaming and no retry; failures surface
//! as [`CoachError::GenerationProvider`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{CoachError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single role-tagged chat message, serialized in the OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

fn upstream(e: impl std::fmt::Display) -> CoachError {
    CoachError::GenerationProvider(e.to_string())
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(upstream("generation provider is disabled"))
    }
}

// ============ OpenAI ============

/// Calls `POST {url}/chat/completions`. Requires `OPENAI_API_KEY`.
pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(upstream)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(upstream(format!("OpenAI API error {}: {}", status, body_text)));
        }

        let json: serde_json::Value = response.json().await.map_err(upstream)?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| upstream("invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama ============

/// Calls `POST {url}/api/chat` with streaming disabled.
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                upstream(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(upstream(format!("Ollama API error {}: {}", status, body_text)));
        }

        let json: serde_json::Value = response.json().await.map_err(upstream)?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| upstream("invalid Ollama response: missing message.content"))
    }
}

/// Create the configured [`GenerationProvider`].
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn test_parse_openai_chat() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "A stack is LIFO."}}]
        });
        assert_eq!(parse_openai_chat(&json).unwrap(), "A stack is LIFO.");
    }

    #[test]
    fn test_parse_openai_chat_missing() {
        let err = parse_openai_chat(&serde_json::json!({"choices": []})).unwrap_err();
        assert!(matches!(err, CoachError::GenerationProvider(_)));
    }

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        let err = DisabledGenerator
            .generate(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
