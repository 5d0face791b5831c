//! TOML configuration parsing and validation.
//!
//! Every section except `[db]` has defaults matching a small single-course
//! deployment: 1000-word chunks with 200 words of overlap, top-5 retrieval
//! with a 0.3 similarity floor, OpenAI embeddings and chat completions.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::store::DistanceMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub course: CourseConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_synthetic_dir")]
    pub synthetic_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            processed_dir: default_processed_dir(),
            synthetic_dir: default_synthetic_dir(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("./data/raw")
}
fn default_processed_dir() -> PathBuf {
    PathBuf::from("./data/processed")
}
fn default_synthetic_dir() -> PathBuf {
    PathBuf::from("./data/synthetic")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CourseConfig {
    /// Course title shown to the model in the tutor system prompt.
    #[serde(default = "default_course_title")]
    pub title: String,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            title: default_course_title(),
        }
    }
}

fn default_course_title() -> String {
    "Introduction to Data Structures".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Words shared by consecutive windows; must be smaller than `chunk_size`.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Results with `1 / (1 + distance)` below this are dropped.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            metric: DistanceMetric::default(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_min_similarity() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible `/v1` root or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(1536),
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            url: None,
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_chat_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all targets (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub default: String,
    /// Per-target overrides, e.g. `study_coach::ingest = "debug"`.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// A config with every default and an in-tree database path.
    ///
    /// Used by commands that can run without a config file (`coach chunk`).
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/coach.sqlite"),
            },
            paths: PathsConfig::default(),
            course: CourseConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    crate::chunk::stride(config.chunking.chunk_size, config.chunking.overlap)
        .context("invalid [chunking] section")?;

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.min_similarity) {
        bail!("retrieval.min_similarity must be in [0.0, 1.0]");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
