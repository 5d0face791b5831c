//! HTTP API for the study coach.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check |
//! | `POST` | `/ask` | Grounded answer for `{question, mode?}` |
//! | `POST` | `/generate_synthetic` | Write synthetic Q&A for a course |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_mode` (400),
//! `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front-end
//! on another port can call the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::error::CoachError;
use crate::generation::{create_generator, GenerationProvider};
use crate::rag::Tutor;
use crate::retrieve::Retriever;
use crate::store::{SqliteStore, VectorStore};
use crate::synthetic::{self, DEFAULT_MAX_CHUNKS};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<Tutor>,
    pub store: Arc<dyn VectorStore>,
    /// Generator used for synthetic questions (separate sampling settings).
    pub question_writer: Arc<dyn GenerationProvider>,
    pub synthetic_dir: PathBuf,
}

/// Build the router. Exposed so tests can serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ask", post(handle_ask))
        .route("/generate_synthetic", post(handle_generate_synthetic))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn VectorStore> =
        Arc::new(SqliteStore::open(&config.db.path, config.retrieval.metric).await?);
    let embedder = create_provider(&config.embedding)?;
    let generator = create_generator(&config.generation)?;
    let question_writer = create_generator(&synthetic::generator_config(&config.generation))?;

    let retriever = Retriever::new(embedder, store.clone());
    let state = AppState {
        tutor: Arc::new(Tutor::from_config(config, retriever, generator)),
        store,
        question_writer,
        synthetic_dir: config.paths.synthetic_dir.clone(),
    };

    let bind_addr = config.server.bind.clone();
    info!(bind = %bind_addr, "server starting");
    println!("Study coach API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<CoachError> for AppError {
    fn from(err: CoachError) -> Self {
        match &err {
            CoachError::UnsupportedMode(_) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "unsupported_mode",
                message: err.to_string(),
            },
            e if e.is_upstream() => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error",
                message: err.to_string(),
            },
            _ => internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CoachError>() {
            Ok(coach) => coach.into(),
            Err(other) => internal(format!("{:#}", other)),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "qa".to_string()
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    used_sources: Vec<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = state
        .tutor
        .answer_str(&req.question, &req.mode)
        .await
        .map_err(|e| {
            warn!(mode = %req.mode, error = %e, "ask failed");
            AppError::from(e)
        })?;

    Ok(Json(AskResponse {
        used_sources: answer.source_ids(),
        answer: answer.text,
    }))
}

// ============ POST /generate_synthetic ============

#[derive(Deserialize)]
struct SyntheticRequest {
    course_name: String,
    #[serde(default = "default_max_chunks")]
    max_chunks: usize,
}

fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}

#[derive(Serialize)]
struct SyntheticResponse {
    file_path: String,
}

async fn handle_generate_synthetic(
    State(state): State<AppState>,
    Json(req): Json<SyntheticRequest>,
) -> Result<Json<SyntheticResponse>, AppError> {
    if req.course_name.trim().is_empty() {
        return Err(bad_request("course_name must not be empty"));
    }

    let path = synthetic::generate_synthetic_questions(
        state.store.as_ref(),
        state.question_writer.as_ref(),
        &req.course_name,
        req.max_chunks,
        &state.synthetic_dir,
    )
    .await?;

    Ok(Json(SyntheticResponse {
        file_path: path.display().to_string(),
    }))
}
