//! # Study Coach
//!
//! A retrieval-augmented tutoring assistant: answers questions about a
//! course strictly from its own material, and says so when the material
//! is silent.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────────┐
//! │ PDF / txt │──▶│ Chunk + Embed│──▶│ VectorStore   │
//! │  (raw)    │   │  (ingest)    │   │ SQLite / mem  │
//! └───────────┘   └──────────────┘   └──────┬───────┘
//!                                           │ query
//!                 ┌──────────────┐   ┌──────▼───────┐
//!   question ───▶ │    Tutor     │◀──│  Retriever    │
//!                 │ compose+gen  │   └──────────────┘
//!                 └──────┬───────┘
//!                        ▼
//!               answer + source ids ──▶ CLI (`coach`) / HTTP
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chunk`] | Whitespace normalization and overlapping word windows |
//! | [`chunk_file`] | On-disk chunk file format |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite pool (WAL) |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`error`] | Typed error taxonomy |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`generation`] | Chat-completion provider abstraction |
//! | [`ingest`] | File → chunk file → index pipeline |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`migrate`] | Schema creation |
//! | [`models`] | Core data types |
//! | [`prompt`] | Grounded prompt templates per tutor mode |
//! | [`rag`] | Retrieve → compose → generate |
//! | [`retrieve`] | Similarity retrieval with threshold |
//! | [`server`] | HTTP API |
//! | [`stats`] | `coach stats` report |
//! | [`store`] | Vector index (SQLite and in-memory) |
//! | [`synthetic`] | Synthetic exam Q&A generation |

pub mod chunk;
pub mod chunk_file;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod retrieve;
pub mod server;
pub mod stats;
pub mod store;
pub mod synthetic;
