//! # Study Coach CLI (`coach`)
//!
//! ## Usage
//!
//! ```bash
//! coach --config ./config/coach.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coach init` | Create the SQLite database and schema |
//! | `coach chunk <file> --course <c>` | Extract and chunk one file into a chunk file |
//! | `coach ingest --course <c>` | Chunk, embed, and index every PDF in the raw directory |
//! | `coach ask "<question>"` | Answer a question from the indexed course material |
//! | `coach synthetic --course <c>` | Generate synthetic exam Q&A from indexed chunks |
//! | `coach stats` | Show index statistics |
//! | `coach serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! coach init
//! coach ingest --course intro_ds
//! coach ask "What is the difference between a stack and a queue?" --mode explain_analogy
//! coach serve
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use study_coach::config::{self, Config};
use study_coach::embedding::create_provider;
use study_coach::generation::create_generator;
use study_coach::models::TutorMode;
use study_coach::rag::Tutor;
use study_coach::retrieve::Retriever;
use study_coach::store::{SqliteStore, VectorStore};
use study_coach::synthetic::{self, DEFAULT_MAX_CHUNKS};
use study_coach::{ingest, logging, migrate, server, stats};

/// Study Coach CLI — a retrieval-augmented tutor grounded in course material.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `coach chunk` falls back to built-in defaults when the file is missing.
#[derive(Parser)]
#[command(
    name = "coach",
    about = "Study Coach — a retrieval-augmented tutor grounded in your course material",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coach.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Extract, normalize, and chunk a single PDF or text file.
    ///
    /// Writes `{course}_{stem}_chunks.txt` and prints its path.
    Chunk {
        /// File to chunk (`.pdf`, `.txt`, or `.md`).
        file: PathBuf,

        /// Course label used in the output file name.
        #[arg(long)]
        course: String,

        /// Output directory. Defaults to `[paths].processed_dir`.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Chunk, embed, and index every PDF under the raw directory.
    Ingest {
        /// Course label attached to every chunk.
        #[arg(long)]
        course: String,

        /// Raw directory. Defaults to `[paths].raw_dir`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Answer a question grounded in the indexed material.
    Ask {
        question: String,

        /// Tutor mode: `qa`, `quiz`, `explain_simple`, or `explain_analogy`.
        #[arg(long, default_value = "qa")]
        mode: String,
    },

    /// Generate synthetic exam questions from indexed chunks.
    Synthetic {
        #[arg(long)]
        course: String,

        /// Number of chunks to generate from.
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNKS)]
        max_chunks: usize,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `chunk` works without a config file, but never with an invalid one
    let cfg = match &cli.command {
        Commands::Chunk { .. } if !cli.config.exists() => Config::minimal(),
        _ => config::load_config(&cli.config)?,
    };
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Chunk {
            file,
            course,
            out_dir,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| cfg.paths.processed_dir.clone());
            let (path, count) = ingest::process_file(&file, &course, &cfg.chunking, &out_dir)?;
            println!("{} ({} chunks)", path.display(), count);
        }
        Commands::Ingest { course, dir } => {
            ingest::run_ingest(&cfg, &course, dir).await?;
        }
        Commands::Ask { question, mode } => {
            run_ask(&cfg, &question, &mode).await?;
        }
        Commands::Synthetic { course, max_chunks } => {
            let store = SqliteStore::open(&cfg.db.path, cfg.retrieval.metric).await?;
            let writer = create_generator(&synthetic::generator_config(&cfg.generation))?;
            let path = synthetic::generate_synthetic_questions(
                &store,
                writer.as_ref(),
                &course,
                max_chunks,
                &cfg.paths.synthetic_dir,
            )
            .await?;
            println!("{}", path.display());
            store.pool().close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_ask(cfg: &Config, question: &str, mode: &str) -> anyhow::Result<()> {
    let mode: TutorMode = mode.parse()?;

    let store = Arc::new(SqliteStore::open(&cfg.db.path, cfg.retrieval.metric).await?);
    let retriever = Retriever::new(
        create_provider(&cfg.embedding)?,
        store.clone() as Arc<dyn VectorStore>,
    );
    let tutor = Tutor::from_config(cfg, retriever, create_generator(&cfg.generation)?);

    let answer = tutor.answer(question, mode).await?;

    println!("{}", answer.text);
    println!();
    if answer.used_chunks.is_empty() {
        println!("Sources: none above the similarity threshold");
    } else {
        println!("Sources:");
        for (i, chunk) in answer.used_chunks.iter().enumerate() {
            println!("  [Source {}] {} (score {:.2})", i + 1, chunk.source_id, chunk.score);
        }
    }

    store.pool().close().await;
    Ok(())
}
