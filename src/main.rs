//! # Recall CLI (`recall`)
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the SQLite database and run schema migrations |
//! | `recall add <path>...` | Store files as documents |
//! | `recall docs` | List documents |
//! | `recall get <id>` | Show a document and its chunks |
//! | `recall delete <id>` / `--all` | Delete documents and their chunks |
//! | `recall index <id>` / `--all` / `--pending` | Chunk and vectorize documents |
//! | `recall refresh` | Re-vectorize chunks left behind by a refit |
//! | `recall search "<query>"` | Rank chunks by similarity |
//! | `recall vocab` | Show the current vocabulary |
//! | `recall stats` | Document and chunk counts |
//!
//! Logging goes to stderr and is controlled by `RECALL_LOG`
//! (e.g. `RECALL_LOG=recall=debug,recall_core=debug`); default `warn`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use recall::config;
use recall::documents;
use recall::engine::Engine;
use recall::index_cmd::{self, IndexTarget};
use recall::migrate;
use recall::progress::ProgressMode;
use recall::search_cmd;
use recall::stats;

/// Recall — local TF-IDF document retrieval.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Recall — local TF-IDF document retrieval",
    version,
    long_about = "Recall stores documents in SQLite, splits them into overlapping chunks, \
    vectorizes each chunk with TF-IDF over a vocabulary fit on the stored corpus, and ranks \
    chunks against a query by cosine similarity."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Store one or more files as documents.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Override the content type inferred from the extension.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List stored documents.
    Docs,

    /// Show a document with its chunks.
    Get {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete a document and its chunks.
    Delete {
        id: Option<String>,

        /// Delete every document.
        #[arg(long)]
        all: bool,
    },

    /// Chunk and vectorize documents.
    ///
    /// Fits the vocabulary on all stored documents first if the corpus
    /// changed since the last fit.
    Index {
        id: Option<String>,

        /// Re-index every document.
        #[arg(long)]
        all: bool,

        /// Index only documents not yet indexed.
        #[arg(long)]
        pending: bool,

        /// Progress on stderr: off, human, or json. Defaults to human on a
        /// TTY, off otherwise.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Re-vectorize chunks computed under an older vocabulary.
    Refresh,

    /// Search indexed chunks.
    Search {
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the current vocabulary.
    Vocab {
        /// Number of terms to list.
        #[arg(long, default_value_t = 20)]
        top: usize,

        #[arg(long)]
        json: bool,
    },

    /// Show document and chunk counts.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RECALL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let engine = Engine::open(&cfg).await?;

    let result = match cli.command {
        Commands::Init => Ok(()),
        Commands::Add {
            paths,
            content_type,
        } => documents::run_add(&engine, &paths, content_type.as_deref()).await,
        Commands::Docs => documents::run_docs(&engine).await,
        Commands::Get { id, json } => documents::run_get(&engine, &id, json).await,
        Commands::Delete { id, all } => documents::run_delete(&engine, id.as_deref(), all).await,
        Commands::Index {
            id,
            all,
            pending,
            progress,
        } => {
            let target = IndexTarget::from_args(id, all, pending)?;
            let mode = ProgressMode::from_flag(progress.as_deref())?;
            index_cmd::run_index(&engine, target, mode).await
        }
        Commands::Refresh => index_cmd::run_refresh(&engine).await,
        Commands::Search { query, top_k, json } => {
            search_cmd::run_search(&engine, &query, top_k, json).await
        }
        Commands::Vocab { top, json } => search_cmd::run_vocab(&engine, top, json).await,
        Commands::Stats { json } => stats::run_stats(&engine, json).await,
    };

    engine.close().await;
    result
}
