//! # Korea Guide CLI (`kguide`)
//!
//! Builds and inspects the retrieval snapshot, answers questions from the
//! terminal, and starts the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! kguide --config ./config/kguide.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kguide ingest` | Chunk and embed the corpus, write the snapshot |
//! | `kguide info` | Show snapshot version, model, dims and chunk count |
//! | `kguide search "<query>"` | Print the best-matching chunks |
//! | `kguide ask "<query>"` | Answer a question grounded on the snapshot |
//! | `kguide serve` | Start the HTTP server |
//!
//! Logs go to stderr and are controlled with `RUST_LOG`
//! (default `info`); command output goes to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use korea_guide_rag::{config, ingest, search, server, stats};

/// Korea Guide: retrieval-augmented answers about everyday life in Korea.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kguide.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kguide",
    about = "Korea Guide: retrieval-augmented answers about everyday life in Korea",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kguide.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the snapshot from the corpus directory.
    ///
    /// Scans `[corpus].root`, chunks every document, embeds the chunks in
    /// batches, and writes the snapshot atomically. Any embedding failure
    /// aborts the run and leaves the previous snapshot untouched.
    Ingest {
        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show snapshot metadata.
    Info,

    /// Print the chunks that best match a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question grounded on the snapshot.
    Ask {
        /// The question.
        query: String,

        /// Reply language code (`ko`, `en`, `ja`, `zh`, `fr`, `de`, `th`, `vi`).
        #[arg(long, default_value = "en")]
        lang: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            ingest::run_ingest(&cfg, dry_run).await?;
        }
        Commands::Info => {
            stats::run_info(&cfg)?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { query, lang } => {
            search::run_ask(&cfg, &query, &lang).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
