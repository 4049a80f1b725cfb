//! # Page Recall CLI (`recall`)
//!
//! The `recall` binary is the primary interface for Page Recall. It provides
//! commands for one-shot page search from the terminal and for starting the
//! HTTP search server.
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
//! | `recall serve` | Start the HTTP search server |
//! | `recall search <url> "<query>"` | Fetch, index, and search a page once |
//! | `recall completions <shell>` | Generate shell completion scripts |
//!
//! ## Examples
//!
//! ```bash
//! # Start the HTTP server
//! recall serve --config ./config/recall.toml
//!
//! # One-shot search against a documentation page
//! recall search https://doc.rust-lang.org/book/ch04-00-understanding-ownership.html \
//!     "how does borrowing work" --config ./config/recall.toml
//!
//! # Install completions for zsh
//! recall completions zsh > ~/.zfunc/_recall
//! ```

mod align;
mod chunk;
mod config;
mod embedding;
mod extract;
mod fetch;
mod models;
mod search;
mod server;
mod store;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Page Recall CLI — fetch a web page, index it into a vector store, and
/// retrieve the stored passages most similar to a query.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/recall.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Page Recall — web page ingestion and semantic retrieval over a hosted vector store",
    version,
    long_about = "Page Recall fetches a web page, extracts its text (whole-page or per-element), \
    splits it into overlapping chunks, embeds and stores them, and returns the stored chunks \
    most similar to a query. Results are served over HTTP or printed from a one-shot CLI search."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/recall.toml`. All server, extraction, chunking,
    /// embedding, and store settings are read from this file.
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP search server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /search` and `GET /health`. When the Weaviate store is
    /// configured, the credentials must be present in the environment.
    Serve,

    /// Fetch, index, and search a single page.
    ///
    /// Runs the full pipeline once: fetches the URL, chunks and embeds its
    /// text, upserts the chunks into the configured store, and prints the
    /// stored texts most similar to the query.
    Search {
        /// URL of the page to fetch and index.
        url: String,

        /// The search query string.
        query: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Writes a completion script for the given shell to stdout.
    Completions {
        /// Target shell (bash, zsh, fish, powershell, elvish).
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,recall=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search { url, query } => {
            search::run_search_command(&cfg, &url, &query).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
