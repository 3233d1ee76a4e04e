//! # Solace CLI (`solace`)
//!
//! The `solace` binary runs the support responder interactively, serves it
//! over HTTP, and exposes the classifier and knowledge lookup for
//! inspection.
//!
//! ## Usage
//!
//! ```bash
//! solace --config ./config/solace.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `solace chat` | Converse on stdin/stdout |
//! | `solace classify "<text>"` | Print the classification as JSON |
//! | `solace serve` | Start the HTTP server |
//! | `solace lookup "<query>"` | Rank knowledge-dataset entries for a query |
//!
//! Logging is controlled by `RUST_LOG` (default `warn`) and written to
//! stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use solace::chat::{run_chat, run_classify};
use solace::config::load_config_or_default;
use solace::knowledge::run_lookup;
use solace::server::run_server;

/// Solace: a rule-based emotional support responder.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/solace.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "solace",
    about = "Solace: a rule-based emotional support responder",
    version,
    long_about = "Solace classifies each message by emotion, topic, and intent using keyword \
    tables, then composes a supportive reply from templates whose advice deepens as the \
    conversation goes on. An optional knowledge dataset or chat-completion backend can \
    answer in its place."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/solace.toml`. A missing file means built-in
    /// defaults.
    #[arg(long, global = true, default_value = "./config/solace.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation.
    ///
    /// Reads one message per line. `/reset` starts over, `/quit` exits.
    Chat,

    /// Classify a message and print the result as JSON.
    Classify {
        /// The message text.
        text: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Rank knowledge-dataset entries for a query.
    Lookup {
        /// Query text.
        query: String,

        /// Maximum number of entries (defaults to `responder.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Chat => {
            run_chat(&config).await?;
        }
        Commands::Classify { text } => {
            run_classify(&config, &text)?;
        }
        Commands::Serve => {
            run_server(&config).await?;
        }
        Commands::Lookup { query, limit } => {
            run_lookup(&config, &query, limit)?;
        }
    }

    Ok(())
}
