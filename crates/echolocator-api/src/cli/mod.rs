//! CLI command definitions and dispatch for the `echoloc` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod item;
pub mod search;
pub mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use echolocator_types::config::EmbedderBackend;

/// Find lost items by photo or description.
#[derive(Parser)]
#[command(name = "echoloc", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Keep items in memory only; nothing is written to the database.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Embedding backend, overriding `[embedder] backend` in config.toml.
    #[arg(long, global = true, value_enum)]
    pub embedder: Option<EmbedderArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EmbedderArg {
    /// CLIP ViT-B/32 through fastembed.
    Clip,
    /// Offline hashing embedder (no model download).
    Deterministic,
}

impl From<EmbedderArg> for EmbedderBackend {
    fn from(arg: EmbedderArg) -> Self {
        match arg {
            EmbedderArg::Clip => EmbedderBackend::Clip,
            EmbedderArg::Deterministic => EmbedderBackend::Deterministic,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API.
    Serve {
        /// Port to listen on (defaults to `[server] port`).
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind (defaults to `[server] host`).
        #[arg(long)]
        host: Option<String>,
    },

    /// Index a photographed item.
    Add {
        /// Image file (jpg, jpeg, png or webp).
        image: PathBuf,

        #[arg(long)]
        title: String,

        /// Where the item was found.
        #[arg(long)]
        location: String,

        #[arg(long)]
        description: Option<String>,

        /// How to reach the finder.
        #[arg(long)]
        contact: Option<String>,
    },

    /// Search items by description.
    Search {
        query: String,

        /// Minimum similarity in [0, 1].
        #[arg(long)]
        threshold: Option<f32>,

        /// Maximum number of results.
        #[arg(long)]
        top_k: Option<i64>,

        /// Only items found at this location (case-insensitive).
        #[arg(long)]
        location: Option<String>,
    },

    /// List the newest items.
    Recent {
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show one item.
    Show {
        id: String,
    },

    /// Corpus statistics.
    Stats,

    /// Remove stored images no item references.
    Reconcile,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
