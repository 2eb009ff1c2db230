//! Argument definitions for the `gitnexus` CLI (§6, `[AMBIENT-4]`).
//!
//! Thin `clap` derive types only — no business logic lives here. Dispatch
//! happens in `cli::mod` against `pipeline::analyze` and `query::QuerySurface`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gitnexus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A code knowledge graph engine for AI coding agents")]
pub struct Cli {
    /// Repository root (defaults to the current directory).
    #[arg(short, long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Emit the unified JSON envelope instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default `.gitnexus.toml` into the repository root.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest the repository into the code knowledge graph (§5, §6 `analyze`).
    Analyze {
        /// Path to analyze, relative to `--repo` (defaults to the repo root).
        path: Option<PathBuf>,

        /// Re-run even if the persisted snapshot already matches `HEAD`.
        #[arg(short, long)]
        force: bool,

        /// Skip the embedding/vector-index phase.
        #[arg(long)]
        skip_embeddings: bool,
    },

    /// Serve the HTTP query API over a persisted snapshot (§6 `serve`).
    Serve {
        /// Bind address, e.g. `127.0.0.1:7878`.
        #[arg(long, default_value = "127.0.0.1:7878")]
        bind: String,
    },

    /// Serve the MCP stdio adapter over a persisted snapshot (§6 `mcp`).
    Mcp,

    /// Run a read-only query against the persisted snapshot (§4.11).
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },

    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand, Debug)]
pub enum QueryAction {
    /// Hybrid BM25 + semantic search, fused with RRF.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Expand each hit to its defined/imported symbols.
        #[arg(long)]
        full: bool,
    },

    /// Blast-radius analysis from a symbol.
    Impact {
        target: String,
        #[arg(long, default_value = "downstream")]
        direction: String,
        #[arg(long, default_value_t = 3)]
        max_depth: usize,
        #[arg(long, default_value_t = 0.0)]
        min_confidence: f64,
    },

    /// Canonical report for a symbol, cluster, or process.
    Explore {
        name: String,
        #[arg(long, default_value = "symbol")]
        kind: String,
    },

    /// Repository-wide summary of clusters and processes.
    Overview,

    /// Run a query in the supported Cypher subset (§4.11).
    Cypher { query: String },
}
