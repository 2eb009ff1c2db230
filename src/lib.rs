pub mod ast_cache;
pub mod bm25;
pub mod cli;
pub mod community;
pub mod config;
pub mod csvbuild;
pub mod error;
pub mod graph;
#[cfg(feature = "http-server")]
pub mod http;
pub mod io;
pub mod logging;
pub mod model;
pub mod parsing;
pub mod persistence;
pub mod pipeline;
pub mod process;
pub mod query;
pub mod repo_status;
pub mod resolver;
pub mod symtab;
pub mod types;
pub mod vector;
pub mod walker;

#[cfg(feature = "mcp-server")]
pub mod mcp;

pub use config::Settings;
pub use error::{GitNexusError, Result};
pub use pipeline::{analyze, AnalyzeOptions, CancellationToken, PipelineReport};
