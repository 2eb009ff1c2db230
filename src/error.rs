//! Structured error types for the ingestion and query engine.
//!
//! Mirrors the teacher's `IndexError` shape: named variants carrying
//! path/reason context, a `General(String)` escape hatch, and
//! `recovery_suggestions()` for CLI display. Propagation policy matches §7:
//! file/phase-level issues are folded into a `PipelineReport` rather than
//! short-circuiting, so only `PersistError` and internal invariant breaks
//! ever surface as `Err` out of `analyze()`.

use std::path::PathBuf;
use thiserror::Error;

/// Parsing/extraction failures (§7 `InputError`, logged and skipped per file).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to initialize {language} parser: {reason}")]
    ParserInit { language: String, reason: String },

    #[error("failed to parse {language} file '{path}': {reason}")]
    SyntaxError { path: PathBuf, language: String, reason: String },

    #[error("unsupported file type '{extension}' for file '{path}'")]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("invalid UTF-8 in source file '{path}'")]
    InvalidUtf8 { path: PathBuf },
}

/// Graph-store invariant violations (§3, §8). `UndeclaredPair` is the one
/// variant a correctly constructed graph can still hit in practice (a
/// language's extractor/resolver emitting a pair `SCHEMA_PAIRS` doesn't
/// cover) and the pipeline folds it into a non-fatal schema warning rather
/// than propagating it (§7 / [AMBIENT-2]); the others are internal bugs.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("relation ({from_label}, {to_label}) is not a declared schema pair")]
    UndeclaredPair { from_label: String, to_label: String },

    #[error("CALLS edge confidence {confidence} out of range (0, 1]")]
    InvalidConfidence { confidence: f64 },

    #[error("STEP_IN_PROCESS steps for '{process_id}' are not gap-free: {steps:?}")]
    NonContiguousSteps { process_id: String, steps: Vec<u32> },

    #[error("community '{community_id}' has fewer than 2 members")]
    CommunityTooSmall { community_id: String },
}

/// Fatal persistence failures (§7 `PersistenceError`): DB init, catastrophic
/// bulk-load failure. The staging directory is discarded; the previous
/// artifact is left untouched.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to create staging directory '{path}': {source}")]
    StagingCreate { path: PathBuf, source: std::io::Error },

    #[error("failed to swap staging directory into '{path}': {source}")]
    StagingSwap { path: PathBuf, source: std::io::Error },

    #[error("failed to open database at '{path}': {source}")]
    DatabaseOpen { path: PathBuf, source: rusqlite::Error },

    #[error("schema install failed: {reason}")]
    SchemaInstall { reason: String },

    #[error("bulk load of table '{table}' failed even with per-row fallback: {source}")]
    BulkLoadFailed { table: String, source: rusqlite::Error },

    #[error("failed to write CSV for table '{table}': {source}")]
    CsvWrite { table: String, source: std::io::Error },
}

/// Top-level umbrella error for the CLI boundary.
#[derive(Error, Debug)]
pub enum GitNexusError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ingestion was cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

impl GitNexusError {
    /// Recovery suggestions shown by the CLI, matching the teacher's
    /// `IndexError::recovery_suggestions`.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            GitNexusError::Persist(PersistError::BulkLoadFailed { .. }) => vec![
                "Run 'gitnexus analyze --force' to rebuild the index",
                "Check disk space and permissions in the data directory",
            ],
            GitNexusError::Persist(PersistError::StagingSwap { .. }) => vec![
                "The previous index was left untouched; retry the analyze run",
            ],
            GitNexusError::Graph(_) => vec![
                "This indicates an internal invariant violation; please file a bug report",
            ],
            GitNexusError::Cancelled => vec!["Re-run 'gitnexus analyze' to resume from scratch"],
            _ => vec![],
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type GraphResult<T> = Result<T, GraphError>;
pub type PersistResult<T> = Result<T, PersistError>;
pub type Result<T> = std::result::Result<T, GitNexusError>;
