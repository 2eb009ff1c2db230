//! Layered configuration: defaults → `.gitnexus.toml` → `GITNEXUS_*` env vars,
//! matching `figment`'s role in the teacher's `Settings`.
//!
//! # Environment Variables
//!
//! Prefixed `GITNEXUS_`, with `__` separating nested levels:
//! - `GITNEXUS_INGESTION__PARALLEL_THREADS=8`
//! - `GITNEXUS_COMMUNITY__SEED=7`

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub ast_cache: AstCacheConfig,

    #[serde(default)]
    pub community: CommunityConfig,

    #[serde(default)]
    pub process: ProcessConfig,

    #[serde(default)]
    pub bm25: Bm25Config,

    #[serde(default)]
    pub vector: VectorConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Files larger than this are skipped entirely (§4.1).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Bytes sampled from the head of a file for binary detection (§4.1).
    #[serde(default = "default_binary_sample_bytes")]
    pub binary_sample_bytes: usize,

    /// If more than this fraction of the sample is non-printable
    /// non-whitespace, the file is treated as binary (§4.1).
    #[serde(default = "default_binary_ratio")]
    pub binary_nonprintable_ratio: f32,

    /// Character cap for `File.content` (§3).
    #[serde(default = "default_file_content_cap")]
    pub file_content_cap: usize,

    /// Character cap for `CodeSymbol.content` (§3).
    #[serde(default = "default_symbol_snippet_cap")]
    pub symbol_snippet_cap: usize,

    /// Lines of context on either side of a symbol's own range for its
    /// snippet (§4.3).
    #[serde(default = "default_snippet_context_lines")]
    pub snippet_context_lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstCacheConfig {
    #[serde(default = "default_ast_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Seed for deterministic tie-breaking (§8 property 6, §9).
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_stopword_dirs")]
    pub stopword_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_process_max_depth")]
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Config {
    #[serde(default = "default_name_field_boost")]
    pub name_field_boost: f32,

    #[serde(default = "default_fuzzy_edit_fraction")]
    pub fuzzy_edit_fraction: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_vector_dimension")]
    pub dimension: usize,

    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    #[serde(default = "default_max_nb_connection")]
    pub max_nb_connection: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// RRF constant `K` (§4.11, §8 property 9).
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_repo_path() -> PathBuf { PathBuf::from(".") }
fn default_data_dir() -> PathBuf { PathBuf::from(".gitnexus") }
fn default_parallel_threads() -> usize { num_cpus::get() }
fn default_ignore_patterns() -> Vec<String> {
    [
        ".git/**", ".hg/**", ".svn/**", "node_modules/**", "target/**", "dist/**", "build/**",
        "vendor/**", "*.lock", "*.min.js", "*.png", "*.jpg", "*.jpeg", "*.gif", "*.ico", "*.pdf",
        "*.zip", "*.tar", "*.gz", "*.woff", "*.woff2", "*.ttf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_file_bytes() -> u64 { 2_000_000 }
fn default_binary_sample_bytes() -> usize { 1_000 }
fn default_binary_ratio() -> f32 { 0.10 }
fn default_file_content_cap() -> usize { 10_000 }
fn default_symbol_snippet_cap() -> usize { 5_000 }
fn default_snippet_context_lines() -> u32 { 2 }
fn default_ast_cache_capacity() -> usize { 50 }
fn default_resolution() -> f64 { 1.0 }
fn default_seed() -> u64 { 42 }
fn default_stopword_dirs() -> Vec<String> {
    ["src", "lib", "core", "utils", "common", "shared", "helpers"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_process_max_depth() -> usize { 12 }
fn default_name_field_boost() -> f32 { 2.0 }
fn default_fuzzy_edit_fraction() -> f32 { 0.2 }
fn default_true() -> bool { true }
fn default_vector_dimension() -> usize { 384 }
fn default_ef_construction() -> usize { 200 }
fn default_max_nb_connection() -> usize { 16 }
fn default_rrf_k() -> f64 { 60.0 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_path: default_repo_path(),
            data_dir: default_data_dir(),
            ingestion: IngestionConfig::default(),
            ast_cache: AstCacheConfig::default(),
            community: CommunityConfig::default(),
            process: ProcessConfig::default(),
            bm25: Bm25Config::default(),
            vector: VectorConfig::default(),
            query: QueryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: default_ignore_patterns(),
            max_file_bytes: default_max_file_bytes(),
            binary_sample_bytes: default_binary_sample_bytes(),
            binary_nonprintable_ratio: default_binary_ratio(),
            file_content_cap: default_file_content_cap(),
            symbol_snippet_cap: default_symbol_snippet_cap(),
            snippet_context_lines: default_snippet_context_lines(),
        }
    }
}

impl Default for AstCacheConfig {
    fn default() -> Self { Self { capacity: default_ast_cache_capacity() } }
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self { resolution: default_resolution(), seed: default_seed(), stopword_dirs: default_stopword_dirs() }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self { Self { max_depth: default_process_max_depth() } }
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { name_field_boost: default_name_field_boost(), fuzzy_edit_fraction: default_fuzzy_edit_fraction() }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            dimension: default_vector_dimension(),
            ef_construction: default_ef_construction(),
            max_nb_connection: default_max_nb_connection(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self { Self { rrf_k: default_rrf_k() } }
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { default: default_log_level(), modules: HashMap::new() } }
}

impl Settings {
    /// Load layered configuration: defaults, then `<repo>/.gitnexus.toml` if
    /// present, then `GITNEXUS_*` environment variables.
    pub fn load(repo_path: &std::path::Path) -> Result<Self, crate::error::GitNexusError> {
        let config_file = repo_path.join(".gitnexus.toml");
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if config_file.exists() {
            figment = figment.merge(Toml::file(&config_file));
        }
        figment = figment.merge(Env::prefixed("GITNEXUS_").split("__"));

        let mut settings: Settings = figment
            .extract()
            .map_err(|e| crate::error::GitNexusError::Config(e.to_string()))?;
        settings.repo_path = repo_path.to_path_buf();
        Ok(settings)
    }

    pub fn data_path(&self) -> PathBuf {
        self.repo_path.join(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.ingestion.file_content_cap, 10_000);
        assert_eq!(s.ingestion.symbol_snippet_cap, 5_000);
        assert_eq!(s.ast_cache.capacity, 50);
        assert_eq!(s.query.rrf_k, 60.0);
    }

    #[test]
    fn load_falls_back_to_defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.community.seed, 42);
    }
}
