//! File Walker & Language Router (§4.1).
//!
//! Enumerates regular files under the repo root, filters ignored paths and
//! binaries, and routes surviving files to a `Language` tag by extension.
//! Built on the `ignore` crate the same way the teacher's `FileWalker` is,
//! generalized from a language allow-list to the full ignore-pattern +
//! binary-detection contract this spec requires.

use crate::config::Settings;
use crate::model::normalize_path;
use crate::types::Language;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One walked file: its repo-relative path, the language tag if recognized,
/// and its raw bytes (or `None` if detected as binary — see
/// `RoutedFile::is_binary`).
pub struct RoutedFile {
    pub path: PathBuf,
    pub repo_relative: String,
    pub language: Option<Language>,
    pub bytes: Option<Vec<u8>>,
}

impl RoutedFile {
    pub fn is_binary(&self) -> bool {
        self.bytes.is_none()
    }
}

pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk `root` and return every regular, non-ignored file with its
    /// language routing and contents (placeholder-only for binaries).
    pub fn walk(&self, root: &Path) -> Vec<RoutedFile> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .max_depth(None)
            .require_git(false);

        let mut overrides = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &self.settings.ingestion.ignore_patterns {
            if let Err(e) = overrides.add(&format!("!{pattern}")) {
                tracing::warn!("invalid ignore pattern '{pattern}': {e}");
            }
        }
        if let Ok(overrides) = overrides.build() {
            builder.overrides(overrides);
        }

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|entry| self.route(root, entry.path()))
            .collect()
    }

    fn route(&self, root: &Path, path: &Path) -> Option<RoutedFile> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let repo_relative = normalize_path(relative);

        let metadata = std::fs::metadata(path).ok()?;
        if metadata.len() > self.settings.ingestion.max_file_bytes {
            tracing::debug!("skipping oversized file '{repo_relative}' ({} bytes)", metadata.len());
            return None;
        }

        let language = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension);

        let raw = std::fs::read(path).ok()?;
        let bytes = if self.looks_binary(&raw) { None } else { Some(raw) };

        Some(RoutedFile { path: path.to_path_buf(), repo_relative, language, bytes })
    }

    /// Binary sniff: sample the first N bytes; if more than the configured
    /// fraction are non-printable, non-whitespace bytes, treat as binary
    /// (§4.1).
    fn looks_binary(&self, bytes: &[u8]) -> bool {
        let sample_len = self.settings.ingestion.binary_sample_bytes.min(bytes.len());
        if sample_len == 0 {
            return false;
        }
        let sample = &bytes[..sample_len];
        let nonprintable = sample
            .iter()
            .filter(|&&b| !(b.is_ascii_graphic() || b.is_ascii_whitespace()))
            .count();
        (nonprintable as f32 / sample_len as f32) > self.settings.ingestion.binary_nonprintable_ratio
    }

    pub fn count_files(&self, root: &Path) -> usize {
        self.walk(root).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    #[test]
    fn routes_known_languages_and_skips_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "export function foo() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path());

        let ts = files.iter().find(|f| f.repo_relative == "a.ts").unwrap();
        assert_eq!(ts.language, Some(Language::TypeScript));

        let md = files.iter().find(|f| f.repo_relative == "README.md").unwrap();
        assert_eq!(md.language, None);
    }

    #[test]
    fn respects_gitignore() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored.ts\n").unwrap();
        fs::write(dir.path().join("ignored.ts"), "export function a() {}").unwrap();
        fs::write(dir.path().join("kept.ts"), "export function b() {}").unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path());
        assert!(files.iter().all(|f| f.repo_relative != "ignored.ts"));
        assert!(files.iter().any(|f| f.repo_relative == "kept.ts"));
    }

    #[test]
    fn detects_binary_by_sampling() {
        let dir = TempDir::new().unwrap();
        let mut bytes = vec![0u8; 2000];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        fs::write(dir.path().join("blob.bin"), &bytes).unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path());
        let blob = files.iter().find(|f| f.repo_relative == "blob.bin").unwrap();
        assert!(blob.is_binary());
    }
}
