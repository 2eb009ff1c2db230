//! Per-language tree-sitter profiles and the registry that resolves a
//! [`Language`] to its profile and parses source into a [`Tree`] (§4.2,
//! §4.3, SPEC_FULL [AMBIENT-4.1]).

pub mod languages;
pub mod profile;

use std::collections::HashMap;
use std::sync::Arc;

use tree_sitter::{Parser, Tree};

pub use profile::LanguageProfile;

use crate::error::ParseError;
use crate::types::Language;

/// Holds one compiled [`LanguageProfile`] per supported [`Language`].
///
/// Profiles (and their compiled `Query` objects) are expensive to build and
/// are immutable once constructed, so the registry builds all nine once and
/// shares them behind `Arc` across the worker pool (§5).
pub struct ParserRegistry {
    profiles: HashMap<Language, Arc<dyn LanguageProfile>>,
}

impl ParserRegistry {
    pub fn new() -> Result<Self, ParseError> {
        let mut profiles: HashMap<Language, Arc<dyn LanguageProfile>> = HashMap::new();
        profiles.insert(Language::TypeScript, Arc::new(languages::TypeScriptProfile::new()?));
        profiles.insert(Language::JavaScript, Arc::new(languages::JavaScriptProfile::new()?));
        profiles.insert(Language::Python, Arc::new(languages::PythonProfile::new()?));
        profiles.insert(Language::Go, Arc::new(languages::GoProfile::new()?));
        profiles.insert(Language::Rust, Arc::new(languages::RustProfile::new()?));
        profiles.insert(Language::Java, Arc::new(languages::JavaProfile::new()?));
        profiles.insert(Language::CSharp, Arc::new(languages::CSharpProfile::new()?));
        profiles.insert(Language::C, Arc::new(languages::CProfile::new()?));
        profiles.insert(Language::Cpp, Arc::new(languages::CppProfile::new()?));
        Ok(Self { profiles })
    }

    pub fn profile(&self, language: Language) -> Arc<dyn LanguageProfile> {
        self.profiles
            .get(&language)
            .cloned()
            .expect("every Language variant has a registered profile")
    }

    /// Parses `source` with the parser for `language`. A fresh [`Parser`] is
    /// constructed per call: `tree_sitter::Parser` is cheap to build and is
    /// not `Send`-shareable across calls, so callers (one per worker-pool
    /// task) each pay this cost rather than contend on a shared instance.
    pub fn parse(
        &self,
        language: Language,
        source: &[u8],
        path: &std::path::Path,
    ) -> Result<Tree, ParseError> {
        let profile = self.profile(language);
        let mut parser = Parser::new();
        parser.set_language(&profile.ts_language()).map_err(|e| ParseError::ParserInit {
            language: language.as_str().to_string(),
            reason: e.to_string(),
        })?;
        parser.parse(source, None).ok_or_else(|| ParseError::SyntaxError {
            path: path.to_path_buf(),
            language: language.as_str().to_string(),
            reason: "tree-sitter returned no tree".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_all_nine_profiles() {
        let registry = ParserRegistry::new().expect("registry builds");
        for lang in [
            Language::TypeScript,
            Language::JavaScript,
            Language::Python,
            Language::Go,
            Language::Rust,
            Language::Java,
            Language::CSharp,
            Language::C,
            Language::Cpp,
        ] {
            assert_eq!(registry.profile(lang).language(), lang);
        }
    }

    #[test]
    fn parses_trivial_rust_source() {
        let registry = ParserRegistry::new().expect("registry builds");
        let tree = registry
            .parse(Language::Rust, b"fn main() {}", std::path::Path::new("main.rs"))
            .expect("parses");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn parses_trivial_python_source() {
        let registry = ParserRegistry::new().expect("registry builds");
        let tree = registry
            .parse(Language::Python, b"def f():\n    pass\n", std::path::Path::new("f.py"))
            .expect("parses");
        assert!(!tree.root_node().has_error());
    }
}
