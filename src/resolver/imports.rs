//! Import resolution (§4.5(a)): resolves an `import.source` specifier to a
//! File id, memoized per `(importerPath, rawSpecifier)`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use tree_sitter::{QueryCursor, StreamingIterator, Tree};

use crate::model::CodeRelation;
use crate::parsing::LanguageProfile;

/// importer path -> set of resolved import target file paths (§4.5(a): the
/// "Import Map" the call resolver scans for import-resolved hits).
pub type ImportMap = HashMap<String, HashSet<String>>;

/// Resolves relative/package specifiers against the set of known file
/// paths, memoizing both hits and misses (§4.5(a)).
pub struct ImportResolver<'a> {
    known_files: &'a HashSet<String>,
    cache: RefCell<HashMap<(String, String), Option<String>>>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(known_files: &'a HashSet<String>) -> Self {
        Self { known_files, cache: RefCell::new(HashMap::new()) }
    }

    /// Resolves `raw_specifier` (quotes already present, as captured from
    /// source) imported by a file at `importer_path`. Returns the resolved
    /// file path, not a node id.
    pub fn resolve(
        &self,
        profile: &dyn LanguageProfile,
        importer_path: &str,
        raw_specifier: &str,
    ) -> Option<String> {
        let key = (importer_path.to_string(), raw_specifier.to_string());
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }

        let specifier = strip_quotes(raw_specifier);
        let result = if specifier.starts_with('.') {
            self.resolve_relative(profile, importer_path, specifier)
        } else if specifier.ends_with(".*") {
            None
        } else {
            self.resolve_package(profile, specifier)
        };

        self.cache.borrow_mut().insert(key, result.clone());
        result
    }

    fn resolve_relative(
        &self,
        profile: &dyn LanguageProfile,
        importer_path: &str,
        specifier: &str,
    ) -> Option<String> {
        let base_dir = parent_dir(importer_path);
        let joined = join_and_normalize(base_dir, specifier);
        for ext in profile.relative_import_extensions() {
            let candidate = format!("{joined}{ext}");
            if self.known_files.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn resolve_package(&self, profile: &dyn LanguageProfile, specifier: &str) -> Option<String> {
        let dotted_to_slash = specifier.replace('.', "/");
        let segments: Vec<&str> = dotted_to_slash.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        for i in 0..segments.len() {
            let suffix = segments[i..].join("/");
            for ext in profile.relative_import_extensions() {
                let candidate_suffix = format!("{suffix}{ext}");
                if let Some(hit) = self.find_by_suffix(&candidate_suffix) {
                    return Some(hit);
                }
            }
        }
        None
    }

    fn find_by_suffix(&self, candidate_suffix: &str) -> Option<String> {
        let needle = format!("/{candidate_suffix}");
        if let Some(hit) = self
            .known_files
            .iter()
            .find(|p| p.as_str() == candidate_suffix || p.ends_with(&needle))
        {
            return Some(hit.clone());
        }
        let lower_suffix = candidate_suffix.to_ascii_lowercase();
        let lower_needle = needle.to_ascii_lowercase();
        self.known_files
            .iter()
            .find(|p| {
                let lower = p.to_ascii_lowercase();
                lower == lower_suffix || lower.ends_with(&lower_needle)
            })
            .cloned()
    }
}

/// Output of a single file's import-extraction pass: the resolved target
/// file paths (fed into the shared [`ImportMap`]) plus the `IMPORTS` edges
/// for the ones that resolved to a known file (§4.5(a)).
#[derive(Debug, Default)]
pub struct ImportPatch {
    pub targets: HashSet<String>,
    pub relations: Vec<CodeRelation>,
}

/// Runs `profile.import_query()` over `tree`/`code`, resolving every
/// `import.source` capture through `resolver` (§4.5(a)). Unresolved
/// specifiers (external packages, wildcards) are silently dropped, matching
/// the call resolver's "import-resolved" tier only firing on a known hit.
pub fn extract_imports(
    profile: &dyn LanguageProfile,
    tree: &Tree,
    code: &str,
    file_path: &str,
    resolver: &ImportResolver,
) -> ImportPatch {
    let query = profile.import_query();
    let mut cursor = QueryCursor::new();
    let mut patch = ImportPatch::default();

    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, tree.root_node(), code.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture_names[capture.index as usize] != "import.source" {
                continue;
            }
            let Some(raw) = code.get(capture.node.byte_range()) else { continue };
            let Some(target_path) = resolver.resolve(profile, file_path, raw) else { continue };

            if patch.targets.insert(target_path.clone()) {
                patch.relations.push(CodeRelation::imports(
                    crate::model::file_id(file_path),
                    crate::model::file_id(&target_path),
                ));
            }
        }
    }

    patch
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Joins a base directory with a relative specifier and collapses `.`/`..`
/// segments, producing a normalized forward-slash path.
fn join_and_normalize(base_dir: &str, specifier: &str) -> String {
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserRegistry;
    use crate::types::Language;

    fn files(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn resolves_relative_typescript_specifier() {
        let known = files(&["app/a.ts", "app/b.ts"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::TypeScript);
        let resolver = ImportResolver::new(&known);

        let resolved = resolver.resolve(profile.as_ref(), "app/b.ts", "'./a'");
        assert_eq!(resolved.as_deref(), Some("app/a.ts"));
    }

    #[test]
    fn resolves_relative_index_file() {
        let known = files(&["app/utils/index.ts"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::TypeScript);
        let resolver = ImportResolver::new(&known);

        let resolved = resolver.resolve(profile.as_ref(), "app/b.ts", "'./utils'");
        assert_eq!(resolved.as_deref(), Some("app/utils/index.ts"));
    }

    #[test]
    fn resolves_package_specifier_by_suffix_without_false_prefix_match() {
        let known = files(&["src/views/RootView.java", "src/views/View.java"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::Java);
        let resolver = ImportResolver::new(&known);

        let resolved = resolver.resolve(profile.as_ref(), "src/app/Main.java", "\"views.View\"");
        assert_eq!(resolved.as_deref(), Some("src/views/View.java"));
    }

    #[test]
    fn wildcard_specifier_is_unresolvable() {
        let known = files(&["app/a.ts"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::TypeScript);
        let resolver = ImportResolver::new(&known);

        assert!(resolver.resolve(profile.as_ref(), "app/b.ts", "'react/*'").is_none());
    }

    #[test]
    fn misses_are_memoized() {
        let known = files(&["app/a.ts"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::TypeScript);
        let resolver = ImportResolver::new(&known);

        assert!(resolver.resolve(profile.as_ref(), "app/b.ts", "'./missing'").is_none());
        assert!(resolver.resolve(profile.as_ref(), "app/b.ts", "'./missing'").is_none());
    }

    #[test]
    fn extract_imports_emits_edges_only_for_resolved_targets() {
        let known = files(&["app/a.ts", "app/b.ts"]);
        let registry = ParserRegistry::new().unwrap();
        let profile = registry.profile(Language::TypeScript);
        let resolver = ImportResolver::new(&known);

        let code = "import { a } from './a';\nimport react from 'react';\n";
        let tree = registry.parse(Language::TypeScript, code.as_bytes(), std::path::Path::new("app/b.ts")).unwrap();

        let patch = extract_imports(profile.as_ref(), &tree, code, "app/b.ts", &resolver);
        assert_eq!(patch.targets.len(), 1);
        assert!(patch.targets.contains("app/a.ts"));
        assert_eq!(patch.relations.len(), 1);
        assert_eq!(patch.relations[0].from, "File:app/b.ts");
        assert_eq!(patch.relations[0].to, "File:app/a.ts");
    }
}
