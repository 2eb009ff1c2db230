//! Symbol Extractor (§4.3): walks a file's definition-query captures,
//! builds `CodeSymbolNode`s, computes `isExported`, registers the Symbol
//! Table, and emits `DEFINES` edges from the enclosing File.

use tree_sitter::{Query, QueryCursor, StreamingIterator, Tree};

use crate::model::{self, CodeRelation, CodeSymbolNode};
use crate::parsing::LanguageProfile;
use crate::symtab::SymbolTable;
use crate::types::SymbolLabel;

/// Output of a single file's extraction pass: new symbol nodes plus the
/// `DEFINES` edges linking them to their file, ready to be merged into the
/// shared Graph Store and Symbol Table at the phase join (§5).
#[derive(Debug, Default)]
pub struct ExtractionPatch {
    pub symbols: Vec<CodeSymbolNode>,
    pub relations: Vec<CodeRelation>,
}

/// Maps a `definition.<kind>` capture name's suffix to the closed label set
/// (§3, §4.3).
fn label_for_capture(capture: &str) -> Option<SymbolLabel> {
    let kind = capture.strip_prefix("definition.")?;
    Some(match kind {
        "function" => SymbolLabel::Function,
        "class" => SymbolLabel::Class,
        "interface" => SymbolLabel::Interface,
        "method" => SymbolLabel::Method,
        "struct" => SymbolLabel::Struct,
        "enum" => SymbolLabel::Enum,
        "namespace" => SymbolLabel::Namespace,
        "module" => SymbolLabel::Module,
        "trait" => SymbolLabel::Trait,
        "impl" => SymbolLabel::Impl,
        "type" => SymbolLabel::TypeAlias,
        "const" => SymbolLabel::Const,
        "static" => SymbolLabel::Static,
        "typedef" => SymbolLabel::Typedef,
        "macro" => SymbolLabel::Macro,
        "union" => SymbolLabel::Union,
        "property" => SymbolLabel::Property,
        "record" => SymbolLabel::Record,
        "delegate" => SymbolLabel::Delegate,
        "annotation" => SymbolLabel::Annotation,
        "constructor" => SymbolLabel::Constructor,
        "template" => SymbolLabel::Template,
        _ => SymbolLabel::CodeElement,
    })
}

/// Runs the definition query for `profile` over `tree`/`code`, registers
/// every matched symbol in `symtab`, and returns the new nodes/edges for
/// the file at `file_path` (already `File:<path>`-prefixed).
pub fn extract_file(
    profile: &dyn LanguageProfile,
    tree: &Tree,
    code: &str,
    file_path: &str,
    file_id: &str,
    snippet_cap: usize,
    symtab: &mut SymbolTable,
) -> ExtractionPatch {
    let query: &Query = profile.definition_query();
    let mut cursor = QueryCursor::new();
    let mut patch = ExtractionPatch::default();

    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, tree.root_node(), code.as_bytes());
    while let Some(m) = matches.next() {
        let mut def_node = None;
        let mut def_label = None;
        let mut name_node = None;

        for capture in m.captures {
            let capture_name = capture_names[capture.index as usize];
            if let Some(label) = label_for_capture(capture_name) {
                def_node = Some(capture.node);
                def_label = Some(label);
            } else if capture_name == "name" {
                name_node = Some(capture.node);
            }
        }

        let (Some(def_node), Some(label), Some(name_node)) = (def_node, def_label, name_node) else {
            continue;
        };

        let Some(name) = code.get(name_node.byte_range()) else { continue };
        let name = name.to_string();

        let id = model::symbol_id(label, file_path, &name);
        let start = name_node.start_position();
        let end = name_node.end_position();
        let is_exported = label.tracks_exported() && profile.is_exported(def_node, code, &name);

        let content = def_node
            .byte_range()
            .get(..)
            .and_then(|_| code.get(def_node.byte_range()))
            .map(|s| truncate_chars(s, snippet_cap))
            .unwrap_or_default();

        patch.symbols.push(CodeSymbolNode {
            id: id.clone(),
            label,
            name: name.clone(),
            file_path: file_path.to_string(),
            start_line: start.row as u32,
            end_line: end.row as u32,
            content,
            is_exported,
            description: doc_comment_above(profile, def_node, code),
        });
        patch.relations.push(CodeRelation::defines(file_id.to_string(), id.clone()));

        symtab.add(file_path, &name, &id, label);
    }

    patch
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

/// Best-effort doc-comment capture: the nearest preceding sibling whose text
/// starts with one of the language's doc-comment prefixes (§4.3, not part of
/// any invariant).
fn doc_comment_above(profile: &dyn LanguageProfile, def_node: tree_sitter::Node, code: &str) -> Option<String> {
    let prev = def_node.prev_sibling()?;
    let text = code.get(prev.byte_range())?.trim();
    let prefixes = profile.doc_comment_prefixes();
    if prefixes.iter().any(|p| text.starts_with(p)) {
        Some(text.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserRegistry;
    use crate::types::Language;

    #[test]
    fn extracts_rust_function_and_registers_symtab() {
        let registry = ParserRegistry::new().expect("registry builds");
        let code = "pub fn greet(name: &str) -> String {\n    format!(\"hi {name}\")\n}\n";
        let tree = registry
            .parse(Language::Rust, code.as_bytes(), std::path::Path::new("lib.rs"))
            .expect("parses");
        let profile = registry.profile(Language::Rust);
        let mut symtab = SymbolTable::new();

        let patch = extract_file(
            profile.as_ref(),
            &tree,
            code,
            "lib.rs",
            "File:lib.rs",
            5_000,
            &mut symtab,
        );

        assert_eq!(patch.symbols.len(), 1);
        let sym = &patch.symbols[0];
        assert_eq!(sym.name, "greet");
        assert_eq!(sym.label, SymbolLabel::Function);
        assert!(sym.is_exported);
        assert_eq!(symtab.lookup_exact("lib.rs", "greet"), Some(sym.id.as_str()));
        assert_eq!(patch.relations.len(), 1);
    }

    #[test]
    fn python_underscore_prefixed_function_is_not_exported() {
        let registry = ParserRegistry::new().expect("registry builds");
        let code = "def _helper():\n    pass\n";
        let tree = registry
            .parse(Language::Python, code.as_bytes(), std::path::Path::new("m.py"))
            .expect("parses");
        let profile = registry.profile(Language::Python);
        let mut symtab = SymbolTable::new();

        let patch = extract_file(
            profile.as_ref(),
            &tree,
            code,
            "m.py",
            "File:m.py",
            5_000,
            &mut symtab,
        );

        assert_eq!(patch.symbols.len(), 1);
        assert!(!patch.symbols[0].is_exported);
    }

    #[test]
    fn go_uppercase_function_is_exported() {
        let registry = ParserRegistry::new().expect("registry builds");
        let code = "package main\n\nfunc Run() {}\n";
        let tree = registry
            .parse(Language::Go, code.as_bytes(), std::path::Path::new("m.go"))
            .expect("parses");
        let profile = registry.profile(Language::Go);
        let mut symtab = SymbolTable::new();

        let patch = extract_file(
            profile.as_ref(),
            &tree,
            code,
            "m.go",
            "File:m.go",
            5_000,
            &mut symtab,
        );

        assert_eq!(patch.symbols.len(), 1);
        assert!(patch.symbols[0].is_exported);
    }
}
