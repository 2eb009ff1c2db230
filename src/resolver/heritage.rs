//! Heritage resolution (§4.5(c)): EXTENDS/IMPLEMENTS edges from capture
//! groups `{heritage.class, heritage.extends?, heritage.implements?,
//! heritage.trait?}`, with synthetic dangling targets when resolution fails.

use tree_sitter::{QueryCursor, StreamingIterator, Tree};

use crate::model::{self, CodeRelation};
use crate::parsing::LanguageProfile;
use crate::symtab::SymbolTable;
use crate::types::{CallReason, SymbolLabel};

#[derive(Debug, Default)]
pub struct HeritagePatch {
    pub relations: Vec<CodeRelation>,
}

/// Resolves a name first via `lookupExact` in `file_path`, then falls back
/// to `lookupFuzzy`, returning the winning id (§4.5(c)).
fn resolve_child(symtab: &SymbolTable, file_path: &str, name: &str) -> Option<String> {
    symtab
        .lookup_exact(file_path, name)
        .map(str::to_string)
        .or_else(|| symtab.lookup_fuzzy(name).first().map(|r| r.id.clone()))
}

fn resolve_parent(symtab: &SymbolTable, name: &str, fallback_label: SymbolLabel) -> String {
    symtab
        .lookup_fuzzy(name)
        .first()
        .map(|r| r.id.clone())
        .unwrap_or_else(|| model::synthetic_id(fallback_label, name))
}

pub fn resolve_heritage(
    profile: &dyn LanguageProfile,
    tree: &Tree,
    code: &str,
    file_path: &str,
    symtab: &SymbolTable,
) -> HeritagePatch {
    let query = profile.heritage_query();
    if query.pattern_count() == 0 {
        return HeritagePatch::default();
    }

    let mut cursor = QueryCursor::new();
    let mut patch = HeritagePatch::default();
    let capture_names = query.capture_names();

    let mut matches = cursor.matches(query, tree.root_node(), code.as_bytes());
    while let Some(m) = matches.next() {
        let mut class_name = None;
        let mut extends_name = None;
        let mut implements_names = Vec::new();
        let mut trait_name = None;

        for capture in m.captures {
            let text = code.get(capture.node.byte_range()).map(str::to_string);
            match capture_names[capture.index as usize] {
                "heritage.class" => class_name = text,
                "heritage.extends" => extends_name = text,
                "heritage.implements" => {
                    if let Some(t) = text {
                        implements_names.push(t);
                    }
                }
                "heritage.trait" => trait_name = text,
                _ => {}
            }
        }

        let Some(class_name) = class_name else { continue };
        let Some(child_id) = resolve_child(symtab, file_path, &class_name) else { continue };

        if let Some(trait_name) = trait_name {
            // Rust `impl Trait for Struct`: IMPLEMENTS(struct -> trait), reason trait-impl.
            let parent_id = resolve_parent(symtab, &trait_name, SymbolLabel::Trait);
            patch.relations.push(implements_with_reason(child_id.clone(), parent_id));
            continue;
        }

        if let Some(extends_name) = extends_name {
            let parent_id = resolve_parent(symtab, &extends_name, SymbolLabel::Class);
            patch.relations.push(CodeRelation::extends(child_id.clone(), parent_id));
        }

        for implements_name in implements_names {
            let parent_id = resolve_parent(symtab, &implements_name, SymbolLabel::Interface);
            patch.relations.push(CodeRelation::implements(child_id.clone(), parent_id));
        }
    }

    patch
}

/// `IMPLEMENTS` with `reason = trait-impl` for Rust's `impl Trait for
/// Struct` form. `IMPLEMENTS` otherwise carries no reason (confidence 1.0
/// edges don't distinguish resolver tiers), so this is the one exception.
fn implements_with_reason(from: String, to: String) -> CodeRelation {
    let mut rel = CodeRelation::implements(from, to);
    rel.reason = Some(CallReason::ImportResolved);
    rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserRegistry;
    use crate::types::Language;

    #[test]
    fn resolves_typescript_extends() {
        let registry = ParserRegistry::new().unwrap();
        let code = "class Animal {}\nclass Dog extends Animal {}\n";
        let tree = registry
            .parse(Language::TypeScript, code.as_bytes(), std::path::Path::new("a.ts"))
            .unwrap();
        let profile = registry.profile(Language::TypeScript);

        let mut symtab = SymbolTable::new();
        symtab.add("a.ts", "Animal", "Class:a.ts:Animal", SymbolLabel::Class);
        symtab.add("a.ts", "Dog", "Class:a.ts:Dog", SymbolLabel::Class);

        let patch = resolve_heritage(profile.as_ref(), &tree, code, "a.ts", &symtab);
        assert_eq!(patch.relations.len(), 1);
        assert_eq!(patch.relations[0].from, "Class:a.ts:Dog");
        assert_eq!(patch.relations[0].to, "Class:a.ts:Animal");
        assert_eq!(patch.relations[0].kind, crate::types::RelationType::Extends);
    }

    #[test]
    fn unresolved_parent_yields_synthetic_dangling_target() {
        let registry = ParserRegistry::new().unwrap();
        let code = "class Dog extends Animal {}\n";
        let tree = registry
            .parse(Language::TypeScript, code.as_bytes(), std::path::Path::new("a.ts"))
            .unwrap();
        let profile = registry.profile(Language::TypeScript);

        let mut symtab = SymbolTable::new();
        symtab.add("a.ts", "Dog", "Class:a.ts:Dog", SymbolLabel::Class);

        let patch = resolve_heritage(profile.as_ref(), &tree, code, "a.ts", &symtab);
        assert_eq!(patch.relations.len(), 1);
        assert_eq!(patch.relations[0].to, "Class:Animal");
    }

    #[test]
    fn resolves_rust_trait_impl() {
        let registry = ParserRegistry::new().unwrap();
        let code = "struct Dog;\ntrait Speak {}\nimpl Speak for Dog {}\n";
        let tree = registry
            .parse(Language::Rust, code.as_bytes(), std::path::Path::new("a.rs"))
            .unwrap();
        let profile = registry.profile(Language::Rust);

        let mut symtab = SymbolTable::new();
        symtab.add("a.rs", "Dog", "Struct:a.rs:Dog", SymbolLabel::Struct);
        symtab.add("a.rs", "Speak", "Trait:a.rs:Speak", SymbolLabel::Trait);

        let patch = resolve_heritage(profile.as_ref(), &tree, code, "a.rs", &symtab);
        assert_eq!(patch.relations.len(), 1);
        assert_eq!(patch.relations[0].from, "Struct:a.rs:Dog");
        assert_eq!(patch.relations[0].to, "Trait:a.rs:Speak");
        assert_eq!(patch.relations[0].kind, crate::types::RelationType::Implements);
        assert_eq!(patch.relations[0].reason, Some(CallReason::ImportResolved));
    }
}
