//! Call resolution (§4.5(b)): enclosing-function detection plus the fixed
//! three-tier resolution priority (import-resolved > same-file > fuzzy-global).

use std::collections::HashSet;

use tree_sitter::{Node, QueryCursor, StreamingIterator, Tree};

use crate::model::CodeRelation;
use crate::parsing::LanguageProfile;
use crate::resolver::imports::ImportMap;
use crate::resolver::stoplist::is_call_builtin;
use crate::symtab::SymbolTable;
use crate::types::CallReason;

#[derive(Debug, Default)]
pub struct CallPatch {
    pub relations: Vec<CodeRelation>,
}

/// Walks ancestors of `call_name_node` for the innermost node whose kind is
/// one of `profile.enclosing_function_kinds()`, then reads its name from a
/// `name` field or its first identifier-like child (§4.5(b)).
fn enclosing_function_name(profile: &dyn LanguageProfile, call_name_node: Node, code: &str) -> Option<String> {
    let kinds = profile.enclosing_function_kinds();
    let mut cur = call_name_node.parent();
    while let Some(n) = cur {
        if kinds.contains(&n.kind()) {
            if let Some(name_node) = n.child_by_field_name("name") {
                return code.get(name_node.byte_range()).map(str::to_string);
            }
            let mut cursor = n.walk();
            if let Some(ident) = n.children(&mut cursor).find(|c| c.kind().ends_with("identifier")) {
                return code.get(ident.byte_range()).map(str::to_string);
            }
            return None;
        }
        cur = n.parent();
    }
    None
}

/// Runs the call query for `profile` over `tree`/`code` in file `file_path`
/// (whose node id is `file_id`), resolving each call against `symtab` and
/// `import_map`. Caller supplies `dedup`, a per-source `(RelationType, from,
/// to)` set shared across the whole resolver pass, to honor the "no
/// duplicate edge within a source" rule (§4.5(b)).
#[allow(clippy::too_many_arguments)]
pub fn resolve_calls(
    profile: &dyn LanguageProfile,
    tree: &Tree,
    code: &str,
    file_path: &str,
    file_id: &str,
    symtab: &SymbolTable,
    import_map: &ImportMap,
    dedup: &mut HashSet<(crate::types::RelationType, String, String)>,
) -> CallPatch {
    let query = profile.call_query();
    let mut cursor = QueryCursor::new();
    let mut patch = CallPatch::default();

    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, tree.root_node(), code.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture_names[capture.index as usize] != "call.name" {
                continue;
            }
            let Some(name) = code.get(capture.node.byte_range()) else { continue };
            if is_call_builtin(name) {
                continue;
            }

            let source_id = enclosing_function_name(profile, capture.node, code)
                .and_then(|fn_name| symtab.lookup_exact(file_path, &fn_name))
                .map(str::to_string)
                .unwrap_or_else(|| file_id.to_string());

            let Some((target_id, confidence, reason)) =
                resolve_target(file_path, name, symtab, import_map)
            else {
                continue;
            };

            let identity = (crate::types::RelationType::Calls, source_id.clone(), target_id.clone());
            if !dedup.insert(identity) {
                continue;
            }
            patch.relations.push(CodeRelation::calls(source_id, target_id, confidence, reason));
        }
    }

    patch
}

fn resolve_target(
    caller_file: &str,
    name: &str,
    symtab: &SymbolTable,
    import_map: &ImportMap,
) -> Option<(String, f64, CallReason)> {
    if let Some(targets) = import_map.get(caller_file) {
        for target_file in targets {
            if let Some(id) = symtab.lookup_exact(target_file, name) {
                return Some((id.to_string(), 0.9, CallReason::ImportResolved));
            }
        }
    }

    if let Some(id) = symtab.lookup_exact(caller_file, name) {
        return Some((id.to_string(), 0.85, CallReason::SameFile));
    }

    let hits = symtab.lookup_fuzzy(name);
    if let Some(first) = hits.first() {
        let confidence = if hits.len() == 1 { 0.5 } else { 0.3 };
        return Some((first.id.clone(), confidence, CallReason::FuzzyGlobal));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserRegistry;
    use crate::types::{Language, SymbolLabel};

    #[test]
    fn resolves_same_file_call() {
        let registry = ParserRegistry::new().unwrap();
        let code = "export function foo() {}\nexport function bar() { foo(); }\n";
        let tree = registry.parse(Language::TypeScript, code.as_bytes(), std::path::Path::new("app/a.ts")).unwrap();
        let profile = registry.profile(Language::TypeScript);

        let mut symtab = SymbolTable::new();
        symtab.add("app/a.ts", "foo", "Function:app/a.ts:foo", SymbolLabel::Function);
        symtab.add("app/a.ts", "bar", "Function:app/a.ts:bar", SymbolLabel::Function);

        let import_map = ImportMap::new();
        let mut dedup = HashSet::new();
        let patch = resolve_calls(
            profile.as_ref(),
            &tree,
            code,
            "app/a.ts",
            "File:app/a.ts",
            &symtab,
            &import_map,
            &mut dedup,
        );

        assert_eq!(patch.relations.len(), 1);
        let rel = &patch.relations[0];
        assert_eq!(rel.from, "Function:app/a.ts:bar");
        assert_eq!(rel.to, "Function:app/a.ts:foo");
        assert_eq!(rel.confidence, 0.85);
        assert_eq!(rel.reason, Some(CallReason::SameFile));
    }

    #[test]
    fn builtin_calls_are_skipped() {
        let registry = ParserRegistry::new().unwrap();
        let code = "export function bar() { console.log('x'); }\n";
        let tree = registry.parse(Language::TypeScript, code.as_bytes(), std::path::Path::new("app/a.ts")).unwrap();
        let profile = registry.profile(Language::TypeScript);

        let mut symtab = SymbolTable::new();
        symtab.add("app/a.ts", "bar", "Function:app/a.ts:bar", SymbolLabel::Function);

        let import_map = ImportMap::new();
        let mut dedup = HashSet::new();
        let patch = resolve_calls(
            profile.as_ref(),
            &tree,
            code,
            "app/a.ts",
            "File:app/a.ts",
            &symtab,
            &import_map,
            &mut dedup,
        );

        assert!(patch.relations.is_empty());
    }
}
