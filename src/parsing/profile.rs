//! The `LanguageProfile` trait (§4.3, §4.5, SPEC_FULL [AMBIENT-4.1]):
//! everything the extractor and resolver need from a language, expressed as
//! tree-sitter capture queries plus a handful of per-language rules that
//! don't fit naturally into a query (exportedness, enclosing-function
//! unwrapping, doc-comment syntax).

use crate::types::Language;
use tree_sitter::{Node, Query};

pub trait LanguageProfile: Send + Sync {
    fn language(&self) -> Language;
    fn ts_language(&self) -> tree_sitter::Language;

    /// Query whose captures are `definition.<kind>` paired with a `name`
    /// capture in the same pattern (§4.3).
    fn definition_query(&self) -> &Query;

    /// Query whose captures include `import.source` (§4.5(a)).
    fn import_query(&self) -> &Query;

    /// Query whose captures include `call.name` (§4.5(b)).
    fn call_query(&self) -> &Query;

    /// Query whose captures include `heritage.class` plus optional
    /// `heritage.extends` / `heritage.implements` / `heritage.trait`
    /// (§4.5(c)).
    fn heritage_query(&self) -> &Query;

    /// Exportedness rule for a matched definition (§4.3). `node` is the
    /// definition node (not just the name node) so ancestor/sibling
    /// modifiers can be inspected.
    fn is_exported(&self, node: Node, code: &str, name: &str) -> bool;

    /// Node kinds that count as "enclosing function" when walking ancestors
    /// from a call site (§4.5(b)).
    fn enclosing_function_kinds(&self) -> &'static [&'static str];

    /// Doc-comment node kinds/line prefixes recognized by this language,
    /// used only for `CodeSymbol.description` population when present in
    /// source (best-effort, not part of any invariant).
    fn doc_comment_prefixes(&self) -> &'static [&'static str];

    /// Ordered candidate file extensions tried when resolving a relative
    /// import specifier (§4.5(a) item 1).
    fn relative_import_extensions(&self) -> &'static [&'static str];
}

/// Shared helper: true if any ancestor of `node` has `kind` among `kinds`.
pub fn ancestor_kind_is(node: Node, kinds: &[&str]) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if kinds.contains(&n.kind()) {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// Shared helper: true if any ancestor's source text contains `needle`
/// (used for modifier-list checks like "public"/"pub").
pub fn ancestor_text_contains(node: Node, code: &str, needle: &str) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if code.get(n.byte_range()).map(|t| t.contains(needle)).unwrap_or(false) {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// Shared helper: true if a sibling node of `kind` exists whose text
/// contains `needle` (e.g. a `modifiers` sibling containing "public").
pub fn sibling_kind_text_contains(node: Node, code: &str, kind: &str, needle: &str) -> bool {
    let Some(parent) = node.parent() else { return false };
    let mut cursor = parent.walk();
    parent.children(&mut cursor).any(|sib| {
        sib.kind() == kind && code.get(sib.byte_range()).map(|t| t.contains(needle)).unwrap_or(false)
    })
}
