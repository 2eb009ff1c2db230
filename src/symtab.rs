//! Symbol Table (§4.4): the two indices the resolver phases join against.
//!
//! Mirrors codanna's `SymbolCache` shape (exact + fuzzy maps built during a
//! single extraction pass) but keyed on string ids rather than interned
//! `SymbolId`s, since our graph nodes are string-addressed (§3).

use std::collections::HashMap;

use crate::types::SymbolLabel;

/// One entry in the fuzzy `byName` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef {
    pub id: String,
    pub file_path: String,
    pub label: SymbolLabel,
}

/// `byFile[path][name] -> id` plus `byName[name] -> [SymbolRef]` (§4.4).
///
/// Built incrementally during extraction (§4.3) and read by the reference
/// resolver (§4.5). If extraction is parallelized across a worker pool (§5),
/// callers are expected to shard a `SymbolTable` per worker and merge with
/// [`SymbolTable::merge`] at the phase join rather than share one behind a
/// lock per insert.
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_file: HashMap<String, HashMap<String, String>>,
    by_name: HashMap<String, Vec<SymbolRef>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolTableStats {
    pub file_count: usize,
    pub unique_names: usize,
    pub total_symbols: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file_path: &str, name: &str, id: &str, label: SymbolLabel) {
        self.by_file
            .entry(file_path.to_string())
            .or_default()
            .insert(name.to_string(), id.to_string());
        self.by_name.entry(name.to_string()).or_default().push(SymbolRef {
            id: id.to_string(),
            file_path: file_path.to_string(),
            label,
        });
    }

    /// Exact lookup within a single file (§4.4, used by same-file call
    /// resolution and the import resolver's intra-file shortcuts).
    pub fn lookup_exact(&self, file_path: &str, name: &str) -> Option<&str> {
        self.by_file.get(file_path)?.get(name).map(String::as_str)
    }

    /// Fuzzy global lookup: every symbol registered under `name`, in
    /// insertion order (§4.5(b) takes the first element on a fuzzy hit).
    pub fn lookup_fuzzy(&self, name: &str) -> &[SymbolRef] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self) -> SymbolTableStats {
        SymbolTableStats {
            file_count: self.by_file.len(),
            unique_names: self.by_name.len(),
            total_symbols: self.by_name.values().map(Vec::len).sum(),
        }
    }

    pub fn clear(&mut self) {
        self.by_file.clear();
        self.by_name.clear();
    }

    /// Absorb another table's entries, e.g. a per-worker shard at a phase
    /// join (§5).
    pub fn merge(&mut self, other: SymbolTable) {
        for (file_path, names) in other.by_file {
            let entry = self.by_file.entry(file_path).or_default();
            for (name, id) in names {
                entry.insert(name, id);
            }
        }
        for (name, refs) in other.by_name {
            self.by_name.entry(name).or_default().extend(refs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_is_scoped_to_file() {
        let mut table = SymbolTable::new();
        table.add("a.rs", "run", "Function:a.rs:run", SymbolLabel::Function);
        table.add("b.rs", "run", "Function:b.rs:run", SymbolLabel::Function);

        assert_eq!(table.lookup_exact("a.rs", "run"), Some("Function:a.rs:run"));
        assert_eq!(table.lookup_exact("b.rs", "run"), Some("Function:b.rs:run"));
        assert_eq!(table.lookup_exact("c.rs", "run"), None);
    }

    #[test]
    fn fuzzy_lookup_preserves_insertion_order_across_files() {
        let mut table = SymbolTable::new();
        table.add("a.rs", "run", "Function:a.rs:run", SymbolLabel::Function);
        table.add("b.rs", "run", "Function:b.rs:run", SymbolLabel::Function);

        let hits = table.lookup_fuzzy("run");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_path, "a.rs");
        assert_eq!(hits[1].file_path, "b.rs");
    }

    #[test]
    fn merge_combines_shards_from_parallel_workers() {
        let mut a = SymbolTable::new();
        a.add("a.rs", "run", "Function:a.rs:run", SymbolLabel::Function);
        let mut b = SymbolTable::new();
        b.add("b.rs", "run", "Function:b.rs:run", SymbolLabel::Function);

        a.merge(b);
        let stats = a.stats();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_symbols, 2);
        assert_eq!(a.lookup_fuzzy("run").len(), 2);
    }

    #[test]
    fn clear_empties_both_indices() {
        let mut table = SymbolTable::new();
        table.add("a.rs", "run", "Function:a.rs:run", SymbolLabel::Function);
        table.clear();
        assert_eq!(table.stats().total_symbols, 0);
        assert!(table.lookup_exact("a.rs", "run").is_none());
    }
}
