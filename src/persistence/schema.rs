//! SQLite schema (§6): one table per node kind plus the single
//! `CodeRelation` table, its `(from, to, type)` triple constrained by a
//! generated `CHECK` clause built from [`crate::graph`]'s declared schema
//! pairs (§6: "every pair actually emitted ... must be declared") so the two
//! enforcement points — in-memory Graph Store and on-disk schema — can never
//! drift apart.

use crate::graph::SCHEMA_PAIRS;

const NODE_TABLES_DDL: &str = "
CREATE TABLE IF NOT EXISTS File (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    content TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS Folder (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS CodeSymbol (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    content TEXT NOT NULL,
    is_exported INTEGER NOT NULL,
    description TEXT
);
CREATE TABLE IF NOT EXISTS Community (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    heuristic_label TEXT NOT NULL,
    keywords TEXT NOT NULL,
    description TEXT NOT NULL,
    enriched_by TEXT NOT NULL,
    cohesion REAL NOT NULL,
    symbol_count INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS Process (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    heuristic_label TEXT NOT NULL,
    process_type TEXT NOT NULL,
    step_count INTEGER NOT NULL,
    communities TEXT NOT NULL,
    entry_point_id TEXT NOT NULL,
    terminal_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_codesymbol_file_path ON CodeSymbol(file_path);
CREATE INDEX IF NOT EXISTS idx_codesymbol_name ON CodeSymbol(name);
";

/// GLOB pattern matching the id prefix for a given table label, mirroring
/// `graph::label_of_id`'s inverse.
fn id_glob(label: &str) -> String {
    match label {
        "Community" => "comm_*".to_string(),
        "Process" => "proc_*".to_string(),
        other => format!("{other}:*"),
    }
}

/// Builds the `CodeRelation` table DDL, with a `CHECK` clause that is the
/// disjunction of every declared `(fromLabel, toLabel, type)` triple.
fn relation_table_ddl() -> String {
    let mut clauses = Vec::with_capacity(SCHEMA_PAIRS.len());
    for (from_label, to_label, kind) in SCHEMA_PAIRS {
        clauses.push(format!(
            "(from_id GLOB '{}' AND to_id GLOB '{}' AND type = '{}')",
            id_glob(from_label),
            id_glob(to_label),
            kind.as_str(),
        ));
    }
    let check = clauses.join(" OR ");
    format!(
        "CREATE TABLE IF NOT EXISTS CodeRelation (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    type TEXT NOT NULL,
    confidence REAL NOT NULL,
    reason TEXT,
    step INTEGER,
    CHECK ({check})
);
CREATE INDEX IF NOT EXISTS idx_coderelation_from ON CodeRelation(from_id);
CREATE INDEX IF NOT EXISTS idx_coderelation_to ON CodeRelation(to_id);
CREATE TABLE IF NOT EXISTS CodeEmbedding (
    node_id TEXT PRIMARY KEY,
    embedding TEXT NOT NULL
);
"
    )
}

/// Full schema DDL, node tables followed by the relation/embedding tables.
pub fn full_schema_ddl() -> String {
    format!("{NODE_TABLES_DDL}\n{}", relation_table_ddl())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_contains_every_declared_pair() {
        let ddl = full_schema_ddl();
        for (from_label, to_label, kind) in SCHEMA_PAIRS {
            let needle = format!("from_id GLOB '{}' AND to_id GLOB '{}' AND type = '{}'", id_glob(from_label), id_glob(to_label), kind.as_str());
            assert!(ddl.contains(&needle), "missing check clause for {from_label} -> {to_label} ({kind:?})");
        }
    }
}
