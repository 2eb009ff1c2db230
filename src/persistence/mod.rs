//! Persistence (§4.10, §6, §7): stages a full build in a scratch directory,
//! then atomically swaps it into place so a crash mid-build never corrupts
//! the previous good index (§7 `PersistenceError`: "the staging directory is
//! discarded; the previous artifact is left untouched").

pub mod meta;
pub mod schema;
pub mod sqlite_store;

use std::path::{Path, PathBuf};

use crate::csvbuild;
use crate::error::{PersistError, PersistResult};
use crate::graph::GraphStore;
use crate::model::{
    CodeEmbeddingNode, CodeRelation, CodeSymbolNode, CommunityNode, EnrichedBy, FileNode, FolderNode, GraphNode,
    ProcessNode, ProcessType,
};
use crate::types::{CallReason, RelationType, SymbolLabel};
use crate::vector::VectorIndex;

pub use meta::{Meta, Stats};

const NODE_CSV_TABLES: &[&str] = &["File", "Folder", "Community", "Process"];

/// Persists `store` (plus vector embeddings) into `data_dir`, building
/// everything in a sibling staging directory first and swapping it in only
/// on full success.
pub fn persist(
    store: &GraphStore,
    embeddings: &[CodeEmbeddingNode],
    bm25_json: &str,
    repo_root: &Path,
    snippet_cap: usize,
    data_dir: &Path,
    meta: &Meta,
) -> PersistResult<()> {
    let staging = data_dir.with_extension("staging");
    if staging.exists() {
        std::fs::remove_dir_all(&staging)
            .map_err(|source| PersistError::StagingCreate { path: staging.clone(), source })?;
    }
    std::fs::create_dir_all(&staging).map_err(|source| PersistError::StagingCreate { path: staging.clone(), source })?;

    let result = build_staging(store, embeddings, bm25_json, repo_root, snippet_cap, &staging, meta);
    if result.is_err() {
        std::fs::remove_dir_all(&staging).ok();
        return result;
    }

    swap_in(&staging, data_dir)
}

fn build_staging(
    store: &GraphStore,
    embeddings: &[CodeEmbeddingNode],
    bm25_json: &str,
    repo_root: &Path,
    snippet_cap: usize,
    staging: &Path,
    meta: &Meta,
) -> PersistResult<()> {
    let csv_dir = staging.join("csv");
    let nodes: Vec<_> = store.nodes().cloned().collect();
    let relations: Vec<CodeRelation> = store.relations().cloned().collect();

    csvbuild::build_csvs(&nodes, &relations, repo_root, snippet_cap, &csv_dir)
        .map_err(|source| PersistError::CsvWrite { table: "*".to_string(), source })?;

    let db_path = staging.join("graph.sqlite3");
    let mut conn = sqlite_store::open(&db_path)?;
    sqlite_store::install_schema(&conn)?;

    for table in NODE_CSV_TABLES {
        let path = csv_dir.join(format!("{table}.csv"));
        if path.exists() {
            sqlite_store::bulk_load_csv(&mut conn, table, &path)?;
        }
    }
    for label in symbol_label_names() {
        let path = csv_dir.join(format!("{label}.csv"));
        if path.exists() {
            sqlite_store::bulk_load_csv(&mut conn, "CodeSymbol", &path)?;
        }
    }
    let relations_path = csv_dir.join("relations.csv");
    if relations_path.exists() {
        sqlite_store::bulk_load_csv(&mut conn, "CodeRelation", &relations_path)?;
    }

    load_embeddings(&conn, embeddings)?;

    std::fs::write(staging.join("bm25.json"), bm25_json)
        .map_err(|source| PersistError::CsvWrite { table: "bm25.json".to_string(), source })?;

    meta.write(&staging.join("meta.json"))
        .map_err(|source| PersistError::CsvWrite { table: "meta.json".to_string(), source })?;

    Ok(())
}

fn load_embeddings(conn: &rusqlite::Connection, embeddings: &[CodeEmbeddingNode]) -> PersistResult<()> {
    let mut stmt = conn
        .prepare("INSERT OR REPLACE INTO CodeEmbedding (node_id, embedding) VALUES (?1, ?2)")
        .map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })?;
    for record in embeddings {
        let json = serde_json::to_string(&record.embedding).unwrap_or_default();
        stmt.execute(rusqlite::params![record.node_id, json])
            .map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })?;
    }
    Ok(())
}

fn symbol_label_names() -> Vec<&'static str> {
    use crate::types::SymbolLabel::*;
    [
        Function, Class, Interface, Method, CodeElement, Struct, Enum, Macro, Typedef, Union, Namespace, Trait,
        Impl, TypeAlias, Const, Static, Property, Record, Delegate, Annotation, Constructor, Template, Module,
    ]
    .iter()
    .map(|l| l.as_str())
    .collect()
}

fn swap_in(staging: &Path, data_dir: &Path) -> PersistResult<()> {
    let backup: PathBuf = data_dir.with_extension("previous");
    if data_dir.exists() {
        std::fs::remove_dir_all(&backup).ok();
        std::fs::rename(data_dir, &backup)
            .map_err(|source| PersistError::StagingSwap { path: data_dir.to_path_buf(), source })?;
    }
    match std::fs::rename(staging, data_dir) {
        Ok(()) => {
            std::fs::remove_dir_all(&backup).ok();
            Ok(())
        }
        Err(source) => {
            if backup.exists() {
                std::fs::rename(&backup, data_dir).ok();
            }
            Err(PersistError::StagingSwap { path: data_dir.to_path_buf(), source })
        }
    }
}

/// Loads the BM25 index blob persisted alongside the graph (§4.8, §6).
pub fn load_bm25_index(data_dir: &Path) -> PersistResult<crate::bm25::Bm25Index> {
    let text = std::fs::read_to_string(data_dir.join("bm25.json"))
        .map_err(|source| PersistError::CsvWrite { table: "bm25.json".to_string(), source })?;
    serde_json::from_str(&text).map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })
}

/// Reconstructs a [`GraphStore`] from the persisted SQLite tables (§4.11,
/// §6): reads every node table plus `CodeRelation`, in node-then-edge order
/// so `add_relation`'s endpoint lookups always succeed. Dangling heritage
/// targets were already materialized as real `CodeSymbol` placeholder rows
/// at persist time (§4.5(c)), so no `add_dangling_relation` path is needed
/// here.
pub fn load_graph_store(conn: &rusqlite::Connection) -> PersistResult<GraphStore> {
    let mut store = GraphStore::new();

    let mut files = conn
        .prepare("SELECT id, name, file_path, content FROM File")
        .map_err(schema_err)?;
    let rows = files
        .query_map([], |row| {
            Ok(GraphNode::File(FileNode {
                id: row.get(0)?,
                name: row.get(1)?,
                file_path: row.get(2)?,
                content: row.get(3)?,
            }))
        })
        .map_err(schema_err)?;
    for row in rows {
        store.upsert_node(row.map_err(schema_err)?);
    }

    let mut folders = conn
        .prepare("SELECT id, name, file_path FROM Folder")
        .map_err(schema_err)?;
    let rows = folders
        .query_map([], |row| {
            Ok(GraphNode::Folder(FolderNode { id: row.get(0)?, name: row.get(1)?, file_path: row.get(2)? }))
        })
        .map_err(schema_err)?;
    for row in rows {
        store.upsert_node(row.map_err(schema_err)?);
    }

    let mut symbols = conn
        .prepare(
            "SELECT id, label, name, file_path, start_line, end_line, content, is_exported, description FROM CodeSymbol",
        )
        .map_err(schema_err)?;
    let rows = symbols
        .query_map([], |row| {
            let label: String = row.get(1)?;
            Ok(GraphNode::Symbol(CodeSymbolNode {
                id: row.get(0)?,
                label: parse_symbol_label(&label),
                name: row.get(2)?,
                file_path: row.get(3)?,
                start_line: row.get(4)?,
                end_line: row.get(5)?,
                content: row.get(6)?,
                is_exported: row.get::<_, i64>(7)? != 0,
                description: row.get(8)?,
            }))
        })
        .map_err(schema_err)?;
    for row in rows {
        store.upsert_node(row.map_err(schema_err)?);
    }

    let mut communities = conn
        .prepare(
            "SELECT id, label, heuristic_label, keywords, description, enriched_by, cohesion, symbol_count FROM Community",
        )
        .map_err(schema_err)?;
    let rows = communities
        .query_map([], |row| {
            let keywords: String = row.get(3)?;
            let enriched_by: String = row.get(5)?;
            Ok(GraphNode::Community(CommunityNode {
                id: row.get(0)?,
                label: row.get(1)?,
                heuristic_label: row.get(2)?,
                keywords: split_list(&keywords),
                description: row.get(4)?,
                enriched_by: if enriched_by == "Llm" { EnrichedBy::Llm } else { EnrichedBy::Heuristic },
                cohesion: row.get(6)?,
                symbol_count: row.get::<_, i64>(7)? as usize,
            }))
        })
        .map_err(schema_err)?;
    for row in rows {
        store.upsert_node(row.map_err(schema_err)?);
    }

    let mut processes = conn
        .prepare(
            "SELECT id, label, heuristic_label, process_type, step_count, communities, entry_point_id, terminal_id FROM Process",
        )
        .map_err(schema_err)?;
    let rows = processes
        .query_map([], |row| {
            let process_type: String = row.get(3)?;
            let communities: String = row.get(5)?;
            Ok(GraphNode::Process(ProcessNode {
                id: row.get(0)?,
                label: row.get(1)?,
                heuristic_label: row.get(2)?,
                process_type: if process_type == "cross-community" {
                    ProcessType::CrossCommunity
                } else {
                    ProcessType::IntraCommunity
                },
                step_count: row.get::<_, i64>(4)? as usize,
                communities: split_list(&communities),
                entry_point_id: row.get(6)?,
                terminal_id: row.get(7)?,
            }))
        })
        .map_err(schema_err)?;
    for row in rows {
        store.upsert_node(row.map_err(schema_err)?);
    }

    let mut relations = conn
        .prepare("SELECT from_id, to_id, type, confidence, reason, step FROM CodeRelation")
        .map_err(schema_err)?;
    let rows = relations
        .query_map([], |row| {
            let kind: String = row.get(2)?;
            let reason: Option<String> = row.get(4)?;
            let step: Option<i64> = row.get(5)?;
            Ok(CodeRelation {
                from: row.get(0)?,
                to: row.get(1)?,
                kind: parse_relation_type(&kind),
                confidence: row.get(3)?,
                reason: reason.as_deref().and_then(parse_call_reason),
                step: step.map(|s| s as u32),
            })
        })
        .map_err(schema_err)?;
    for row in rows {
        let relation = row.map_err(schema_err)?;
        store.add_relation(relation).map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })?;
    }

    Ok(store)
}

fn schema_err(e: rusqlite::Error) -> PersistError {
    PersistError::SchemaInstall { reason: e.to_string() }
}

fn split_list(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split(';').map(str::to_string).collect()
    }
}

fn parse_symbol_label(s: &str) -> SymbolLabel {
    use SymbolLabel::*;
    match s {
        "Function" => Function,
        "Class" => Class,
        "Interface" => Interface,
        "Method" => Method,
        "Struct" => Struct,
        "Enum" => Enum,
        "Macro" => Macro,
        "Typedef" => Typedef,
        "Union" => Union,
        "Namespace" => Namespace,
        "Trait" => Trait,
        "Impl" => Impl,
        "TypeAlias" => TypeAlias,
        "Const" => Const,
        "Static" => Static,
        "Property" => Property,
        "Record" => Record,
        "Delegate" => Delegate,
        "Annotation" => Annotation,
        "Constructor" => Constructor,
        "Template" => Template,
        "Module" => Module,
        _ => CodeElement,
    }
}

fn parse_relation_type(s: &str) -> RelationType {
    use RelationType::*;
    match s {
        "CONTAINS" => Contains,
        "DEFINES" => Defines,
        "IMPORTS" => Imports,
        "EXTENDS" => Extends,
        "IMPLEMENTS" => Implements,
        "MEMBER_OF" => MemberOf,
        "STEP_IN_PROCESS" => StepInProcess,
        _ => Calls,
    }
}

fn parse_call_reason(s: &str) -> Option<CallReason> {
    match s {
        "import-resolved" => Some(CallReason::ImportResolved),
        "same-file" => Some(CallReason::SameFile),
        "fuzzy-global" => Some(CallReason::FuzzyGlobal),
        _ => None,
    }
}

/// Reconstructs a [`VectorIndex`] from the persisted `CodeEmbedding` table,
/// replaying only records whose node id is still present in `store` (§4.9).
pub fn load_vector_index(conn: &rusqlite::Connection, dimension: usize, store: &GraphStore) -> PersistResult<VectorIndex> {
    let mut stmt = conn
        .prepare("SELECT node_id, embedding FROM CodeEmbedding")
        .map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })?;
    let records: Vec<CodeEmbeddingNode> = stmt
        .query_map([], |row| {
            let node_id: String = row.get(0)?;
            let json: String = row.get(1)?;
            let embedding: Vec<f32> = serde_json::from_str(&json).unwrap_or_default();
            Ok(CodeEmbeddingNode { node_id, embedding })
        })
        .map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })?
        .filter_map(Result::ok)
        .collect();

    let live_ids: std::collections::HashSet<String> = store.nodes().map(|n| n.id().to_string()).collect();
    Ok(VectorIndex::rebuild(dimension, records, &live_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{file_id, FileNode, GraphNode};

    #[test]
    fn persists_then_swaps_into_place() {
        let dir = std::env::temp_dir().join(format!("gitnexus-persist-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let repo_root = dir.join("repo");
        std::fs::create_dir_all(&repo_root).unwrap();

        let mut store = GraphStore::new();
        store.upsert_node(GraphNode::File(FileNode {
            id: file_id("a.ts"),
            name: "a.ts".to_string(),
            file_path: "a.ts".to_string(),
            content: "export function foo() {}".to_string(),
        }));

        let data_dir = dir.join("data");
        let meta = Meta {
            repo_path: repo_root.to_string_lossy().into_owned(),
            last_commit: Some("abc".to_string()),
            indexed_at: chrono::Utc::now(),
            stats: Stats { files: 1, nodes: 1, edges: 0, communities: 0, processes: 0 },
        };

        persist(&store, &[], "{}", &repo_root, 5000, &data_dir, &meta).unwrap();
        assert!(data_dir.join("graph.sqlite3").exists());
        assert!(data_dir.join("meta.json").exists());
        assert!(data_dir.join("bm25.json").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_graph_store_round_trips_nodes_and_relations() {
        use crate::model::{symbol_id, CodeSymbolNode};
        use crate::types::{CallReason, SymbolLabel};

        let dir = std::env::temp_dir().join(format!("gitnexus-reload-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let repo_root = dir.join("repo");
        std::fs::create_dir_all(&repo_root).unwrap();

        let mut store = GraphStore::new();
        store.upsert_node(GraphNode::File(FileNode {
            id: file_id("a.ts"),
            name: "a.ts".to_string(),
            file_path: "a.ts".to_string(),
            content: "export function foo() { bar(); }\nexport function bar() {}".to_string(),
        }));
        store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
            id: symbol_id(SymbolLabel::Function, "a.ts", "foo"),
            label: SymbolLabel::Function,
            name: "foo".to_string(),
            file_path: "a.ts".to_string(),
            start_line: 0,
            end_line: 0,
            content: "export function foo() { bar(); }".to_string(),
            is_exported: true,
            description: None,
        }));
        store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
            id: symbol_id(SymbolLabel::Function, "a.ts", "bar"),
            label: SymbolLabel::Function,
            name: "bar".to_string(),
            file_path: "a.ts".to_string(),
            start_line: 1,
            end_line: 1,
            content: "export function bar() {}".to_string(),
            is_exported: true,
            description: None,
        }));
        store
            .add_relation(CodeRelation::defines(file_id("a.ts"), symbol_id(SymbolLabel::Function, "a.ts", "foo")))
            .unwrap();
        store
            .add_relation(CodeRelation::calls(
                symbol_id(SymbolLabel::Function, "a.ts", "foo"),
                symbol_id(SymbolLabel::Function, "a.ts", "bar"),
                0.85,
                CallReason::SameFile,
            ))
            .unwrap();

        let data_dir = dir.join("data");
        let meta = Meta {
            repo_path: repo_root.to_string_lossy().into_owned(),
            last_commit: None,
            indexed_at: chrono::Utc::now(),
            stats: Stats { files: 1, nodes: 3, edges: 2, communities: 0, processes: 0 },
        };
        persist(&store, &[], "{}", &repo_root, 5000, &data_dir, &meta).unwrap();

        let conn = sqlite_store::open(&data_dir.join("graph.sqlite3")).unwrap();
        let reloaded = load_graph_store(&conn).unwrap();
        assert_eq!(reloaded.node_count(), 3);
        assert_eq!(reloaded.edge_count(), 2);

        let callees = reloaded.outgoing(&symbol_id(SymbolLabel::Function, "a.ts", "foo"), RelationType::Calls);
        assert_eq!(callees, vec![symbol_id(SymbolLabel::Function, "a.ts", "bar")]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
