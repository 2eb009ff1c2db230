//! `cypher(q)` pass-through (§4.11). There is no embedded Cypher-capable
//! graph database in this stack (the Graph Store is a bespoke `petgraph`
//! structure, persisted to plain relational tables) so this module is a
//! small, hand-rolled interpreter for the subset of read patterns the
//! query surface needs, executed directly against the in-memory
//! [`GraphStore`]:
//!
//! ```text
//! MATCH (n:Label) [WHERE n.field = 'value'] RETURN n [LIMIT k]
//! MATCH (a:Label)-[:REL_TYPE]->(b:Label) [WHERE a.field = 'value'] RETURN a, b [LIMIT k]
//! ```
//!
//! Anything outside this grammar is rejected with [`CypherError::Unsupported`]
//! rather than silently misinterpreted.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::GraphStore;
use crate::model::GraphNode;
use crate::types::RelationType;

const DEFAULT_LIMIT: usize = 1000;

#[derive(Error, Debug)]
pub enum CypherError {
    #[error("unsupported cypher query: {0}")]
    Unsupported(String),

    #[error("query returns undeclared variable '{0}'")]
    UnknownVariable(String),
}

/// A node projected into a query result: just enough to identify and label
/// it, not the full node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub label: String,
    pub name: String,
}

/// One result row: the bound variable name alongside the node it matched,
/// in `RETURN`-clause order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub columns: Vec<(String, NodeSummary)>,
}

pub fn execute(store: &GraphStore, query: &str) -> Result<Vec<Row>, CypherError> {
    if let Some(caps) = two_node_pattern().captures(query) {
        return execute_two_node(store, &caps);
    }
    if let Some(caps) = single_node_pattern().captures(query) {
        return execute_single_node(store, &caps);
    }
    Err(CypherError::Unsupported(query.to_string()))
}

fn single_node_pattern() -> Regex {
    Regex::new(
        r"(?ix)
        ^\s*MATCH\s*
        \(\s*(?P<var>[A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?P<label>[A-Za-z_][A-Za-z0-9_]*)\s*\)
        \s*(?:WHERE\s+(?P<where_var>[A-Za-z_][A-Za-z0-9_]*)\.(?P<where_field>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*'(?P<where_value>[^']*)')?
        \s*RETURN\s+(?P<ret>[A-Za-z0-9_,\s]+?)
        \s*(?:LIMIT\s+(?P<limit>\d+))?\s*$
        ",
    )
    .expect("valid single-node cypher pattern")
}

fn two_node_pattern() -> Regex {
    Regex::new(
        r"(?ix)
        ^\s*MATCH\s*
        \(\s*(?P<a_var>[A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?P<a_label>[A-Za-z_][A-Za-z0-9_]*)\s*\)
        \s*-\[\s*:\s*(?P<rel>[A-Za-z_][A-Za-z0-9_]*)\s*\]->\s*
        \(\s*(?P<b_var>[A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?P<b_label>[A-Za-z_][A-Za-z0-9_]*)\s*\)
        \s*(?:WHERE\s+(?P<where_var>[A-Za-z_][A-Za-z0-9_]*)\.(?P<where_field>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*'(?P<where_value>[^']*)')?
        \s*RETURN\s+(?P<ret>[A-Za-z0-9_,\s]+?)
        \s*(?:LIMIT\s+(?P<limit>\d+))?\s*$
        ",
    )
    .expect("valid two-node cypher pattern")
}

fn execute_single_node(store: &GraphStore, caps: &Captures<'_>) -> Result<Vec<Row>, CypherError> {
    let var = caps["var"].to_string();
    let label = &caps["label"];
    let where_filter = where_clause(caps);
    parse_return_columns(&caps["ret"], &[var.as_str()])?;
    let limit = parse_limit(caps);

    let mut rows = Vec::new();
    for node in store.nodes() {
        if node.table_label() != label {
            continue;
        }
        let summary = summarize(node);
        if let Some((field_var, field, value)) = &where_filter {
            if field_var == &var && !matches_field(&summary, field, value) {
                continue;
            }
        }
        rows.push(Row { columns: vec![(var.clone(), summary)] });
        if rows.len() >= limit {
            break;
        }
    }
    Ok(rows)
}

fn execute_two_node(store: &GraphStore, caps: &Captures<'_>) -> Result<Vec<Row>, CypherError> {
    let a_var = caps["a_var"].to_string();
    let a_label = &caps["a_label"];
    let rel_name = &caps["rel"];
    let b_var = caps["b_var"].to_string();
    let b_label = &caps["b_label"];
    let where_filter = where_clause(caps);
    let requested = parse_return_columns(&caps["ret"], &[a_var.as_str(), b_var.as_str()])?;
    let limit = parse_limit(caps);

    let Some(kind) = relation_type_from_str(rel_name) else {
        return Err(CypherError::Unsupported(format!("unknown relationship type '{rel_name}'")));
    };

    let mut rows = Vec::new();
    'outer: for a_node in store.nodes() {
        if a_node.table_label() != a_label {
            continue;
        }
        let a_summary = summarize(a_node);
        if let Some((field_var, field, value)) = &where_filter {
            if field_var == &a_var && !matches_field(&a_summary, field, value) {
                continue;
            }
        }

        for target_id in store.outgoing(a_node.id(), kind) {
            let Some(b_node) = store.get_node(target_id) else { continue };
            if b_node.table_label() != b_label {
                continue;
            }
            let b_summary = summarize(b_node);
            if let Some((field_var, field, value)) = &where_filter {
                if field_var == &b_var && !matches_field(&b_summary, field, value) {
                    continue;
                }
            }

            let bound = [(a_var.as_str(), &a_summary), (b_var.as_str(), &b_summary)];
            let columns = requested
                .iter()
                .filter_map(|r| {
                    bound.iter().find(|pair| pair.0 == r.as_str()).map(|pair| (pair.0.to_string(), pair.1.clone()))
                })
                .collect();
            rows.push(Row { columns });
            if rows.len() >= limit {
                break 'outer;
            }
        }
    }
    Ok(rows)
}

fn where_clause(caps: &Captures<'_>) -> Option<(String, String, String)> {
    let var = caps.name("where_var")?.as_str().to_string();
    let field = caps.name("where_field")?.as_str().to_string();
    let value = caps.name("where_value")?.as_str().to_string();
    Some((var, field, value))
}

fn matches_field(summary: &NodeSummary, field: &str, value: &str) -> bool {
    match field {
        "name" => summary.name == value,
        "id" => summary.id == value,
        "label" => summary.label == value,
        _ => false,
    }
}

fn parse_return_columns(ret: &str, known: &[&str]) -> Result<Vec<String>, CypherError> {
    let requested: Vec<String> = ret.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    for r in &requested {
        if !known.contains(&r.as_str()) {
            return Err(CypherError::UnknownVariable(r.clone()));
        }
    }
    Ok(requested)
}

fn parse_limit(caps: &Captures<'_>) -> usize {
    caps.name("limit").and_then(|m| m.as_str().parse::<usize>().ok()).unwrap_or(DEFAULT_LIMIT)
}

fn relation_type_from_str(s: &str) -> Option<RelationType> {
    match s.to_ascii_uppercase().as_str() {
        "CONTAINS" => Some(RelationType::Contains),
        "DEFINES" => Some(RelationType::Defines),
        "IMPORTS" => Some(RelationType::Imports),
        "CALLS" => Some(RelationType::Calls),
        "EXTENDS" => Some(RelationType::Extends),
        "IMPLEMENTS" => Some(RelationType::Implements),
        "MEMBER_OF" => Some(RelationType::MemberOf),
        "STEP_IN_PROCESS" => Some(RelationType::StepInProcess),
        _ => None,
    }
}

fn summarize(node: &GraphNode) -> NodeSummary {
    let label = node.table_label().to_string();
    let name = match node {
        GraphNode::File(n) => n.name.clone(),
        GraphNode::Folder(n) => n.name.clone(),
        GraphNode::Symbol(n) => n.name.clone(),
        GraphNode::Community(n) => n.label.clone(),
        GraphNode::Process(n) => n.label.clone(),
    };
    NodeSummary { id: node.id().to_string(), label, name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{file_id, symbol_id, FileNode};
    use crate::types::SymbolLabel;

    fn sample_store() -> GraphStore {
        use crate::model::CodeSymbolNode;

        let mut store = GraphStore::new();
        store.upsert_node(GraphNode::File(FileNode {
            id: file_id("app/a.ts"),
            name: "a.ts".to_string(),
            file_path: "app/a.ts".to_string(),
            content: String::new(),
        }));
        store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
            id: symbol_id(SymbolLabel::Function, "app/a.ts", "foo"),
            label: SymbolLabel::Function,
            name: "foo".to_string(),
            file_path: "app/a.ts".to_string(),
            start_line: 0,
            end_line: 1,
            content: String::new(),
            is_exported: true,
            description: None,
        }));
        store
            .add_relation(crate::model::CodeRelation::defines(
                file_id("app/a.ts"),
                symbol_id(SymbolLabel::Function, "app/a.ts", "foo"),
            ))
            .unwrap();
        store
    }

    #[test]
    fn matches_single_node_by_label() {
        let store = sample_store();
        let rows = execute(&store, "MATCH (n:Function) RETURN n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns[0].1.name, "foo");
    }

    #[test]
    fn where_clause_filters_by_name() {
        let store = sample_store();
        let rows = execute(&store, "MATCH (n:Function) WHERE n.name = 'missing' RETURN n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn traverses_a_declared_relationship() {
        let store = sample_store();
        let rows = execute(&store, "MATCH (a:File)-[:DEFINES]->(b:Function) RETURN a, b LIMIT 10").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns.len(), 2);
        assert_eq!(rows[0].columns[1].1.name, "foo");
    }

    #[test]
    fn unsupported_query_is_rejected_rather_than_misparsed() {
        let store = sample_store();
        let err = execute(&store, "CREATE (n:Function) RETURN n").unwrap_err();
        assert!(matches!(err, CypherError::Unsupported(_)));
    }

    #[test]
    fn unknown_return_variable_is_rejected() {
        let store = sample_store();
        let err = execute(&store, "MATCH (n:Function) RETURN x").unwrap_err();
        assert!(matches!(err, CypherError::UnknownVariable(_)));
    }
}
