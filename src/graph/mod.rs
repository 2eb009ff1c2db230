//! The Graph Store (§3, §4.10): an in-memory property graph over
//! `GraphNode`/`CodeRelation`, generalizing codanna's `DependencyGraph` from
//! a single `SymbolId -> SymbolId` edge keyed on `RelationKind` to the full
//! closed node-label set and the single typed `CodeRelation` edge.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{GraphError, GraphResult};
use crate::model::{CodeRelation, GraphNode};
use crate::types::RelationType;

/// The `(FROM, TO)` table-label pairs the relation schema actually permits
/// (§6: "every pair actually emitted by the resolver and community/process
/// components must be declared"). Checked at every `add_relation` call so a
/// new edge-producing code path can't silently widen the schema.
pub(crate) const SCHEMA_PAIRS: &[(&str, &str, RelationType)] = &[
    ("Folder", "Folder", RelationType::Contains),
    ("Folder", "File", RelationType::Contains),
    ("File", "Folder", RelationType::Contains),

    // File -> every SymbolLabel (§3: DEFINES spans the whole closed label set).
    ("File", "Function", RelationType::Defines),
    ("File", "Class", RelationType::Defines),
    ("File", "Interface", RelationType::Defines),
    ("File", "Method", RelationType::Defines),
    ("File", "CodeElement", RelationType::Defines),
    ("File", "Struct", RelationType::Defines),
    ("File", "Enum", RelationType::Defines),
    ("File", "Macro", RelationType::Defines),
    ("File", "Typedef", RelationType::Defines),
    ("File", "Union", RelationType::Defines),
    ("File", "Namespace", RelationType::Defines),
    ("File", "Trait", RelationType::Defines),
    ("File", "Impl", RelationType::Defines),
    ("File", "TypeAlias", RelationType::Defines),
    ("File", "Const", RelationType::Defines),
    ("File", "Static", RelationType::Defines),
    ("File", "Property", RelationType::Defines),
    ("File", "Record", RelationType::Defines),
    ("File", "Delegate", RelationType::Defines),
    ("File", "Annotation", RelationType::Defines),
    ("File", "Constructor", RelationType::Defines),
    ("File", "Template", RelationType::Defines),
    ("File", "Module", RelationType::Defines),

    ("File", "File", RelationType::Imports),

    // CALLS: the source is the File itself when no enclosing function is found
    // (§4.5(b)); otherwise the enclosing callable. The target can be any label,
    // since same-file/fuzzy-global resolution matches purely by name across the
    // whole closed label set (e.g. a call-like capture landing on a tuple-struct
    // constructor or a const).
    ("File", "Function", RelationType::Calls),
    ("File", "Class", RelationType::Calls),
    ("File", "Method", RelationType::Calls),
    ("File", "Interface", RelationType::Calls),
    ("Function", "Function", RelationType::Calls),
    ("Function", "Class", RelationType::Calls),
    ("Function", "Interface", RelationType::Calls),
    ("Function", "Method", RelationType::Calls),
    ("Function", "CodeElement", RelationType::Calls),
    ("Function", "Struct", RelationType::Calls),
    ("Function", "Enum", RelationType::Calls),
    ("Function", "Macro", RelationType::Calls),
    ("Function", "Typedef", RelationType::Calls),
    ("Function", "Union", RelationType::Calls),
    ("Function", "Namespace", RelationType::Calls),
    ("Function", "Trait", RelationType::Calls),
    ("Function", "Impl", RelationType::Calls),
    ("Function", "TypeAlias", RelationType::Calls),
    ("Function", "Const", RelationType::Calls),
    ("Function", "Static", RelationType::Calls),
    ("Function", "Property", RelationType::Calls),
    ("Function", "Record", RelationType::Calls),
    ("Function", "Delegate", RelationType::Calls),
    ("Function", "Annotation", RelationType::Calls),
    ("Function", "Constructor", RelationType::Calls),
    ("Function", "Template", RelationType::Calls),
    ("Function", "Module", RelationType::Calls),
    ("Class", "Function", RelationType::Calls),
    ("Class", "Class", RelationType::Calls),
    ("Class", "Interface", RelationType::Calls),
    ("Class", "Method", RelationType::Calls),
    ("Class", "CodeElement", RelationType::Calls),
    ("Class", "Struct", RelationType::Calls),
    ("Class", "Enum", RelationType::Calls),
    ("Class", "Macro", RelationType::Calls),
    ("Class", "Typedef", RelationType::Calls),
    ("Class", "Union", RelationType::Calls),
    ("Class", "Namespace", RelationType::Calls),
    ("Class", "Trait", RelationType::Calls),
    ("Class", "Impl", RelationType::Calls),
    ("Class", "TypeAlias", RelationType::Calls),
    ("Class", "Const", RelationType::Calls),
    ("Class", "Static", RelationType::Calls),
    ("Class", "Property", RelationType::Calls),
    ("Class", "Record", RelationType::Calls),
    ("Class", "Delegate", RelationType::Calls),
    ("Class", "Annotation", RelationType::Calls),
    ("Class", "Constructor", RelationType::Calls),
    ("Class", "Template", RelationType::Calls),
    ("Class", "Module", RelationType::Calls),
    ("Method", "Function", RelationType::Calls),
    ("Method", "Class", RelationType::Calls),
    ("Method", "Interface", RelationType::Calls),
    ("Method", "Method", RelationType::Calls),
    ("Method", "CodeElement", RelationType::Calls),
    ("Method", "Struct", RelationType::Calls),
    ("Method", "Enum", RelationType::Calls),
    ("Method", "Macro", RelationType::Calls),
    ("Method", "Typedef", RelationType::Calls),
    ("Method", "Union", RelationType::Calls),
    ("Method", "Namespace", RelationType::Calls),
    ("Method", "Trait", RelationType::Calls),
    ("Method", "Impl", RelationType::Calls),
    ("Method", "TypeAlias", RelationType::Calls),
    ("Method", "Const", RelationType::Calls),
    ("Method", "Static", RelationType::Calls),
    ("Method", "Property", RelationType::Calls),
    ("Method", "Record", RelationType::Calls),
    ("Method", "Delegate", RelationType::Calls),
    ("Method", "Annotation", RelationType::Calls),
    ("Method", "Constructor", RelationType::Calls),
    ("Method", "Template", RelationType::Calls),
    ("Method", "Module", RelationType::Calls),
    ("Interface", "Function", RelationType::Calls),
    ("Interface", "Class", RelationType::Calls),
    ("Interface", "Interface", RelationType::Calls),
    ("Interface", "Method", RelationType::Calls),
    ("Interface", "CodeElement", RelationType::Calls),
    ("Interface", "Struct", RelationType::Calls),
    ("Interface", "Enum", RelationType::Calls),
    ("Interface", "Macro", RelationType::Calls),
    ("Interface", "Typedef", RelationType::Calls),
    ("Interface", "Union", RelationType::Calls),
    ("Interface", "Namespace", RelationType::Calls),
    ("Interface", "Trait", RelationType::Calls),
    ("Interface", "Impl", RelationType::Calls),
    ("Interface", "TypeAlias", RelationType::Calls),
    ("Interface", "Const", RelationType::Calls),
    ("Interface", "Static", RelationType::Calls),
    ("Interface", "Property", RelationType::Calls),
    ("Interface", "Record", RelationType::Calls),
    ("Interface", "Delegate", RelationType::Calls),
    ("Interface", "Annotation", RelationType::Calls),
    ("Interface", "Constructor", RelationType::Calls),
    ("Interface", "Template", RelationType::Calls),
    ("Interface", "Module", RelationType::Calls),

    ("Class", "Class", RelationType::Extends),
    ("Interface", "Interface", RelationType::Extends),
    ("Class", "Interface", RelationType::Implements),
    ("Struct", "Trait", RelationType::Implements),
    ("Function", "Community", RelationType::MemberOf),
    ("Class", "Community", RelationType::MemberOf),
    ("Method", "Community", RelationType::MemberOf),
    ("Interface", "Community", RelationType::MemberOf),
    ("Function", "Process", RelationType::StepInProcess),
    ("Class", "Process", RelationType::StepInProcess),
    ("Method", "Process", RelationType::StepInProcess),
    ("Interface", "Process", RelationType::StepInProcess),
];

/// Derives the table label implied by an id's prefix (`File:`, `comm_`,
/// `proc_`, or a `SymbolLabel` name), used to validate schema pairs without
/// requiring both endpoints already be present as nodes (heritage may
/// target a synthetic dangling id).
pub(crate) fn label_of_id(id: &str) -> &str {
    if let Some(rest) = id.strip_prefix("comm_") {
        let _ = rest;
        return "Community";
    }
    if id.starts_with("proc_") {
        return "Process";
    }
    id.split(':').next().unwrap_or(id)
}

fn is_declared_pair(from_label: &str, to_label: &str, kind: RelationType) -> bool {
    SCHEMA_PAIRS.iter().any(|(f, t, k)| *f == from_label && *t == to_label && *k == kind)
}

#[derive(Debug, Default)]
pub struct GraphStore {
    graph: StableDiGraph<GraphNode, CodeRelation>,
    index: HashMap<String, NodeIndex>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Inserts `node`, replacing any existing node with the same id
    /// (invariant 1: ids round-trip unchanged, so re-insertion is an
    /// update, never a duplicate).
    pub fn upsert_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id().to_string();
        if let Some(&idx) = self.index.get(&id) {
            self.graph[idx] = node;
            idx
        } else {
            let idx = self.graph.add_node(node);
            self.index.insert(id, idx);
            idx
        }
    }

    /// Adds `relation`, validating it against the declared schema pairs
    /// (§6, §9). Endpoints are created as placeholder lookups only — the
    /// caller is responsible for having inserted both nodes already, except
    /// when `to` is a synthetic dangling id (§4.5(c), §9 open question),
    /// which is allowed to reference a non-existent node.
    pub fn add_relation(&mut self, relation: CodeRelation) -> GraphResult<()> {
        let from_label = label_of_id(&relation.from).to_string();
        let to_label = label_of_id(&relation.to).to_string();
        if !is_declared_pair(&from_label, &to_label, relation.kind) {
            return Err(GraphError::UndeclaredPair { from_label, to_label });
        }
        if relation.kind == RelationType::Calls && !(relation.confidence > 0.0 && relation.confidence <= 1.0) {
            return Err(GraphError::InvalidConfidence { confidence: relation.confidence });
        }

        let Some(&from_idx) = self.index.get(&relation.from) else {
            return Ok(());
        };
        let to_idx = match self.index.get(&relation.to) {
            Some(&idx) => idx,
            None => return Ok(()),
        };
        self.graph.add_edge(from_idx, to_idx, relation);
        Ok(())
    }

    /// Adds `relation` even when `to` does not yet exist as a node,
    /// synthesizing a weak reference. Used only by the heritage resolver for
    /// dangling targets (§4.5(c), §9): the edge is retained so the target id
    /// is not lost, but callers must treat it as unresolved.
    pub fn add_dangling_relation(&mut self, relation: CodeRelation) -> GraphResult<()> {
        let from_label = label_of_id(&relation.from).to_string();
        let to_label = label_of_id(&relation.to).to_string();
        if !is_declared_pair(&from_label, &to_label, relation.kind) {
            return Err(GraphError::UndeclaredPair { from_label, to_label });
        }
        let Some(&from_idx) = self.index.get(&relation.from) else { return Ok(()) };
        let to_idx = *self.index.entry(relation.to.clone()).or_insert_with(|| {
            self.graph.add_node(placeholder_node(&relation.to))
        });
        self.graph.add_edge(from_idx, to_idx, relation);
        Ok(())
    }

    pub fn outgoing(&self, id: &str, kind: RelationType) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == kind)
            .map(|e| self.graph[e.target()].id())
            .collect()
    }

    pub fn incoming(&self, id: &str, kind: RelationType) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().kind == kind)
            .map(|e| self.graph[e.source()].id())
            .collect()
    }

    pub fn relations(&self) -> impl Iterator<Item = &CodeRelation> {
        self.graph.edge_weights()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Breadth-first traversal from `start` along `kinds` edges in
    /// `direction`, grouped by depth, stopping at `max_depth` (§4.7, §4.11).
    /// `start` itself is never included (§8 invariant 10).
    pub fn bfs_levels(
        &self,
        start: &str,
        direction: Direction,
        kinds: &HashSet<RelationType>,
        max_depth: usize,
    ) -> Vec<Vec<String>> {
        let Some(&start_idx) = self.index.get(start) else { return Vec::new() };
        let mut levels = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(start_idx);
        let mut frontier = vec![start_idx];

        while !frontier.is_empty() && levels.len() < max_depth {
            let mut next = Vec::new();
            let mut level_ids = Vec::new();
            for idx in frontier {
                for edge in self.graph.edges_directed(idx, direction) {
                    if !kinds.contains(&edge.weight().kind) {
                        continue;
                    }
                    let neighbor = if direction == Direction::Outgoing { edge.target() } else { edge.source() };
                    if visited.insert(neighbor) {
                        level_ids.push(self.graph[neighbor].id().to_string());
                        next.push(neighbor);
                    }
                }
            }
            if level_ids.is_empty() {
                break;
            }
            levels.push(level_ids);
            frontier = next;
        }

        levels
    }
}

fn placeholder_node(id: &str) -> GraphNode {
    use crate::model::CodeSymbolNode;
    use crate::types::SymbolLabel;

    let label = match label_of_id(id) {
        "Function" => SymbolLabel::Function,
        "Class" => SymbolLabel::Class,
        "Interface" => SymbolLabel::Interface,
        "Method" => SymbolLabel::Method,
        "Struct" => SymbolLabel::Struct,
        "Trait" => SymbolLabel::Trait,
        _ => SymbolLabel::CodeElement,
    };
    let name = id.rsplit(':').next().unwrap_or(id).to_string();
    GraphNode::Symbol(CodeSymbolNode {
        id: id.to_string(),
        label,
        name,
        file_path: String::new(),
        start_line: 0,
        end_line: 0,
        content: String::new(),
        is_exported: false,
        description: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{file_id, symbol_id, FileNode};
    use crate::types::SymbolLabel;

    fn file_node(path: &str) -> GraphNode {
        GraphNode::File(FileNode {
            id: file_id(path),
            name: path.to_string(),
            file_path: path.to_string(),
            content: String::new(),
        })
    }

    fn symbol_node(label: SymbolLabel, path: &str, name: &str) -> GraphNode {
        use crate::model::CodeSymbolNode;
        GraphNode::Symbol(CodeSymbolNode {
            id: symbol_id(label, path, name),
            label,
            name: name.to_string(),
            file_path: path.to_string(),
            start_line: 0,
            end_line: 1,
            content: String::new(),
            is_exported: true,
            description: None,
        })
    }

    #[test]
    fn rejects_undeclared_pair() {
        let mut store = GraphStore::new();
        store.upsert_node(file_node("a.ts"));
        store.upsert_node(file_node("b.ts"));
        let bogus = CodeRelation::member_of(file_id("a.ts"), file_id("b.ts"));
        assert!(matches!(store.add_relation(bogus), Err(GraphError::UndeclaredPair { .. })));
    }

    #[test]
    fn defines_edge_from_file_to_symbol_round_trips() {
        let mut store = GraphStore::new();
        store.upsert_node(file_node("app/a.ts"));
        store.upsert_node(symbol_node(SymbolLabel::Function, "app/a.ts", "foo"));

        let rel = CodeRelation::defines(file_id("app/a.ts"), symbol_id(SymbolLabel::Function, "app/a.ts", "foo"));
        store.add_relation(rel).unwrap();

        let targets = store.outgoing(&file_id("app/a.ts"), RelationType::Defines);
        assert_eq!(targets, vec![symbol_id(SymbolLabel::Function, "app/a.ts", "foo")]);
    }

    #[test]
    fn bfs_excludes_start_node() {
        let mut store = GraphStore::new();
        let a = symbol_id(SymbolLabel::Function, "a.ts", "a");
        let b = symbol_id(SymbolLabel::Function, "a.ts", "b");
        store.upsert_node(symbol_node(SymbolLabel::Function, "a.ts", "a"));
        store.upsert_node(symbol_node(SymbolLabel::Function, "a.ts", "b"));
        store.add_relation(CodeRelation::calls(a.clone(), b.clone(), 0.85, crate::types::CallReason::SameFile)).unwrap();

        let mut kinds = HashSet::new();
        kinds.insert(RelationType::Calls);
        let levels = store.bfs_levels(&a, Direction::Outgoing, &kinds, 10);
        assert_eq!(levels, vec![vec![b]]);
    }

    #[test]
    fn dangling_heritage_target_is_materialized_as_placeholder() {
        let mut store = GraphStore::new();
        store.upsert_node(symbol_node(SymbolLabel::Class, "a.ts", "Dog"));
        let rel = CodeRelation::extends(
            symbol_id(SymbolLabel::Class, "a.ts", "Dog"),
            crate::model::synthetic_id(SymbolLabel::Class, "Animal"),
        );
        store.add_dangling_relation(rel).unwrap();
        assert!(store.contains_node(&crate::model::synthetic_id(SymbolLabel::Class, "Animal")));
    }
}
