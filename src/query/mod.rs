//! Query Surface (§4.11): read-only operations over a previously persisted
//! graph — hybrid search, a small Cypher-subset interpreter, impact
//! analysis, and canonical per-entity reports. Unlike [`crate::pipeline::analyze`],
//! nothing here ever writes to `data_dir`; a [`QuerySurface`] loads a
//! snapshot once and answers queries against it in memory.

pub mod cypher;
pub mod rrf;

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use serde::{Deserialize, Serialize};

pub use cypher::{CypherError, NodeSummary, Row as CypherRow};
pub use rrf::FusedHit;

use crate::bm25::Bm25Index;
use crate::config::Settings;
use crate::error::{GitNexusError, Result};
use crate::graph::GraphStore;
use crate::model::GraphNode;
use crate::persistence;
use crate::types::RelationType;
use crate::vector::{EmbeddingGenerator, VectorIndex};

/// One fused hybrid-search hit, joined back to a human-readable label when
/// the id resolves to a known node (§4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridHit {
    pub id: String,
    pub label: Option<String>,
    pub score: f64,
    pub sources: Vec<&'static str>,
}

/// How far `search` expands past the BM25-seeded file hit (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    Shallow,
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub file_path: String,
    pub score: f64,
    /// Ids reachable by outgoing `DEFINES`/`IMPORTS` edges from the file,
    /// populated only when `depth = full`.
    pub expanded: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactDirection {
    Upstream,
    Downstream,
}

impl ImpactDirection {
    fn as_str(self) -> &'static str {
        match self {
            ImpactDirection::Upstream => "upstream",
            ImpactDirection::Downstream => "downstream",
        }
    }

    fn petgraph_direction(self) -> Direction {
        match self {
            ImpactDirection::Upstream => Direction::Incoming,
            ImpactDirection::Downstream => Direction::Outgoing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactLevel {
    pub depth: usize,
    pub classification: &'static str,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    pub target: String,
    pub direction: &'static str,
    pub levels: Vec<ImpactLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreKind {
    Symbol,
    Cluster,
    Process,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreReport {
    pub name: String,
    pub kind: &'static str,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
    pub community: Option<String>,
    pub members: Vec<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: String,
    pub label: String,
    pub cohesion: f64,
    pub symbol_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub id: String,
    pub label: String,
    pub process_type: &'static str,
    pub step_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewReport {
    pub clusters: Vec<ClusterSummary>,
    pub processes: Vec<ProcessSummary>,
}

/// Everything a query-serving process needs that `analyze()` otherwise
/// builds and tears down in memory: the reloaded graph, the two search
/// indexes, and a generator to embed query text for semantic search
/// (§4.11).
pub struct QuerySurface {
    store: GraphStore,
    bm25: Bm25Index,
    vector: VectorIndex,
    embedder: Box<dyn EmbeddingGenerator>,
    rrf_k: f64,
}

impl QuerySurface {
    /// Loads everything `persistence::persist` wrote under
    /// `settings.data_path()` (§6, §4.11): the SQLite graph, the BM25 blob,
    /// and the flat embedding table replayed back into an HNSW index.
    pub fn load(settings: &Settings) -> Result<Self> {
        let data_dir = settings.data_path();
        let db_path = data_dir.join("graph.sqlite3");
        let conn = persistence::sqlite_store::open(&db_path)?;

        let store = persistence::load_graph_store(&conn)?;
        let bm25 = persistence::load_bm25_index(&data_dir)?;
        let vector = persistence::load_vector_index(&conn, settings.vector.dimension, &store)?;

        let mut warnings = Vec::new();
        let embedder = crate::pipeline::select_embedding_generator(settings, &mut warnings);
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        Ok(Self { store, bm25, vector, embedder, rrf_k: settings.query.rrf_k })
    }

    pub fn graph(&self) -> &GraphStore {
        &self.store
    }

    /// §4.11 `hybridSearch`: RRF-fuses BM25 file hits with vector-search
    /// symbol hits. The two lists operate at different id granularities
    /// (file path vs. symbol id); RRF doesn't require them to match, it
    /// just fuses whichever ids each source surfaces.
    pub fn hybrid_search(&self, query: &str, k: usize) -> Result<Vec<HybridHit>> {
        let bm25_ids: Vec<String> = self.bm25.search(query, k).into_iter().map(|hit| hit.file_path).collect();

        let semantic_ids: Vec<String> = if self.vector.is_empty() {
            Vec::new()
        } else {
            let mut embedded = self
                .embedder
                .embed(std::slice::from_ref(&query.to_string()))
                .map_err(|e| GitNexusError::General(format!("failed to embed query: {e}")))?;
            match embedded.pop() {
                Some(query_vector) => {
                    self.vector.search(&query_vector, k).into_iter().map(|(id, _)| id).collect()
                }
                None => Vec::new(),
            }
        };

        let sources: [(&'static str, &[String]); 2] = [("bm25", &bm25_ids), ("semantic", &semantic_ids)];
        let fused = rrf::fuse(&sources, self.rrf_k);

        Ok(fused
            .into_iter()
            .take(k)
            .map(|hit| HybridHit {
                label: self.store.get_node(&hit.id).map(node_display_name),
                id: hit.id,
                score: hit.score,
                sources: hit.sources,
            })
            .collect())
    }

    /// §4.11 `cypher`: pass-through to the property-graph executor.
    pub fn cypher(&self, query: &str) -> std::result::Result<Vec<CypherRow>, CypherError> {
        cypher::execute(&self.store, query)
    }

    /// §4.11 `search`: BM25-seeded lookup, optionally expanded to the
    /// file's outgoing edges when `depth = full`.
    pub fn search(&self, query: &str, k: usize, depth: SearchDepth) -> Vec<SearchHit> {
        self.bm25
            .search(query, k)
            .into_iter()
            .map(|hit| {
                let expanded =
                    if depth == SearchDepth::Full { self.expand_file(&hit.file_path) } else { Vec::new() };
                SearchHit { file_path: hit.file_path, score: hit.score, expanded }
            })
            .collect()
    }

    fn expand_file(&self, file_path: &str) -> Vec<String> {
        let id = crate::model::file_id(file_path);
        if !self.store.contains_node(&id) {
            return Vec::new();
        }
        let mut expanded = Vec::new();
        for kind in [RelationType::Defines, RelationType::Imports] {
            expanded.extend(self.store.outgoing(&id, kind).into_iter().map(str::to_string));
        }
        expanded
    }

    /// §4.11 `impact`: locates `target` by exact symbol name, then BFS's
    /// over the given relation kinds (default `{CALLS, IMPORTS, EXTENDS,
    /// IMPLEMENTS}`), grouping hits by depth and classifying each level.
    pub fn impact(
        &self,
        target: &str,
        direction: ImpactDirection,
        max_depth: usize,
        relation_types: &[RelationType],
        min_confidence: f64,
    ) -> Result<ImpactReport> {
        let start = self.store.nodes().find_map(|node| match node {
            GraphNode::Symbol(sym) if sym.name == target => Some(sym.id.clone()),
            _ => None,
        });
        let Some(start) = start else {
            return Err(GitNexusError::General(format!("no symbol named '{target}' found")));
        };

        let kinds: HashSet<RelationType> = if relation_types.is_empty() {
            [RelationType::Calls, RelationType::Imports, RelationType::Extends, RelationType::Implements]
                .into_iter()
                .collect()
        } else {
            relation_types.iter().copied().collect()
        };

        let adjacency = self.build_adjacency(&kinds, min_confidence, direction.petgraph_direction());
        let levels_raw = bfs_with_adjacency(&adjacency, &start, max_depth);

        let levels: Vec<ImpactLevel> = levels_raw
            .into_iter()
            .enumerate()
            .map(|(idx, node_ids)| {
                let depth = idx + 1;
                ImpactLevel { depth, classification: classify_depth(depth), node_ids }
            })
            .collect();

        Ok(ImpactReport { target: start, direction: direction.as_str(), levels })
    }

    fn build_adjacency(
        &self,
        kinds: &HashSet<RelationType>,
        min_confidence: f64,
        direction: Direction,
    ) -> HashMap<String, Vec<String>> {
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for relation in self.store.relations() {
            if !kinds.contains(&relation.kind) || relation.confidence < min_confidence {
                continue;
            }
            match direction {
                Direction::Outgoing => adjacency.entry(relation.from.clone()).or_default().push(relation.to.clone()),
                Direction::Incoming => adjacency.entry(relation.to.clone()).or_default().push(relation.from.clone()),
            }
        }
        adjacency
    }

    /// §4.11 `explore`: canonical per-entity report for a symbol, cluster,
    /// or process.
    pub fn explore(&self, name: &str, kind: ExploreKind) -> Result<ExploreReport> {
        match kind {
            ExploreKind::Symbol => self.explore_symbol(name),
            ExploreKind::Cluster => self.explore_cluster(name),
            ExploreKind::Process => self.explore_process(name),
        }
    }

    fn explore_symbol(&self, name: &str) -> Result<ExploreReport> {
        let symbol = self.store.nodes().find_map(|node| match node {
            GraphNode::Symbol(sym) if sym.name == name => Some(sym),
            _ => None,
        });
        let Some(symbol) = symbol else {
            return Err(GitNexusError::General(format!("no symbol named '{name}' found")));
        };

        let callers = self.store.incoming(&symbol.id, RelationType::Calls).into_iter().map(str::to_string).collect();
        let callees = self.store.outgoing(&symbol.id, RelationType::Calls).into_iter().map(str::to_string).collect();
        let community = self.store.outgoing(&symbol.id, RelationType::MemberOf).into_iter().next().map(str::to_string);

        Ok(ExploreReport {
            name: symbol.name.clone(),
            kind: "symbol",
            callers,
            callees,
            community,
            members: Vec::new(),
            steps: Vec::new(),
        })
    }

    fn explore_cluster(&self, name: &str) -> Result<ExploreReport> {
        let community = self.store.nodes().find_map(|node| match node {
            GraphNode::Community(c) if c.label == name || c.id == name => Some(c),
            _ => None,
        });
        let Some(community) = community else {
            return Err(GitNexusError::General(format!("no cluster named '{name}' found")));
        };

        let members =
            self.store.incoming(&community.id, RelationType::MemberOf).into_iter().map(str::to_string).collect();

        Ok(ExploreReport {
            name: community.label.clone(),
            kind: "cluster",
            callers: Vec::new(),
            callees: Vec::new(),
            community: None,
            members,
            steps: Vec::new(),
        })
    }

    fn explore_process(&self, name: &str) -> Result<ExploreReport> {
        let process = self.store.nodes().find_map(|node| match node {
            GraphNode::Process(p) if p.label == name || p.id == name => Some(p),
            _ => None,
        });
        let Some(process) = process else {
            return Err(GitNexusError::General(format!("no process named '{name}' found")));
        };

        let mut ordered_steps: Vec<(u32, String)> = self
            .store
            .relations()
            .filter(|r| r.kind == RelationType::StepInProcess && r.to == process.id)
            .filter_map(|r| r.step.map(|step| (step, r.from.clone())))
            .collect();
        ordered_steps.sort_by_key(|(step, _)| *step);
        let steps = ordered_steps.into_iter().map(|(_, id)| id).collect();

        Ok(ExploreReport {
            name: process.label.clone(),
            kind: "process",
            callers: Vec::new(),
            callees: Vec::new(),
            community: None,
            members: Vec::new(),
            steps,
        })
    }

    /// §4.11 `overview`: aggregate cluster/process listings.
    pub fn overview(&self) -> OverviewReport {
        let mut clusters: Vec<ClusterSummary> = self
            .store
            .nodes()
            .filter_map(|node| match node {
                GraphNode::Community(c) => {
                    Some(ClusterSummary { id: c.id.clone(), label: c.label.clone(), cohesion: c.cohesion, symbol_count: c.symbol_count })
                }
                _ => None,
            })
            .collect();
        clusters.sort_by(|a, b| a.id.cmp(&b.id));

        let mut processes: Vec<ProcessSummary> = self
            .store
            .nodes()
            .filter_map(|node| match node {
                GraphNode::Process(p) => Some(ProcessSummary {
                    id: p.id.clone(),
                    label: p.label.clone(),
                    process_type: p.process_type.as_str(),
                    step_count: p.step_count,
                }),
                _ => None,
            })
            .collect();
        processes.sort_by(|a, b| a.id.cmp(&b.id));

        OverviewReport { clusters, processes }
    }
}

fn node_display_name(node: &GraphNode) -> String {
    match node {
        GraphNode::File(n) => n.name.clone(),
        GraphNode::Folder(n) => n.name.clone(),
        GraphNode::Symbol(n) => n.name.clone(),
        GraphNode::Community(n) => n.label.clone(),
        GraphNode::Process(n) => n.label.clone(),
    }
}

fn classify_depth(depth: usize) -> &'static str {
    match depth {
        1 => "will break",
        2 => "likely affected",
        _ => "may need testing",
    }
}

/// Breadth-first walk over a precomputed adjacency map, grouped by depth.
/// Mirrors [`GraphStore::bfs_levels`]'s shape but over an adjacency already
/// filtered by relation kind and `minConfidence` (§4.11), which `bfs_levels`
/// itself has no notion of.
fn bfs_with_adjacency(adjacency: &HashMap<String, Vec<String>>, start: &str, max_depth: usize) -> Vec<Vec<String>> {
    let mut levels = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.to_string());
    let mut frontier = vec![start.to_string()];

    while !frontier.is_empty() && levels.len() < max_depth {
        let mut next = Vec::new();
        let mut level_ids = Vec::new();
        for id in &frontier {
            let Some(neighbors) = adjacency.get(id) else { continue };
            for neighbor in neighbors {
                if visited.insert(neighbor.clone()) {
                    level_ids.push(neighbor.clone());
                    next.push(neighbor.clone());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{file_id, symbol_id, CodeRelation, CodeSymbolNode, FileNode};
    use crate::types::{CallReason, SymbolLabel};

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.upsert_node(GraphNode::File(FileNode {
            id: file_id("a.ts"),
            name: "a.ts".to_string(),
            file_path: "a.ts".to_string(),
            content: String::new(),
        }));
        for name in ["foo", "bar", "baz"] {
            store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
                id: symbol_id(SymbolLabel::Function, "a.ts", name),
                label: SymbolLabel::Function,
                name: name.to_string(),
                file_path: "a.ts".to_string(),
                start_line: 0,
                end_line: 1,
                content: String::new(),
                is_exported: true,
                description: None,
            }));
        }
        let foo = symbol_id(SymbolLabel::Function, "a.ts", "foo");
        let bar = symbol_id(SymbolLabel::Function, "a.ts", "bar");
        let baz = symbol_id(SymbolLabel::Function, "a.ts", "baz");
        store.add_relation(CodeRelation::calls(foo.clone(), bar.clone(), 0.9, CallReason::SameFile)).unwrap();
        store.add_relation(CodeRelation::calls(bar, baz, 0.9, CallReason::SameFile)).unwrap();
        store
    }

    #[test]
    fn bfs_with_adjacency_excludes_the_start_node() {
        let store = sample_store();
        let mut kinds = HashSet::new();
        kinds.insert(RelationType::Calls);
        let adjacency = HashMap::from([(
            symbol_id(SymbolLabel::Function, "a.ts", "foo"),
            vec![symbol_id(SymbolLabel::Function, "a.ts", "bar")],
        )]);
        let levels = bfs_with_adjacency(&adjacency, &symbol_id(SymbolLabel::Function, "a.ts", "foo"), 10);
        assert_eq!(levels, vec![vec![symbol_id(SymbolLabel::Function, "a.ts", "bar")]]);
    }

    #[test]
    fn classify_depth_matches_the_documented_labels() {
        assert_eq!(classify_depth(1), "will break");
        assert_eq!(classify_depth(2), "likely affected");
        assert_eq!(classify_depth(3), "may need testing");
        assert_eq!(classify_depth(99), "may need testing");
    }
}
