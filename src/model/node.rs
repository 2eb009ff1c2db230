//! Node entity payloads (§3). Modeled as a tagged enum over a closed label
//! set rather than class inheritance, per the design note in §9: the label
//! drives both schema routing (persistence) and `isExported` logic
//! (extraction).

use crate::types::SymbolLabel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub file_path: String,
    /// Source text, truncated to `content_cap` characters (§3, default 10 000).
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSymbolNode {
    pub id: String,
    pub label: SymbolLabel,
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Source snippet with ±2-line context, capped to `snippet_cap` characters
    /// (§3, default 5 000). Populated eagerly by the extractor from the
    /// already-parsed source; the CSV builder's content cache only re-derives
    /// it lazily when regenerating CSVs from disk without a live graph (§9).
    pub content: String,
    pub is_exported: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichedBy {
    Heuristic,
    Llm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityNode {
    pub id: String,
    pub label: String,
    pub heuristic_label: String,
    pub keywords: Vec<String>,
    pub description: String,
    pub enriched_by: EnrichedBy,
    pub cohesion: f64,
    pub symbol_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessType {
    IntraCommunity,
    CrossCommunity,
}

impl ProcessType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessType::IntraCommunity => "intra-community",
            ProcessType::CrossCommunity => "cross-community",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub id: String,
    pub label: String,
    pub heuristic_label: String,
    pub process_type: ProcessType,
    pub step_count: usize,
    pub communities: Vec<String>,
    pub entry_point_id: String,
    pub terminal_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEmbeddingNode {
    pub node_id: String,
    pub embedding: Vec<f32>,
}

/// Polymorphic wrapper used wherever the Graph Store needs to hold any node
/// kind uniformly (bulk CSV generation, generic traversal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphNode {
    File(FileNode),
    Folder(FolderNode),
    Symbol(CodeSymbolNode),
    Community(CommunityNode),
    Process(ProcessNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::File(n) => &n.id,
            GraphNode::Folder(n) => &n.id,
            GraphNode::Symbol(n) => &n.id,
            GraphNode::Community(n) => &n.id,
            GraphNode::Process(n) => &n.id,
        }
    }

    /// The node-table label used for schema routing and CSV file naming
    /// (§4.10, §6). CodeSymbol labels route to their own per-label table,
    /// matching the closed label set in §3.
    pub fn table_label(&self) -> &'static str {
        match self {
            GraphNode::File(_) => "File",
            GraphNode::Folder(_) => "Folder",
            GraphNode::Symbol(n) => n.label.as_str(),
            GraphNode::Community(_) => "Community",
            GraphNode::Process(_) => "Process",
        }
    }
}
