//! Process Tracer (§4.7): depth-bounded BFS chains from detected entry
//! points, classified intra/cross-community.

use std::collections::{HashMap, HashSet};

use crate::graph::GraphStore;
use crate::model::{self, CodeRelation, GraphNode, ProcessNode, ProcessType};
use crate::types::{Language, RelationType, SymbolLabel};

/// Conventional entry-point names per language (§4.7, §6): `main` forms plus
/// common HTTP-handler naming. Export flags are also honored independently
/// (a symbol is an entry point if its name matches here OR it is exported
/// AND has no incoming CALLS edge, i.e. nothing in-repo calls it).
fn matches_entry_point_name(language: Option<Language>, name: &str) -> bool {
    if name == "main" {
        return true;
    }
    match language {
        Some(Language::Go) => name == "init" || name.starts_with("Handle"),
        Some(Language::Rust) => name == "main",
        Some(Language::Java) | Some(Language::CSharp) => name == "main" || name == "Main",
        Some(Language::Python) => name == "main" || name == "__main__",
        Some(Language::TypeScript) | Some(Language::JavaScript) => {
            name == "handler" || name.ends_with("Handler") || name.ends_with("Route") || name == "main"
        }
        Some(Language::C) | Some(Language::Cpp) => name == "main",
        None => false,
    }
}

fn is_entry_point(store: &GraphStore, id: &str, name: &str, is_exported: bool, language: Option<Language>) -> bool {
    if matches_entry_point_name(language, name) {
        return true;
    }
    is_exported && store.incoming(id, RelationType::Calls).is_empty()
}

pub struct ProcessResult {
    pub nodes: Vec<ProcessNode>,
    pub relations: Vec<CodeRelation>,
}

/// Traces call chains from every detected entry point (§4.7). `language_of`
/// maps a `filePath` to its `Language`, used only for entry-point name
/// heuristics; `max_depth` bounds the BFS (configurable, default 12).
pub fn trace_processes(
    store: &GraphStore,
    language_of: &HashMap<String, Language>,
    max_depth: usize,
) -> ProcessResult {
    let mut entry_points = Vec::new();
    for node in store.nodes() {
        let GraphNode::Symbol(sym) = node else { continue };
        if !sym.label.is_callable_surface() {
            continue;
        }
        let language = language_of.get(&sym.file_path).copied();
        if is_entry_point(store, &sym.id, &sym.name, sym.is_exported, language) {
            entry_points.push(sym.id.clone());
        }
    }
    entry_points.sort();

    let member_of: HashMap<String, String> = store
        .relations()
        .filter(|r| r.kind == RelationType::MemberOf)
        .map(|r| (r.from.clone(), r.to.clone()))
        .collect();

    let mut nodes = Vec::new();
    let mut relations = Vec::new();
    let mut next_id = 0usize;

    for entry in entry_points {
        let chain = longest_call_chain(store, &entry, max_depth);
        if chain.len() < 2 {
            continue;
        }

        let mut communities = Vec::new();
        for step_id in &chain {
            if let Some(c) = member_of.get(step_id) {
                if !communities.contains(c) {
                    communities.push(c.clone());
                }
            }
        }
        let process_type =
            if communities.len() <= 1 { ProcessType::IntraCommunity } else { ProcessType::CrossCommunity };

        let id = model::process_id(next_id);
        next_id += 1;

        for (step, step_id) in chain.iter().enumerate() {
            relations.push(CodeRelation::step_in_process(step_id.clone(), id.clone(), step as u32));
        }

        nodes.push(ProcessNode {
            id,
            label: "Process".to_string(),
            heuristic_label: format!("{} flow", symbol_name(&chain[0])),
            process_type,
            step_count: chain.len(),
            communities,
            entry_point_id: chain[0].clone(),
            terminal_id: chain.last().cloned().unwrap_or_default(),
        });
    }

    ProcessResult { nodes, relations }
}

fn symbol_name(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

/// Simple greedy depth-first walk picking the first unvisited CALLS target
/// at each step, capped at `max_depth` (§4.7: "a path becomes a Process
/// when it has >= 2 distinct steps").
fn longest_call_chain(store: &GraphStore, entry: &str, max_depth: usize) -> Vec<String> {
    let mut chain = vec![entry.to_string()];
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(entry.to_string());

    let mut current = entry.to_string();
    while chain.len() < max_depth {
        let mut targets = store.outgoing(&current, RelationType::Calls);
        targets.sort();
        let Some(next) = targets.into_iter().find(|t| !visited.contains(*t)) else { break };
        let next = next.to_string();
        visited.insert(next.clone());
        chain.push(next.clone());
        current = next;
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{symbol_id, CodeSymbolNode};
    use crate::types::CallReason;

    fn symbol(store: &mut GraphStore, path: &str, name: &str, label: SymbolLabel) -> String {
        let id = symbol_id(label, path, name);
        store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
            id: id.clone(),
            label,
            name: name.to_string(),
            file_path: path.to_string(),
            start_line: 0,
            end_line: 1,
            content: String::new(),
            is_exported: true,
            description: None,
        }));
        id
    }

    /// Scenario S6 (§8): main -> validate -> persist, three distinct
    /// communities, yields one cross-community Process of step count 3.
    #[test]
    fn traces_cross_community_process() {
        let mut store = GraphStore::new();
        let main = symbol(&mut store, "m.ts", "main", SymbolLabel::Function);
        let validate = symbol(&mut store, "m.ts", "validate", SymbolLabel::Function);
        let persist = symbol(&mut store, "m.ts", "persist", SymbolLabel::Function);

        store.add_relation(CodeRelation::calls(main.clone(), validate.clone(), 0.85, CallReason::SameFile)).unwrap();
        store.add_relation(CodeRelation::calls(validate.clone(), persist.clone(), 0.85, CallReason::SameFile)).unwrap();

        for n in 0..3 {
            store.upsert_node(GraphNode::Community(crate::model::CommunityNode {
                id: model::community_id(n),
                label: "Community".to_string(),
                heuristic_label: String::new(),
                keywords: Vec::new(),
                description: String::new(),
                enriched_by: crate::model::EnrichedBy::Heuristic,
                cohesion: 1.0,
                symbol_count: 2,
            }));
        }

        store.add_relation(CodeRelation::member_of(main.clone(), "comm_0".to_string())).unwrap();
        store.add_relation(CodeRelation::member_of(validate.clone(), "comm_1".to_string())).unwrap();
        store.add_relation(CodeRelation::member_of(persist.clone(), "comm_2".to_string())).unwrap();

        let mut languages = HashMap::new();
        languages.insert("m.ts".to_string(), Language::TypeScript);

        let result = trace_processes(&store, &languages, 12);
        assert_eq!(result.nodes.len(), 1);
        let process = &result.nodes[0];
        assert_eq!(process.step_count, 3);
        assert_eq!(process.process_type, ProcessType::CrossCommunity);
        assert_eq!(process.entry_point_id, main);
        assert_eq!(process.terminal_id, persist);

        let steps: Vec<u32> = result.relations.iter().map(|r| r.step.unwrap()).collect();
        let mut sorted_steps = steps.clone();
        sorted_steps.sort();
        assert_eq!(sorted_steps, vec![0, 1, 2]);
    }

    #[test]
    fn single_step_chain_is_not_a_process() {
        let mut store = GraphStore::new();
        let main = symbol(&mut store, "m.ts", "main", SymbolLabel::Function);

        let languages = HashMap::new();
        let result = trace_processes(&store, &languages, 12);
        assert!(result.nodes.is_empty());
        let _ = main;
    }
}
