//! Community Detector (§4.6): Louvain-style modularity maximization over the
//! undirected projection of CALLS∪EXTENDS∪IMPLEMENTS among callable-surface
//! symbols, with deterministic tie-breaking via a seeded RNG (§9).

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::graph::GraphStore;
use crate::model::{self, CodeRelation, CommunityNode, EnrichedBy, GraphNode};
use crate::types::RelationType;

const STOP_DIRS: &[&str] = &["src", "lib", "core", "utils", "common", "shared", "helpers"];

/// One entry per undirected edge in the CALLS∪EXTENDS∪IMPLEMENTS projection,
/// self-loops and duplicate pairs already suppressed.
struct Projection {
    nodes: Vec<String>,
    index_of: HashMap<String, usize>,
    adjacency: Vec<HashMap<usize, u32>>,
}

fn build_projection(store: &GraphStore) -> Projection {
    let mut members = HashSet::new();
    for node in store.nodes() {
        if let GraphNode::Symbol(sym) = node {
            if sym.label.is_callable_surface() {
                members.insert(sym.id.clone());
            }
        }
    }

    let mut nodes: Vec<String> = members.into_iter().collect();
    nodes.sort();
    let index_of: HashMap<String, usize> = nodes.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
    let mut adjacency = vec![HashMap::new(); nodes.len()];

    let mut seen_pairs = HashSet::new();
    for rel in store.relations() {
        if !matches!(rel.kind, RelationType::Calls | RelationType::Extends | RelationType::Implements) {
            continue;
        }
        let (Some(&a), Some(&b)) = (index_of.get(&rel.from), index_of.get(&rel.to)) else { continue };
        if a == b {
            continue;
        }
        let pair = (a.min(b), a.max(b));
        if !seen_pairs.insert(pair) {
            continue;
        }
        *adjacency[a].entry(b).or_insert(0) += 1;
        *adjacency[b].entry(a).or_insert(0) += 1;
    }

    Projection { nodes, index_of, adjacency }
}

/// A single deterministic pass of greedy modularity-gain label propagation
/// (the Louvain local-moving phase, §4.6). Operates at a fixed resolution
/// and iterates to a fixed point rather than the full multi-level Louvain
/// aggregation, which is sufficient for the node counts this store targets.
fn louvain_partition(projection: &Projection, resolution: f64, seed: u64) -> Vec<usize> {
    let n = projection.nodes.len();
    if n == 0 {
        return Vec::new();
    }

    let mut community = (0..n).collect::<Vec<usize>>();
    let degree: Vec<f64> = projection.adjacency.iter().map(|adj| adj.values().sum::<u32>() as f64).collect();
    let total_weight: f64 = degree.iter().sum::<f64>() / 2.0;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if total_weight == 0.0 {
        return community;
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut improved = true;
    let mut pass = 0;
    while improved && pass < 50 {
        improved = false;
        pass += 1;
        order.shuffle(&mut rng);

        for &node in &order {
            let current_comm = community[node];
            let mut gains: HashMap<usize, f64> = HashMap::new();
            for (&neighbor, &weight) in &projection.adjacency[node] {
                *gains.entry(community[neighbor]).or_insert(0.0) += weight as f64;
            }

            let mut best_comm = current_comm;
            let mut best_gain = gains.get(&current_comm).copied().unwrap_or(0.0)
                - resolution * degree[node] * community_degree(&community, &degree, current_comm) / (2.0 * total_weight);

            let mut candidates: Vec<usize> = gains.keys().copied().collect();
            candidates.sort();
            for comm in candidates {
                if comm == current_comm {
                    continue;
                }
                let k_in = gains.get(&comm).copied().unwrap_or(0.0);
                let sigma_tot = community_degree(&community, &degree, comm);
                let gain = k_in - resolution * degree[node] * sigma_tot / (2.0 * total_weight);
                if gain > best_gain + 1e-12 {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            if best_comm != current_comm {
                community[node] = best_comm;
                improved = true;
            }
        }
    }

    relabel_contiguous(&community)
}

fn community_degree(community: &[usize], degree: &[f64], comm: usize) -> f64 {
    community.iter().zip(degree.iter()).filter(|(&c, _)| c == comm).map(|(_, &d)| d).sum()
}

fn relabel_contiguous(community: &[usize]) -> Vec<usize> {
    let mut mapping = HashMap::new();
    let mut next = 0usize;
    community
        .iter()
        .map(|&c| {
            *mapping.entry(c).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}

pub struct CommunityResult {
    pub nodes: Vec<CommunityNode>,
    pub relations: Vec<CodeRelation>,
    pub modularity: f64,
}

/// Runs detection over `store` and returns surviving (≥2-member) communities
/// plus their `MEMBER_OF` edges (§4.6).
pub fn detect_communities(store: &GraphStore, resolution: f64, seed: u64) -> CommunityResult {
    let projection = build_projection(store);
    let labels = louvain_partition(&projection, resolution, seed);

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (node_idx, &comm) in labels.iter().enumerate() {
        groups.entry(comm).or_default().push(node_idx);
    }

    let mut nodes = Vec::new();
    let mut relations = Vec::new();
    let mut surviving_id = 0usize;

    let mut comm_keys: Vec<usize> = groups.keys().copied().collect();
    comm_keys.sort();

    for comm in comm_keys {
        let members = &groups[&comm];
        if members.len() < 2 {
            continue;
        }

        let internal_edges = count_internal_edges(&projection, members);
        let n = members.len() as f64;
        let cohesion = internal_edges as f64 / (n * (n - 1.0) / 2.0);

        let member_ids: Vec<&str> = members.iter().map(|&i| projection.nodes[i].as_str()).collect();
        let member_paths: Vec<&str> = member_ids
            .iter()
            .filter_map(|id| id.splitn(3, ':').nth(1))
            .collect();
        let heuristic_label = heuristic_label(&member_paths, &member_ids, surviving_id);

        let id = model::community_id(surviving_id);
        surviving_id += 1;

        for &member_idx in members {
            relations.push(CodeRelation::member_of(projection.nodes[member_idx].clone(), id.clone()));
        }

        nodes.push(CommunityNode {
            id,
            label: heuristic_label.clone(),
            heuristic_label,
            keywords: Vec::new(),
            description: String::new(),
            enriched_by: EnrichedBy::Heuristic,
            cohesion,
            symbol_count: members.len(),
        });
    }

    CommunityResult { nodes, relations, modularity: modularity(&projection, &labels) }
}

fn count_internal_edges(projection: &Projection, members: &[usize]) -> usize {
    let member_set: HashSet<usize> = members.iter().copied().collect();
    let mut count = 0;
    let mut seen = HashSet::new();
    for &a in members {
        for (&b, _) in &projection.adjacency[a] {
            if member_set.contains(&b) {
                let pair = (a.min(b), a.max(b));
                if seen.insert(pair) {
                    count += 1;
                }
            }
        }
    }
    count
}

fn modularity(projection: &Projection, labels: &[usize]) -> f64 {
    let degree: Vec<f64> = projection.adjacency.iter().map(|adj| adj.values().sum::<u32>() as f64).collect();
    let m2: f64 = degree.iter().sum();
    if m2 == 0.0 {
        return 0.0;
    }
    let mut q = 0.0;
    for (a, adj) in projection.adjacency.iter().enumerate() {
        for (&b, &w) in adj {
            if labels[a] == labels[b] {
                q += w as f64 - degree[a] * degree[b] / m2;
            }
        }
    }
    q / m2
}

/// Most frequent parent-directory basename among member file paths,
/// excluding `STOP_DIRS`, tie-broken by insertion order; falls back to the
/// longest common prefix (length > 2) of member names, else `Cluster_<N>`
/// carrying this community's surviving index (§4.6).
fn heuristic_label(member_paths: &[&str], member_ids: &[&str], surviving_id: usize) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for path in member_paths {
        let Some(dir) = parent_dir_basename(path) else { continue };
        if STOP_DIRS.contains(&dir.as_str()) {
            continue;
        }
        match counts.iter_mut().find(|(name, _)| *name == dir) {
            Some((_, count)) => *count += 1,
            None => counts.push((dir, 1)),
        }
    }
    if let Some((label, _)) = counts.into_iter().max_by_key(|(_, count)| *count) {
        return label;
    }

    let names: Vec<&str> = member_ids.iter().map(|id| id.rsplit(':').next().unwrap_or(id)).collect();
    if let Some(prefix) = longest_common_prefix(&names) {
        if prefix.len() > 2 {
            return prefix;
        }
    }

    format!("Cluster_{surviving_id}")
}

fn parent_dir_basename(path: &str) -> Option<String> {
    let dir = path.rsplit_once('/')?.0;
    dir.rsplit('/').next().map(str::to_string)
}

fn longest_common_prefix(names: &[&str]) -> Option<String> {
    let first = names.first()?;
    let mut prefix_len = first.len();
    for name in &names[1..] {
        let common = first.chars().zip(name.chars()).take_while(|(a, b)| a == b).count();
        prefix_len = prefix_len.min(common);
    }
    if prefix_len == 0 {
        None
    } else {
        Some(first[..prefix_len].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{symbol_id, CodeSymbolNode};
    use crate::types::{CallReason, SymbolLabel};

    fn symbol(store: &mut GraphStore, path: &str, name: &str) -> String {
        let id = symbol_id(SymbolLabel::Function, path, name);
        store.upsert_node(GraphNode::Symbol(CodeSymbolNode {
            id: id.clone(),
            label: SymbolLabel::Function,
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

    /// Scenario S5 (§8): triangle A-B-C plus isolated D yields one community
    /// of size 3 with cohesion 1.0, and D is not a member of any community.
    #[test]
    fn triangle_forms_one_community_with_full_cohesion() {
        let mut store = GraphStore::new();
        let a = symbol(&mut store, "m.ts", "A");
        let b = symbol(&mut store, "m.ts", "B");
        let c = symbol(&mut store, "m.ts", "C");
        let _d = symbol(&mut store, "m.ts", "D");

        store.add_relation(CodeRelation::calls(a.clone(), b.clone(), 0.85, CallReason::SameFile)).unwrap();
        store.add_relation(CodeRelation::calls(b.clone(), c.clone(), 0.85, CallReason::SameFile)).unwrap();
        store.add_relation(CodeRelation::calls(a.clone(), c.clone(), 0.85, CallReason::SameFile)).unwrap();

        let result = detect_communities(&store, 1.0, 42);
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].symbol_count, 3);
        assert!((result.nodes[0].cohesion - 1.0).abs() < 1e-9);

        let member_targets: HashSet<&str> = result.relations.iter().map(|r| r.from.as_str()).collect();
        assert!(member_targets.contains(a.as_str()));
        assert!(!member_targets.contains("Function:m.ts:D"));
    }

    #[test]
    fn deterministic_given_fixed_seed() {
        let mut store = GraphStore::new();
        for pair in [("A", "B"), ("B", "C"), ("C", "D"), ("D", "E"), ("E", "F")] {
            let from = symbol(&mut store, "m.ts", pair.0);
            let to = symbol(&mut store, "m.ts", pair.1);
            store.add_relation(CodeRelation::calls(from, to, 0.85, CallReason::SameFile)).unwrap();
        }

        let first = detect_communities(&store, 1.0, 42);
        let second = detect_communities(&store, 1.0, 42);

        let first_sizes: Vec<usize> = first.nodes.iter().map(|c| c.symbol_count).collect();
        let second_sizes: Vec<usize> = second.nodes.iter().map(|c| c.symbol_count).collect();
        assert_eq!(first_sizes, second_sizes);
    }
}
