//! Reciprocal Rank Fusion (§4.11): merges independently ranked id lists
//! (BM25 file hits, vector-search symbol hits, ...) into a single fused
//! ranking, without requiring the lists to share id granularity.

use indexmap::IndexMap;

/// One fused hit: `score = Σ 1/(K + rank + 1)` summed across every source
/// list the id appeared in. `sources` records first-seen source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: String,
    pub score: f64,
    pub sources: Vec<&'static str>,
}

/// Fuses `sources` (each a `(name, ranked ids)` pair, 0-indexed rank order)
/// with RRF constant `k` (§4.11: `K=60` default, `QueryConfig::rrf_k`).
/// Output is sorted descending by score; the sort is stable, so ids that
/// tie are ordered by first insertion — i.e. by which source list surfaced
/// them first (§4.11: "ties broken by first-seen source order").
pub fn fuse(sources: &[(&'static str, &[String])], k: f64) -> Vec<FusedHit> {
    let mut by_id: IndexMap<String, FusedHit> = IndexMap::new();

    for (name, ranked) in sources {
        for (rank, id) in ranked.iter().enumerate() {
            let entry = by_id.entry(id.clone()).or_insert_with(|| FusedHit {
                id: id.clone(),
                score: 0.0,
                sources: Vec::new(),
            });
            entry.score += 1.0 / (k + rank as f64 + 1.0);
            if !entry.sources.contains(name) {
                entry.sources.push(name);
            }
        }
    }

    let mut fused: Vec<FusedHit> = by_id.into_values().collect();
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn ranks_that_agree_across_sources_score_higher() {
        let bm25 = ids(&["a", "b", "c"]);
        let semantic = ids(&["b", "a", "d"]);
        let fused = fuse(&[("bm25", &bm25), ("semantic", &semantic)], 60.0);

        assert_eq!(fused[0].id, "a");
        assert!(fused[0].sources.contains(&"bm25"));
        assert!(fused[0].sources.contains(&"semantic"));
    }

    #[test]
    fn ties_break_by_first_seen_source_order() {
        let bm25 = ids(&["x"]);
        let semantic = ids(&["y"]);
        let fused = fuse(&[("bm25", &bm25), ("semantic", &semantic)], 60.0);

        assert_eq!(fused[0].score, fused[1].score);
        assert_eq!(fused[0].id, "x");
        assert_eq!(fused[1].id, "y");
    }

    #[test]
    fn id_present_in_only_one_source_carries_a_single_source_tag() {
        let bm25 = ids(&["only-bm25"]);
        let semantic: Vec<String> = Vec::new();
        let fused = fuse(&[("bm25", &bm25), ("semantic", &semantic)], 60.0);

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].sources, vec!["bm25"]);
    }
}
