//! The HNSW-backed vector index (§4.9). `hnsw_rs` has no portable on-disk
//! graph format, so only the flat `(nodeId, embedding)` table is persisted
//! (as `CodeEmbeddingNode` rows in the `CodeEmbedding` table, §6); the HNSW
//! structure itself is rebuilt by replaying those records on load.

use std::collections::HashSet;

use hnsw_rs::prelude::*;

use crate::model::CodeEmbeddingNode;

const MAX_NB_CONNECTION: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const MAX_LAYER: usize = 16;
const EF_SEARCH: usize = 64;

pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    id_by_internal: Vec<String>,
    records: Vec<CodeEmbeddingNode>,
}

impl VectorIndex {
    pub fn new(dimension: usize, expected_elements: usize) -> Self {
        Self {
            dimension,
            hnsw: Hnsw::new(MAX_NB_CONNECTION, expected_elements.max(16), MAX_LAYER, EF_CONSTRUCTION, DistCosine {}),
            id_by_internal: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, node_id: &str, embedding: Vec<f32>) {
        debug_assert_eq!(embedding.len(), self.dimension, "embedding dimension mismatch");
        let internal_id = self.id_by_internal.len();
        self.hnsw.insert((&embedding, internal_id));
        self.id_by_internal.push(node_id.to_string());
        self.records.push(CodeEmbeddingNode { node_id: node_id.to_string(), embedding });
    }

    /// Cosine-distance nearest neighbors (§4.9: "search returns `(nodeId,
    /// distance)`").
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        if self.id_by_internal.is_empty() {
            return Vec::new();
        }
        self.hnsw
            .search(query, k, EF_SEARCH)
            .into_iter()
            .map(|neighbour| (self.id_by_internal[neighbour.d_id].clone(), neighbour.distance))
            .collect()
    }

    /// The flat records backing this index, for persistence to the
    /// `CodeEmbedding` table.
    pub fn records(&self) -> &[CodeEmbeddingNode] {
        &self.records
    }

    /// Rebuilds an index by replaying previously persisted records,
    /// skipping only nodes whose id no longer exists in the current graph
    /// (§4.9: re-ingestion restores embeddings "skipping only nodes whose
    /// id still exists" — i.e. keep records for ids that survived).
    pub fn rebuild(dimension: usize, records: Vec<CodeEmbeddingNode>, live_ids: &HashSet<String>) -> Self {
        let surviving: Vec<CodeEmbeddingNode> =
            records.into_iter().filter(|r| live_ids.contains(&r.node_id)).collect();
        let mut index = Self::new(dimension, surviving.len());
        for record in surviving {
            index.insert(&record.node_id, record.embedding);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_neighbor_by_cosine_distance() {
        let mut index = VectorIndex::new(3, 16);
        index.insert("Function:a.ts:foo", vec![1.0, 0.0, 0.0]);
        index.insert("Function:a.ts:bar", vec![0.0, 1.0, 0.0]);

        let hits = index.search(&[0.9, 0.1, 0.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "Function:a.ts:foo");
    }

    #[test]
    fn rebuild_skips_records_whose_node_no_longer_exists() {
        let mut index = VectorIndex::new(2, 16);
        index.insert("Function:a.ts:foo", vec![1.0, 0.0]);
        index.insert("Function:a.ts:bar", vec![0.0, 1.0]);
        let records = index.records().to_vec();

        let mut live = HashSet::new();
        live.insert("Function:a.ts:foo".to_string());

        let rebuilt = VectorIndex::rebuild(2, records, &live);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.records()[0].node_id, "Function:a.ts:foo");
    }
}
