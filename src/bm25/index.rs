//! BM25 inverted index (§4.8): name-field-boosted BM25 ranking with
//! prefix/fuzzy fallback, serialized to a single self-describing JSON blob.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use super::tokenizer::tokenize;

const K1: f64 = 1.2;
const B: f64 = 0.75;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Posting {
    doc: u32,
    weighted_tf: f64,
}

/// Persisted, reloadable BM25 index. Every field needed to reproduce
/// search results is part of this struct so `serde_json` round-trips it
/// losslessly (§4.8, §8 invariant 8).
#[derive(Debug, Serialize, Deserialize)]
pub struct Bm25Index {
    name_field_boost: f64,
    fuzzy_edit_fraction: f64,
    doc_paths: Vec<String>,
    doc_lengths: Vec<f64>,
    avg_doc_length: f64,
    postings: HashMap<String, Vec<Posting>>,
}

pub struct SearchHit {
    pub file_path: String,
    pub score: f64,
    pub rank: usize,
}

impl Bm25Index {
    pub fn builder(name_field_boost: f64, fuzzy_edit_fraction: f64) -> Bm25IndexBuilder {
        Bm25IndexBuilder {
            name_field_boost,
            fuzzy_edit_fraction,
            doc_paths: Vec::new(),
            term_freqs: Vec::new(),
        }
    }

    pub fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
        let terms = tokenize(query);
        let mut scores: HashMap<u32, f64> = HashMap::new();

        for term in &terms {
            for (matched_term, weight) in self.matching_terms(term) {
                let Some(postings) = self.postings.get(&matched_term) else { continue };
                let idf = self.idf(postings.len());
                for posting in postings {
                    let len = self.doc_lengths[posting.doc as usize];
                    let denom = posting.weighted_tf + K1 * (1.0 - B + B * len / self.avg_doc_length.max(1e-9));
                    let term_score = idf * (posting.weighted_tf * (K1 + 1.0)) / denom.max(1e-9);
                    *scores.entry(posting.doc).or_insert(0.0) += term_score * weight;
                }
            }
        }

        let mut ranked: Vec<(u32, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (doc, score))| SearchHit {
                file_path: self.doc_paths[doc as usize].clone(),
                score,
                rank,
            })
            .collect()
    }

    fn idf(&self, doc_freq: usize) -> f64 {
        let n = self.doc_paths.len() as f64;
        ((n - doc_freq as f64 + 0.5) / (doc_freq as f64 + 0.5) + 1.0).ln()
    }

    /// Exact match first; otherwise every vocabulary term that is a prefix
    /// of `token` or within `fuzzy_edit_fraction` edit distance, each scaled
    /// down (§4.8: "supports prefix match and fuzzy match").
    fn matching_terms(&self, token: &str) -> Vec<(String, f64)> {
        if self.postings.contains_key(token) {
            return vec![(token.to_string(), 1.0)];
        }

        let mut matches = Vec::new();
        for term in self.postings.keys() {
            if term.starts_with(token) {
                matches.push((term.clone(), 0.8));
                continue;
            }
            let max_len = term.len().max(token.len());
            if max_len == 0 {
                continue;
            }
            let distance = levenshtein(term, token);
            if (distance as f64) / (max_len as f64) <= self.fuzzy_edit_fraction {
                matches.push((term.clone(), 0.5));
            }
        }
        matches
    }
}

pub struct Bm25IndexBuilder {
    name_field_boost: f64,
    fuzzy_edit_fraction: f64,
    doc_paths: Vec<String>,
    /// per-document `term -> (content_tf, name_tf)`.
    term_freqs: Vec<HashMap<String, (u32, u32)>>,
}

impl Bm25IndexBuilder {
    /// Adds a document `(id = filePath, content = fullBytes, name =
    /// basename)` (§4.8).
    pub fn add_document(&mut self, file_path: &str, content: &str, name: &str) {
        let mut freqs: HashMap<String, (u32, u32)> = HashMap::new();
        for token in tokenize(content) {
            freqs.entry(token).or_insert((0, 0)).0 += 1;
        }
        for token in tokenize(name) {
            freqs.entry(token).or_insert((0, 0)).1 += 1;
        }
        self.doc_paths.push(file_path.to_string());
        self.term_freqs.push(freqs);
    }

    pub fn build(self) -> Bm25Index {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(self.term_freqs.len());

        for (doc_idx, freqs) in self.term_freqs.iter().enumerate() {
            let mut length = 0.0;
            for (term, (content_tf, name_tf)) in freqs {
                let weighted_tf = *content_tf as f64 + self.name_field_boost * *name_tf as f64;
                length += weighted_tf;
                postings.entry(term.clone()).or_default().push(Posting {
                    doc: doc_idx as u32,
                    weighted_tf,
                });
            }
            doc_lengths.push(length);
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<f64>() / doc_lengths.len() as f64
        };

        Bm25Index {
            name_field_boost: self.name_field_boost,
            fuzzy_edit_fraction: self.fuzzy_edit_fraction,
            doc_paths: self.doc_paths,
            doc_lengths,
            avg_doc_length,
            postings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Bm25Index {
        let mut builder = Bm25Index::builder(2.0, 0.2);
        builder.add_document("src/auth.rs", "fn login authenticate user session token", "auth");
        builder.add_document("src/render.rs", "fn paint draw canvas pixel buffer", "render");
        builder.build()
    }

    #[test]
    fn ranks_documents_containing_the_query_term_first() {
        let index = sample_index();
        let hits = index.search("authenticate", 10);
        assert_eq!(hits[0].file_path, "src/auth.rs");
        assert_eq!(hits[0].rank, 0);
    }

    #[test]
    fn name_field_boost_favors_name_matches() {
        let mut builder = Bm25Index::builder(2.0, 0.2);
        builder.add_document("src/auth.rs", "generic body text shared across files", "auth");
        builder.add_document("src/other.rs", "generic body text shared across files auth", "other");
        let index = builder.build();

        let hits = index.search("auth", 10);
        assert_eq!(hits[0].file_path, "src/auth.rs");
    }

    #[test]
    fn fuzzy_match_finds_misspelled_query() {
        let index = sample_index();
        let hits = index.search("authentcate", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].file_path, "src/auth.rs");
    }

    #[test]
    fn round_trips_through_json_with_identical_top_k() {
        let index = sample_index();
        let before = index.search("login", 10).into_iter().map(|h| h.file_path).collect::<Vec<_>>();

        let json = serde_json::to_string(&index).unwrap();
        let reloaded: Bm25Index = serde_json::from_str(&json).unwrap();
        let after = reloaded.search("login", 10).into_iter().map(|h| h.file_path).collect::<Vec<_>>();

        assert_eq!(before, after);
    }
}
