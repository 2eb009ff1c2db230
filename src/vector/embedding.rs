//! The embedding collaborator abstraction (§4.9, §6): `fastembed` is an
//! optional dependency (feature `embeddings`), so ingestion programs
//! against a trait with a no-op fallback rather than calling the crate
//! directly, mirroring codanna's `SimpleSemanticSearch` wrapper but
//! generalized to a swappable collaborator (SPEC_FULL [AMBIENT-4.6]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("failed to generate embedding: {0}")]
    Generation(String),
}

pub trait EmbeddingGenerator: Send + Sync {
    fn dimension(&self) -> usize;

    /// Batched embedding generation (§4.9: "batched to respect external
    /// embedder throughput"). Implementations should chunk internally if
    /// the underlying model has a narrower batch limit.
    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// No-op generator used when the `embeddings` feature is disabled or the
/// model failed to initialize; `--skip-embeddings` routes here too (§6 CLI).
pub struct NullEmbeddingGenerator {
    dimension: usize,
}

impl NullEmbeddingGenerator {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingGenerator for NullEmbeddingGenerator {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_generator::FastEmbedGenerator;

#[cfg(feature = "embeddings")]
mod fastembed_generator {
    use super::{EmbeddingError, EmbeddingGenerator};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Wraps `fastembed::TextEmbedding` behind the `EmbeddingGenerator`
    /// trait, following codanna's `SimpleSemanticSearch` pattern of locking
    /// the model for interior mutability (`embed` takes `&mut self` in
    /// `fastembed`).
    pub struct FastEmbedGenerator {
        model: Mutex<TextEmbedding>,
        dimension: usize,
    }

    impl FastEmbedGenerator {
        pub fn new() -> Result<Self, EmbeddingError> {
            let mut model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
                .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
            let probe = model
                .embed(vec!["probe"], None)
                .map_err(|e| EmbeddingError::Generation(e.to_string()))?;
            let dimension = probe.into_iter().next().map(|v| v.len()).unwrap_or(384);
            Ok(Self { model: Mutex::new(model), dimension })
        }
    }

    impl EmbeddingGenerator for FastEmbedGenerator {
        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let texts = inputs.to_vec();
            self.model
                .lock()
                .unwrap()
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Generation(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_generator_returns_zero_vectors_of_configured_dimension() {
        let generator = NullEmbeddingGenerator::new(384);
        let out = generator.embed(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 384);
        assert!(out[0].iter().all(|&v| v == 0.0));
    }
}
