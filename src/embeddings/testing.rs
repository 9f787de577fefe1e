//! Deterministic embedders for unit tests.

use std::cell::Cell;

use super::Embedder;
use crate::{KnowledgeError, Result};

/// Embeds text as `[sum(bytes) mod 100, 0]`.
#[derive(Default)]
pub struct ByteSumEmbedder {
    calls: Cell<usize>,
}

impl ByteSumEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let sum: u64 = text.bytes().map(u64::from).sum();
        vec![(sum % 100) as f32, 0.0]
    }
}

impl Embedder for ByteSumEmbedder {
    fn model_id(&self) -> &str {
        "byte-sum"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Returns fixed-length vectors of a chosen dimension, for mismatch tests.
pub struct ConstantEmbedder {
    pub dimension: usize,
}

impl Embedder for ConstantEmbedder {
    fn model_id(&self) -> &str {
        "constant"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; self.dimension]).collect())
    }
}

/// Always fails as if the model server were down.
pub struct UnavailableEmbedder;

impl Embedder for UnavailableEmbedder {
    fn model_id(&self) -> &str {
        "unavailable"
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(KnowledgeError::ModelUnavailable(
            "connection refused".to_string(),
        ))
    }
}
