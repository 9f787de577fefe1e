// Embeddings module
// Text chunking plus the embedding-model seam shared by ingestion and query

pub mod chunking;
pub mod ollama;

#[cfg(test)]
pub(crate) mod testing;

pub use chunking::{ChunkUnit, Chunker, ChunkingConfig};
pub use ollama::OllamaClient;

use crate::{KnowledgeError, Result};

/// A pretrained text-embedding model.
///
/// Implementations must be deterministic: the same text under the same model
/// configuration always maps to the same vector, and every vector a given
/// model returns has the same dimensionality.
pub trait Embedder {
    /// Identifier of the underlying model, e.g. `paraphrase-multilingual:latest`
    fn model_id(&self) -> &str;

    /// Embed a batch of texts. `output[i]` is the embedding of `texts[i]`.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text, typically a query
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        if vectors.len() != 1 {
            return Err(KnowledgeError::CountMismatch {
                vectors: vectors.len(),
                chunks: 1,
            });
        }
        Ok(vectors.remove(0))
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Check that every vector shares one dimensionality and return it.
///
/// An empty slice has dimension 0.
#[inline]
pub fn common_dimension(vectors: &[Vec<f32>]) -> Result<usize> {
    let Some(first) = vectors.first() else {
        return Ok(0);
    };
    let expected = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(KnowledgeError::DimensionMismatch {
            expected,
            actual: bad.len(),
        });
    }
    Ok(expected)
}
