// Retrieval module
// Answers free-text queries against a persisted knowledge base

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Result;
use crate::embeddings::Embedder;
use crate::store::{IndexStore, SearchHit};

/// Number of passages returned when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 3;

/// A knowledge base loaded once and queried many times with one embedder
pub struct QueryEngine<'e> {
    embedder: &'e dyn Embedder,
    kb_path: PathBuf,
    store: IndexStore,
}

impl<'e> QueryEngine<'e> {
    #[inline]
    pub fn open(embedder: &'e dyn Embedder, kb: &Path) -> Result<Self> {
        let store = IndexStore::load(kb)?;
        debug!(
            "Opened knowledge base {} with {} chunks",
            kb.display(),
            store.len()
        );
        Ok(Self {
            embedder,
            kb_path: kb.to_path_buf(),
            store,
        })
    }

    #[inline]
    pub fn kb_path(&self) -> &Path {
        &self.kb_path
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Re-read the knowledge base, picking up the latest published generation
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        self.store = IndexStore::load(&self.kb_path)?;
        debug!(
            "Reloaded knowledge base {} ({} chunks)",
            self.kb_path.display(),
            self.store.len()
        );
        Ok(())
    }

    /// Search the knowledge base for passages similar to `query`
    ///
    /// # Arguments
    /// * `query` - Free-text question or keywords
    /// * `k` - Maximum number of passages to return
    ///
    /// # Returns
    /// * `Result<Vec<SearchHit>>` - Matches nearest first, at most `k` of them
    #[inline]
    pub fn search_hits(&self, query: &str, k: usize) -> Result<Vec<SearchHit<'_>>> {
        let query_vector = self.embedder.embed(query)?;
        let hits = self.store.search(&query_vector, k)?;
        debug!("Query matched {} of {} requested passages", hits.len(), k);
        Ok(hits)
    }

    /// Matched chunk texts, nearest first
    #[inline]
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .search_hits(query, k)?
            .into_iter()
            .map(|hit| hit.chunk.to_string())
            .collect())
    }
}

/// Load the knowledge base at `kb` and return the `k` passages nearest to
/// `query`
#[inline]
pub fn query_knowledge_base(
    embedder: &dyn Embedder,
    kb: &Path,
    query: &str,
    k: usize,
) -> Result<Vec<String>> {
    QueryEngine::open(embedder, kb)?.search(query, k)
}
