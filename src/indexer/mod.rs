// Indexer module
// Rebuilds a knowledge base from one source document: chunk, embed, persist


use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::embeddings::{Chunker, ChunkingConfig, Embedder};
use crate::store::IndexStore;
use crate::{KnowledgeError, Result};

const ACCEPTED_EXTENSION: &str = "txt";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Outcome of a successful knowledge base build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub chunk_count: usize,
    pub dimension: usize,
    pub generation: String,
}

/// Ingestion pipeline bound to one embedding model and chunking policy
pub struct Indexer<'e> {
    embedder: &'e dyn Embedder,
    chunker: Chunker,
}

impl<'e> Indexer<'e> {
    #[inline]
    pub fn new(embedder: &'e dyn Embedder, chunking: ChunkingConfig) -> Result<Self> {
        Ok(Self {
            embedder,
            chunker: Chunker::new(chunking)?,
        })
    }

    #[inline]
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Replace the knowledge base at `kb` with the contents of `document`.
    ///
    /// Nothing is written until every chunk has been embedded, so any error
    /// leaves the previous knowledge base in place.
    #[inline]
    pub fn build(&self, document: &Path, kb: &Path) -> Result<BuildReport> {
        info!(
            "Building knowledge base {} from {}",
            kb.display(),
            document.display()
        );

        let text = read_document(document)?;
        let chunks = self.chunker.split(&text);
        if chunks.is_empty() {
            return Err(KnowledgeError::EmptyDocument(document.to_path_buf()));
        }
        debug!("Document split into {} chunks", chunks.len());

        let vectors = self.embedder.embed_batch(&chunks)?;
        if vectors.len() != chunks.len() {
            return Err(KnowledgeError::CountMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }

        let store = IndexStore::build(vectors, chunks)?;
        let generation = store.persist(kb)?;

        info!(
            "Indexed {} chunks ({} dimensions, model {}) into {}",
            store.len(),
            store.dimension(),
            self.embedder.model_id(),
            kb.display()
        );

        Ok(BuildReport {
            chunk_count: store.len(),
            dimension: store.dimension(),
            generation,
        })
    }
}

/// Build (or fully rebuild) the knowledge base at `kb` from `document`
#[inline]
pub fn build_knowledge_base(
    embedder: &dyn Embedder,
    chunking: &ChunkingConfig,
    document: &Path,
    kb: &Path,
) -> Result<BuildReport> {
    Indexer::new(embedder, chunking.clone())?.build(document, kb)
}

fn read_document(document: &Path) -> Result<String> {
    let accepted = document
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION));
    if !accepted {
        return Err(KnowledgeError::UnsupportedFormat(document.to_path_buf()));
    }

    let bytes = fs::read(document).map_err(|e| KnowledgeError::DocumentNotFound {
        path: document.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut text = String::from_utf8(bytes)
        .map_err(|_| KnowledgeError::UnsupportedFormat(document.to_path_buf()))?;

    if text.starts_with(BYTE_ORDER_MARK) {
        text.drain(..BYTE_ORDER_MARK.len_utf8());
    }
    Ok(text)
}
