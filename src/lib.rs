use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KnowledgeError>;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Document not found or unreadable: {} ({reason})", path.display())]
    DocumentNotFound { path: PathBuf, reason: String },

    #[error("Unsupported document format: {} (only plain .txt files are accepted)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Document produced no chunks: {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector count ({vectors}) does not match chunk count ({chunks})")]
    CountMismatch { vectors: usize, chunks: usize },

    #[error("Knowledge base not found at {}", .0.display())]
    KnowledgeBaseNotFound(PathBuf),

    #[error("Corrupt knowledge base index: {0}")]
    CorruptIndex(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod indexer;
pub mod retrieval;
pub mod store;

pub use embeddings::Embedder;
pub use indexer::{BuildReport, Indexer, build_knowledge_base};
pub use retrieval::{DEFAULT_TOP_K, QueryEngine, query_knowledge_base};
pub use store::{IndexStore, SearchHit};
