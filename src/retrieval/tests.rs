use std::fs;

use super::*;
use crate::KnowledgeError;
use crate::embeddings::testing::{ByteSumEmbedder, ConstantEmbedder, UnavailableEmbedder};
use crate::embeddings::{ChunkUnit, ChunkingConfig};
use crate::indexer::build_knowledge_base;
use tempfile::TempDir;

/// Knowledge base built from "A. B. C." with two-sentence chunks overlapping by one
fn abc_knowledge_base(temp_dir: &TempDir) -> PathBuf {
    let document = temp_dir.path().join("abc.txt");
    fs::write(&document, "A. B. C.").expect("Failed to write document");
    let kb = temp_dir.path().join("kb");
    let chunking = ChunkingConfig {
        unit: ChunkUnit::Sentences,
        chunk_size: 2,
        chunk_overlap: 1,
    };
    build_knowledge_base(&ByteSumEmbedder::new(), &chunking, &document, &kb)
        .expect("build should succeed");
    kb
}

#[test]
fn query_returns_nearest_chunks_first() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);
    let embedder = ByteSumEmbedder::new();

    // "B. C." embeds to 57 and "A. B." to 55
    let results = query_knowledge_base(&embedder, &kb, "B. C.", 2).expect("query");
    assert_eq!(results, vec!["B. C.", "A. B."]);
}

#[test]
fn query_shrinks_to_index_size() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);
    let embedder = ByteSumEmbedder::new();

    let results = query_knowledge_base(&embedder, &kb, "A. B.", DEFAULT_TOP_K).expect("query");
    assert_eq!(results, vec!["A. B.", "B. C."]);
}

#[test]
fn zero_k_returns_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);
    let embedder = ByteSumEmbedder::new();

    assert!(query_knowledge_base(&embedder, &kb, "A. B.", 0).expect("query").is_empty());
}

#[test]
fn engine_serves_repeated_queries() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);
    let embedder = ByteSumEmbedder::new();

    let engine = QueryEngine::open(&embedder, &kb).expect("open");
    assert_eq!(engine.kb_path(), kb.as_path());
    assert_eq!(engine.store().len(), 2);

    let first = engine.search_hits("A. B.", 1).expect("first query");
    assert_eq!(first[0].chunk, "A. B.");
    assert_eq!(first[0].position, 0);
    assert_eq!(first[0].distance, 0.0);

    let second = engine.search("B. C.", 1).expect("second query");
    assert_eq!(second, vec!["B. C."]);
    assert_eq!(embedder.calls(), 2);
}

#[test]
fn reload_picks_up_rebuilt_knowledge_base() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);
    let embedder = ByteSumEmbedder::new();
    let mut engine = QueryEngine::open(&embedder, &kb).expect("open");

    let document = temp_dir.path().join("replacement.txt");
    fs::write(&document, "Rotate legumes with cereals.").expect("Failed to write document");
    build_knowledge_base(&embedder, &ChunkingConfig::default(), &document, &kb)
        .expect("rebuild should succeed");

    assert_eq!(engine.store().len(), 2, "engine keeps serving its loaded generation");
    engine.reload().expect("reload");
    assert_eq!(
        engine.search("legumes", 3).expect("query"),
        vec!["Rotate legumes with cereals."]
    );
}

#[test]
fn missing_knowledge_base_propagates() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = temp_dir.path().join("nothing-here");
    let embedder = ByteSumEmbedder::new();

    let result = query_knowledge_base(&embedder, &kb, "A. B.", 3);
    assert!(matches!(result, Err(KnowledgeError::KnowledgeBaseNotFound(_))));
    assert_eq!(embedder.calls(), 0, "nothing is embedded before the index loads");
}

#[test]
fn query_dimension_must_match_index() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);

    let result = query_knowledge_base(&ConstantEmbedder { dimension: 5 }, &kb, "A. B.", 2);
    assert!(matches!(
        result,
        Err(KnowledgeError::DimensionMismatch {
            expected: 2,
            actual: 5
        })
    ));
}

#[test]
fn unavailable_model_fails_query() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let kb = abc_knowledge_base(&temp_dir);

    let result = query_knowledge_base(&UnavailableEmbedder, &kb, "A. B.", 2);
    assert!(matches!(result, Err(KnowledgeError::ModelUnavailable(_))));
}
