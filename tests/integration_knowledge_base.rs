#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::fs;
use std::path::PathBuf;

use agri_knowledge::config::{Config, OllamaConfig};
use agri_knowledge::embeddings::{ChunkUnit, ChunkingConfig, OllamaClient};
use agri_knowledge::{IndexStore, KnowledgeError, build_knowledge_base, query_knowledge_base};
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const TOPICS: [&str; 3] = ["maize", "rice", "soil"];

const GUIDE: &str = "Maize needs nitrogen at planting. \
Rice grows in flooded paddies. \
Soil testing guides lime application.";

/// Embeds each input as the number of times each topic word occurs in it
struct TopicResponder;

impl Respond for TopicResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = request.body_json().expect("request body is json");
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .expect("input array")
            .iter()
            .map(|text| {
                let text = text.as_str().expect("string input").to_lowercase();
                TOPICS
                    .iter()
                    .map(|topic| text.matches(topic).count() as f32)
                    .collect()
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn mock_ollama() -> MockServer {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(TopicResponder)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "test-model" }]
        })))
        .mount(&server)
        .await;
    server
}

fn ollama_config(uri: &str) -> OllamaConfig {
    let url = Url::parse(uri).expect("mock server uri should parse");
    OllamaConfig {
        host: url.host_str().expect("mock server host").to_string(),
        port: url.port().expect("mock server port"),
        model: "test-model".to_string(),
        retry_attempts: 1,
        ..OllamaConfig::default()
    }
}

fn one_sentence_chunks() -> ChunkingConfig {
    ChunkingConfig {
        unit: ChunkUnit::Sentences,
        chunk_size: 1,
        chunk_overlap: 0,
    }
}

fn write_guide(temp_dir: &TempDir) -> PathBuf {
    let document = temp_dir.path().join("crop_guide.txt");
    fs::write(&document, GUIDE).expect("Failed to write document");
    document
}

#[tokio::test(flavor = "multi_thread")]
async fn build_then_query_through_ollama() {
    let server = mock_ollama().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let document = write_guide(&temp_dir);
    let kb = temp_dir.path().join("vector_db").join("agri_knowledge");
    let config = ollama_config(&server.uri());

    let (report, results) = tokio::task::spawn_blocking(move || {
        let client = OllamaClient::new(&config).expect("should create client");
        client.health_check().expect("mock model should be available");

        let report = build_knowledge_base(&client, &one_sentence_chunks(), &document, &kb)
            .expect("build should succeed");
        let results = query_knowledge_base(&client, &kb, "When should maize be fertilized?", 2)
            .expect("query should succeed");
        (report, results)
    })
    .await
    .expect("blocking task should not panic");

    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.dimension, 3);
    assert_eq!(
        results,
        vec![
            "Maize needs nitrogen at planting.",
            "Rice grows in flooded paddies.",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_commands_use_configured_knowledge_base() {
    let server = mock_ollama().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let document = write_guide(&temp_dir);

    let config_dir = temp_dir.path().join("config");
    let mut config = Config::load(&config_dir).expect("missing config falls back to defaults");
    config.ollama = ollama_config(&server.uri());
    config.chunking = one_sentence_chunks();
    config.save().expect("config should save");

    let kb = tokio::task::spawn_blocking(move || {
        let config = Config::load(&config_dir).expect("saved config should load");
        agri_knowledge::commands::build(&config, &document, None).expect("build command");
        agri_knowledge::commands::query(&config, "rice paddies", None, None)
            .expect("query command");
        agri_knowledge::commands::show_status(&config, None).expect("status command");
        config.knowledge_base_path()
    })
    .await
    .expect("blocking task should not panic");

    assert!(kb.starts_with(temp_dir.path().join("config")));
    let info = IndexStore::describe(&kb).expect("knowledge base should exist");
    assert_eq!(info.chunk_count, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_rebuild_keeps_previous_knowledge_base() {
    let server = mock_ollama().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let document = write_guide(&temp_dir);
    let kb = temp_dir.path().join("kb");
    let working = ollama_config(&server.uri());
    let broken = OllamaConfig {
        port: 1,
        host: "127.0.0.1".to_string(),
        ..working.clone()
    };

    let (rebuild, results) = tokio::task::spawn_blocking(move || {
        let client = OllamaClient::new(&working).expect("should create client");
        build_knowledge_base(&client, &one_sentence_chunks(), &document, &kb)
            .expect("first build should succeed");

        let down = OllamaClient::new(&broken).expect("should create client");
        let rebuild = build_knowledge_base(&down, &one_sentence_chunks(), &document, &kb);

        let results = query_knowledge_base(&client, &kb, "soil lime", 1)
            .expect("previous knowledge base should still answer");
        (rebuild, results)
    })
    .await
    .expect("blocking task should not panic");

    assert!(matches!(rebuild, Err(KnowledgeError::ModelUnavailable(_))));
    assert_eq!(results, vec!["Soil testing guides lime application."]);
}

#[test]
fn query_without_knowledge_base_fails() {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = OllamaClient::new(&OllamaConfig::default()).expect("should create client");

    let result = query_knowledge_base(&client, &temp_dir.path().join("kb"), "maize", 3);
    assert!(matches!(
        result,
        Err(KnowledgeError::KnowledgeBaseNotFound(_))
    ));
}
