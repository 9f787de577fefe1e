use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::{Config, run_interactive_config, show_config};
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::Indexer;
use crate::retrieval::QueryEngine;
use crate::store::IndexStore;

/// Show or interactively edit the configuration stored in `config_dir`
#[inline]
pub fn configure(config_dir: &Path, show: bool) -> Result<()> {
    if show {
        let config = Config::load(config_dir)?;
        show_config(&config)
    } else {
        run_interactive_config(config_dir)
    }
}

/// Rebuild a knowledge base from a plain-text document
#[inline]
pub fn build(config: &Config, document: &Path, kb: Option<&Path>) -> Result<()> {
    let kb_path = resolve_kb(config, kb);
    info!(
        "Building knowledge base at {} from {}",
        kb_path.display(),
        document.display()
    );

    let client =
        OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    let indexer = Indexer::new(&client, config.chunking.clone())?;

    let bar = spinner(format!("Embedding {} with {}", document.display(), client.model_id()));
    let result = indexer.build(document, &kb_path);
    bar.finish_and_clear();

    let report = result.with_context(|| {
        format!(
            "Failed to build knowledge base from {}",
            document.display()
        )
    })?;

    println!("{}", style("✓ Knowledge base built").green().bold());
    println!("   📄 Chunks: {}", report.chunk_count);
    println!("   🔢 Dimension: {}", report.dimension);
    println!("   🏷️  Generation: {}", report.generation);
    println!("   📁 Location: {}", style(kb_path.display()).cyan());

    Ok(())
}

/// Print the passages most similar to `text`
#[inline]
pub fn query(config: &Config, text: &str, k: Option<usize>, kb: Option<&Path>) -> Result<()> {
    let kb_path = resolve_kb(config, kb);
    let k = k.unwrap_or(config.knowledge_base.top_k);

    let client =
        OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    let engine = QueryEngine::open(&client, &kb_path)
        .with_context(|| format!("Failed to open knowledge base {}", kb_path.display()))?;
    let hits = engine.search_hits(text, k)?;

    if hits.is_empty() {
        println!("📭 No matching passages found");
        return Ok(());
    }

    println!(
        "{}",
        style(format!("🔍 Top {} passages for \"{}\"", hits.len(), text)).bold()
    );
    for (rank, hit) in hits.iter().enumerate() {
        println!();
        println!(
            "{} {}",
            style(format!("#{}", rank + 1)).cyan().bold(),
            style(format!("(distance {:.4})", hit.distance)).dim()
        );
        println!("{}", hit.chunk);
    }

    Ok(())
}

/// Show the knowledge base summary and Ollama connectivity
#[inline]
pub fn show_status(config: &Config, kb: Option<&Path>) -> Result<()> {
    let kb_path = resolve_kb(config, kb);

    println!("📊 Agri Knowledge Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📚 Knowledge Base:");
    println!("   📁 Path: {}", kb_path.display());
    if IndexStore::exists(&kb_path) {
        match IndexStore::describe(&kb_path) {
            Ok(info) => {
                println!("   ✅ Status: Ready");
                println!("   📄 Chunks: {}", info.chunk_count);
                println!("   🔢 Dimension: {}", info.dimension);
                println!("   🏷️  Generation: {}", info.generation);
            }
            Err(e) => {
                warn!("Knowledge base at {} is unreadable: {}", kb_path.display(), e);
                println!("   ❌ Status: Unreadable - {}", e);
            }
        }
    } else {
        println!("   📭 Status: Not built yet");
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.with_retry_attempts(1).health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {}", e);
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'agri-knowledge build <document.txt>' to (re)build the knowledge base");
    println!("   • Use 'agri-knowledge query \"<question>\"' to search it");

    Ok(())
}

fn resolve_kb(config: &Config, kb: Option<&Path>) -> PathBuf {
    kb.map_or_else(|| config.knowledge_base_path(), Path::to_path_buf)
}

fn spinner(message: String) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
