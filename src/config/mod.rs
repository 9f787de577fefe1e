// Configuration management module
// TOML settings for the embedding model, chunking and the knowledge base location

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, KnowledgeBaseConfig, OllamaConfig};
