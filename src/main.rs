use std::path::PathBuf;

use agri_knowledge::Result;
use agri_knowledge::commands::{build, configure, query, show_status};
use agri_knowledge::config::Config;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agri-knowledge")]
#[command(about = "Build and search an agricultural knowledge base with local embeddings")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the default knowledge base
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and chunking settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build (or fully rebuild) the knowledge base from a plain-text document
    Build {
        /// Path to a .txt source document
        document: PathBuf,
        /// Knowledge base directory, overriding the configured one
        #[arg(long)]
        kb: Option<PathBuf>,
    },
    /// Search the knowledge base for passages related to a question
    Query {
        /// Free-text question or keywords
        text: String,
        /// Number of passages to return
        #[arg(short, long)]
        k: Option<usize>,
        /// Knowledge base directory, overriding the configured one
        #[arg(long)]
        kb: Option<PathBuf>,
    },
    /// Show knowledge base and Ollama status
    Status {
        /// Knowledge base directory, overriding the configured one
        #[arg(long)]
        kb: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            configure(&config_dir, show)?;
        }
        Commands::Build { document, kb } => {
            let config = Config::load(&config_dir)?;
            build(&config, &document, kb.as_deref())?;
        }
        Commands::Query { text, k, kb } => {
            let config = Config::load(&config_dir)?;
            query(&config, &text, k, kb.as_deref())?;
        }
        Commands::Status { kb } => {
            let config = Config::load(&config_dir)?;
            show_status(&config, kb.as_deref())?;
        }
    }

    Ok(())
}
