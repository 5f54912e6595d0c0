mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use secondbrain::config;

#[derive(Parser)]
#[command(name = "secondbrain", version, about = "Conversational memory MCP server with self-consolidating topic notes")]
struct Cli {
    /// Config file (defaults to ~/.secondbrain/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Override the configured transport (stdio or http)
        #[arg(long)]
        transport: Option<String>,
    },
    /// Show the earlier turn that would be injected as context for a query
    Recall { query: String },
    /// Browse topic notes
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
    /// Print store statistics
    Stats,
    /// Write every note as Markdown into a directory
    Export { dir: PathBuf },
    /// Record turns from a JSONL file ({"query", "response", "timestamp"?} per line)
    Ingest { file: PathBuf },
    /// Check database health
    Doctor,
}

#[derive(Subcommand)]
enum NotesAction {
    /// List all notes
    List,
    /// Show one note by title or key
    Show { title: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::BrainConfig::load_from(path)?,
        None => config::BrainConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            match config.server.transport.as_str() {
                "stdio" => server::serve_stdio(config).await?,
                "http" => server::serve_http(config).await?,
                other => anyhow::bail!("unknown transport: {other}. Supported: stdio, http"),
            }
        }
        Command::Recall { query } => cli::recall::recall(&config, &query).await?,
        Command::Notes { action } => match action {
            NotesAction::List => cli::notes::list(&config)?,
            NotesAction::Show { title } => cli::notes::show(&config, &title)?,
        },
        Command::Stats => cli::stats::stats(&config)?,
        Command::Export { dir } => cli::export::export(&config, &dir)?,
        Command::Ingest { file } => cli::ingest::ingest(config, &file).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
