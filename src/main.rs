use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use liam::config::LiamConfig;
use liam::{cli, server};

#[derive(Parser)]
#[command(name = "liam", version, about = "HTTP relay for GPT completions, Gmail, Google Sheets/Drive, and ZIP memory recall")]
struct Cli {
    /// Path to the TOML config file (default: ~/.liam/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Ingest a local ZIP archive into the memory index
    Ingest {
        /// Path to the .zip file
        zip: PathBuf,
        /// Agent the archive belongs to
        #[arg(long)]
        agent: Option<String>,
    },
    /// Query the memory index
    Recall {
        query: String,
        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// List ingested archives
    Memories,
    /// Re-embed every extracted archive with the configured model
    Reindex,
    /// Delete all ingested memories
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check configuration and storage health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LiamConfig::load_from(path)?,
        None => LiamConfig::load()?,
    };

    // Logs go to stderr so CLI output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Ingest { zip, agent } => cli::ingest::ingest(&config, &zip, agent.as_deref()).await?,
        Command::Recall { query, top_k } => cli::recall::recall(&config, &query, top_k).await?,
        Command::Memories => cli::memories::memories(&config)?,
        Command::Reindex => cli::reindex::reindex(&config).await?,
        Command::Reset { yes } => cli::reset::reset(&config, yes).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
