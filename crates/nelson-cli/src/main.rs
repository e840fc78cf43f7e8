mod commands;

use clap::{Parser, Subcommand};
use nelson_core::Provider;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nelson-cli")]
#[command(about = "Nelson news pipeline operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Fetch and normalize a single provider, printing the items
    Fetch {
        /// Provider key (e.g. dtf, stopgame, steam_developers)
        provider: Provider,
    },
    /// Run one ingestion cycle without delivering anything; without
    /// --dry-run the new items are stored and so never announced later
    Once {
        /// Dedup against an empty in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List the newest stored items
    Recent {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = nelson_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Migrate => commands::run_migrate(&config).await,
        Commands::Fetch { provider } => commands::run_fetch(&config, provider).await,
        Commands::Once { dry_run } => commands::run_once(&config, dry_run).await,
        Commands::Recent { page, page_size } => {
            commands::run_recent(&config, page, page_size).await
        }
    }
}

#[cfg(test)]
mod tests;
