mod discover;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "codehound-cli")]
#[command(about = "Find discount codes for online stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one discovery and print the ranked codes
    Discover {
        /// Store URL, e.g. <https://www.examplestore.com>
        url: String,
        /// Print the full outcome, per-source reports included, as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a store URL maps to aggregator slugs, without a browser
    Slug {
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { url, json } => {
            let config = codehound_core::load_app_config()?;
            init_tracing(&config.log_level)?;
            discover::run_discover(&config, &url, json).await?;
        }
        Commands::Slug { url } => {
            init_tracing("warn")?;
            discover::run_slug(&url)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
