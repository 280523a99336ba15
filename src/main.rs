use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "harvester",
    version,
    about = "Resumable day-by-day news archive harvester",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); defaults plus HARVESTER_* variables when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the shallow sweep, then the detail sweep
    Harvest {
        /// Oldest day to harvest (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Newest day to harvest (YYYY-MM-DD), today when omitted
        #[arg(long)]
        end: Option<String>,

        /// Stop the detail sweep after this many URLs
        #[arg(long)]
        max_urls: Option<usize>,

        /// Only collect archive summaries
        #[arg(long, conflicts_with = "detail_only")]
        shallow_only: bool,

        /// Only fetch details for URLs already collected
        #[arg(long)]
        detail_only: bool,
    },

    /// List article URLs that still need a detail fetch
    Pending {
        /// Write URLs to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show counts from the journal files
    Stats,

    /// Preview one archive day without saving anything
    Day {
        /// Day to fetch (YYYY-MM-DD)
        date: String,

        /// Number of articles to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = harvester::config::Config::load(cli.config.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("harvester starting");

    match cli.command {
        Commands::Harvest {
            start,
            end,
            max_urls,
            shallow_only,
            detail_only,
        } => {
            tracing::info!(
                start = ?start,
                end = ?end,
                max_urls = ?max_urls,
                shallow_only,
                detail_only,
                "Starting harvest command"
            );
            commands::harvest(
                config,
                commands::HarvestParams {
                    start,
                    end,
                    max_urls,
                    shallow_only,
                    detail_only,
                },
            )
            .await?;
        }

        Commands::Pending { output } => {
            tracing::info!(output = ?output, "Starting pending command");
            commands::pending(config, output)?;
        }

        Commands::Stats => {
            commands::stats(config)?;
        }

        Commands::Day { date, limit } => {
            tracing::info!(date = %date, limit, "Starting day command");
            commands::day(config, &date, limit).await?;
        }
    }

    tracing::info!("harvester completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("harvester=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("harvester={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
    }

    Ok(())
}
