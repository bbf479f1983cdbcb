//! reviewkb CLI - build and search a knowledge base of code review comments

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use reviewkb_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CollectArgs, QueryArgs};

/// reviewkb: turn merged pull request reviews into searchable knowledge
#[derive(Parser, Debug)]
#[command(name = "reviewkb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ~/.config/reviewkb/config.toml)
    #[arg(long, env = "REVIEWKB_CONFIG")]
    config: Option<PathBuf>,

    /// Analysis driver tried first (overrides config and env)
    #[arg(long)]
    driver: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect review comments from merged pull requests
    #[command(visible_alias = "c")]
    Collect(CollectArgs),

    /// Search stored knowledge documents
    #[command(visible_alias = "q")]
    Query(QueryArgs),

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let db_override = match &cli.command {
        Some(Commands::Query(args)) => args.db.clone(),
        _ => None,
    };

    let config = Config::load_with_overrides(cli.config.as_deref(), db_override, cli.driver.clone())
        .context("Failed to load configuration")?;

    tracing::debug!(
        primary = %config.analysis.primary,
        parallel = config.analysis.parallel,
        gh = %config.github.gh_path,
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Collect(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Query(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Config) => {
            commands::config::print(&config, cli.config.as_deref())?;
        }
        Some(Commands::Version) => {
            println!("reviewkb {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("reviewkb - knowledge base of code review comments");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
