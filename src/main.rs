//! cachepack - Triton kernel cache images
//!
//! CLI entry point that dispatches to subcommands.

use cachepack::cli::{Cli, Commands, LogFormat};
use cachepack::config::ConfigManager;
use cachepack::error::CachepackResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CachepackResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("cachepack=warn"),
        1 => EnvFilter::new("cachepack=info"),
        _ => EnvFilter::new("cachepack=debug"),
    };
    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.general.log_format));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.without_time().init(),
    }

    debug!("Using config {}", config_manager.path().display());
    cachepack::ui::init_theme();

    match cli.command {
        Commands::Build(args) => cachepack::cli::commands::build(args, &config).await,
        Commands::Inspect(args) => cachepack::cli::commands::inspect(args).await,
        Commands::Labels(args) => cachepack::cli::commands::labels(args, &config).await,
        Commands::Config(args) => {
            cachepack::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
