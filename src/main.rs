//! Rotation trading CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rotation_config::load_config;
use rotation_monitor::setup_logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()));

    // Setup logging; CLI flags win over the configuration
    let logging = loaded.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    let log_level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or(logging.level);
    let json = cli.json_logs || logging.format == "json";
    let _guard = setup_logging(&log_level, json, logging.file.as_deref().map(Path::new))?;

    // Execute command
    match cli.command {
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, loaded).await,
        Commands::Live(args) => cli::commands::live::run(args, &loaded?).await,
        Commands::Signals(args) => cli::commands::signals::run(args, &loaded?).await,
        Commands::Backtest(args) => cli::commands::backtest::run(args, &loaded?).await,
    }
}
