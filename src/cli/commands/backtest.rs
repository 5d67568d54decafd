//! Backtest command implementation.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rotation_backtest::{BacktestConfig, BacktestEngine};
use rotation_config::AppConfig;
use rotation_strategy::SignalEngine;
use tracing::info;

use super::{load_pair, market_data, signal_config, start_of_day};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    let start = args
        .start
        .or(config.backtest.start)
        .unwrap_or(config.trading.history_start);
    let end = args.end.or(config.backtest.end);
    if let Some(end) = end {
        if end < start {
            anyhow::bail!("Backtest end {} is before start {}", end, start);
        }
    }

    info!(%start, end = ?end, "Starting backtest");

    // Load data
    let source = market_data(args.data.as_deref(), config)?;
    let until = end
        .map(|d| start_of_day(d) + Duration::days(1))
        .unwrap_or_else(Utc::now);
    let bars = load_pair(source.as_ref(), config, start, until).await?;

    // Evaluate signals, then drop the warm-up margin
    let engine = SignalEngine::new(signal_config(config))?;
    let evaluated: Vec<_> = engine
        .evaluate(&bars)?
        .into_iter()
        .filter(|e| e.bar.date >= start && end.map_or(true, |end| e.bar.date <= end))
        .collect();
    if evaluated.is_empty() {
        anyhow::bail!(
            "No bars with a full {}-bar average between {} and {}",
            config.strategy.slow,
            start,
            end.map(|d| d.to_string()).unwrap_or_else(|| "today".to_string())
        );
    }

    // Run backtest
    let backtest_config = BacktestConfig {
        initial_capital: args.capital.unwrap_or(config.backtest.initial_capital),
        commission_per_trade: config.backtest.commission_per_trade,
        instruments: config.instruments.pair(),
    };
    let report = BacktestEngine::new(backtest_config).run(&evaluated);

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    if let Some(path) = &args.equity_csv {
        std::fs::write(path, report.equity_to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Equity curve saved to {:?}", path);
    }
    if let Some(path) = &args.trades_csv {
        std::fs::write(path, report.trades_to_csv()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Trade log saved to {:?}", path);
    }

    Ok(())
}
