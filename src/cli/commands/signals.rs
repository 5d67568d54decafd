//! Signal history command.

use anyhow::Result;
use chrono::Utc;
use rotation_config::AppConfig;
use rotation_monitor::{market_state, signal_table};
use rotation_strategy::SignalEngine;

use super::{load_pair, market_data, signal_config};
use crate::cli::SignalsArgs;

pub async fn run(args: SignalsArgs, config: &AppConfig) -> Result<()> {
    let source = market_data(args.data.as_deref(), config)?;
    let bars = load_pair(source.as_ref(), config, config.trading.history_start, Utc::now()).await?;

    let engine = SignalEngine::new(signal_config(config))?;
    let evaluated = engine.evaluate(&bars)?;
    let Some(latest) = evaluated.last() else {
        anyhow::bail!(
            "Need at least {} aligned bars, have {}",
            engine.warmup_period(),
            bars.len()
        );
    };

    let recent = &evaluated[evaluated.len().saturating_sub(args.last)..];
    println!("{}", signal_table(recent, engine.config()));
    println!("{}", market_state(latest, engine.config(), &config.instruments.pair()));

    Ok(())
}
