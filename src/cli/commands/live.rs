//! Live trading command implementation.

use anyhow::Result;
use chrono::Utc;
use rotation_config::AppConfig;
use rotation_monitor::market_state;
use rotation_trader::{CapitalSource, SessionConfig, SessionOutcome, TradingSession};
use tracing::warn;

use super::{alpaca, signal_config};
use crate::cli::LiveArgs;

pub async fn run(args: LiveArgs, config: &AppConfig) -> Result<()> {
    let broker = alpaca(config)?;
    if !broker.config().is_paper() {
        warn!("Trading against a LIVE account");
    }

    let trading = &config.trading;
    let session_config = SessionConfig {
        instruments: config.instruments.pair(),
        signal: signal_config(config),
        history_start: trading.history_start,
        capital: if trading.use_buying_power {
            CapitalSource::BuyingPower
        } else {
            CapitalSource::Fixed(trading.capital)
        },
        entry_window_minutes: trading.entry_window_minutes,
        fractional_shares: trading.fractional_shares,
        time_in_force: trading.time_in_force,
        dry_run: args.dry_run,
        ignore_clock: args.ignore_clock,
    };

    let session = TradingSession::new(session_config, &broker, &broker)?;
    let report = session.run(Utc::now()).await?;

    if let Some(decision) = &report.decision {
        let settings = session.config();
        println!("{}", market_state(decision, &settings.signal, &settings.instruments));
    }

    match &report.outcome {
        SessionOutcome::Skipped(reason) => println!("Skipped: {}", reason),
        SessionOutcome::DryRun => println!("Dry run, no orders placed"),
        SessionOutcome::Aligned => println!("Holdings already match the signal"),
        SessionOutcome::BrokerUnavailable(e) => {
            anyhow::bail!("Broker unavailable, no orders placed: {}", e)
        }
        SessionOutcome::Ordered => {
            for result in &report.orders {
                match (&result.order, &result.error) {
                    (Some(order), _) => {
                        println!("  {}  id={} status={:?}", result.request, order.id, order.status)
                    }
                    (None, Some(e)) => println!("  {}  FAILED: {}", result.request, e),
                    (None, None) => println!("  {}", result.request),
                }
            }
            let failed = report.failed_orders();
            if failed > 0 {
                anyhow::bail!("{} of {} orders failed", failed, report.orders.len());
            }
        }
    }

    Ok(())
}
