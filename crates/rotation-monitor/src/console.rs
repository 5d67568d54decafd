//! Console rendering of the signal state.

use rotation_core::types::InstrumentPair;
use rotation_strategy::{EvaluatedBar, SignalConfig};

const RULE: &str = "═══════════════════════════════════════════════════════════\n";

/// Banner with today's price, averages and signal.
pub fn market_state(
    bar: &EvaluatedBar,
    config: &SignalConfig,
    instruments: &InstrumentPair,
) -> String {
    let mut s = String::new();
    let label = |name: String| format!("{:<11}", name);

    s.push_str(RULE);
    s.push_str(&format!("                 MARKET STATE  {}\n", bar.bar.date));
    s.push_str(RULE);
    s.push_str(&format!(
        "  {}: {:.2}\n",
        label(format!("{} Price", instruments.bull)),
        bar.price()
    ));
    for (period, value) in [
        (config.fast, bar.averages.fast),
        (config.medium, bar.averages.medium),
        (config.slow, bar.averages.slow),
    ] {
        s.push_str(&format!("  {}: {:.2}\n", label(format!("MA{}", period)), value));
    }
    s.push_str(RULE);

    let held = instruments
        .symbol_for(bar.signal.allocation)
        .map(|sym| format!(" ({})", sym))
        .unwrap_or_default();
    s.push_str(&format!("  Signal: {}{}\n", bar.signal.allocation, held));
    s.push_str(&format!("  Reason: {}\n", bar.signal.reason_or_empty()));

    s
}

/// Fixed-width table of evaluated bars, oldest first.
pub fn signal_table(bars: &[EvaluatedBar], config: &SignalConfig) -> String {
    let mut s = format!(
        "{:<10}  {:>9}  {:>9}  {:>9}  {:>9}  {:<6}  {}\n",
        "date",
        "close",
        format!("MA{}", config.fast),
        format!("MA{}", config.medium),
        format!("MA{}", config.slow),
        "signal",
        "reason"
    );

    for bar in bars {
        s.push_str(&format!(
            "{:<10}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9.2}  {:<6}  {}\n",
            bar.bar.date,
            bar.price(),
            bar.averages.fast,
            bar.averages.medium,
            bar.averages.slow,
            bar.signal.allocation.to_string(),
            bar.signal.reason_or_empty()
        ));
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rotation_core::types::{Allocation, MovingAverages, PriceBar, Signal};

    fn evaluated() -> EvaluatedBar {
        EvaluatedBar {
            bar: PriceBar::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), 60.0, 64.25, 9.0, 8.5),
            averages: MovingAverages::new(62.0, 61.0, 60.5),
            signal: Signal::new(Allocation::Bull, "Price 64.25 > MA19 60.50"),
        }
    }

    #[test]
    fn test_market_state() {
        let out = market_state(&evaluated(), &SignalConfig::default(), &InstrumentPair::default());

        assert!(out.contains("2024-06-03"));
        assert!(out.contains("TQQQ Price : 64.25"));
        assert!(out.contains("MA14       : 61.00"));
        assert!(out.contains("Signal: BULL (TQQQ)"));
        assert!(out.contains("Reason: Price 64.25 > MA19 60.50"));
    }

    #[test]
    fn test_cash_fallthrough_has_empty_reason() {
        let mut bar = evaluated();
        bar.signal = Signal::fallthrough();
        let out = market_state(&bar, &SignalConfig::default(), &InstrumentPair::default());

        assert!(out.contains("Signal: CASH\n"));
        assert!(out.contains("Reason: \n"));
    }

    #[test]
    fn test_signal_table() {
        let out = signal_table(&[evaluated(), evaluated()], &SignalConfig::default());
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("MA9") && lines[0].contains("MA19"));
        assert!(lines[1].starts_with("2024-06-03"));
        assert!(lines[1].contains("64.25"));
        assert!(lines[1].contains("BULL"));
    }
}
