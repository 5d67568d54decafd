//! Triple moving average signal.
//!
//! Each bar with a full slow window is classified by a priority cascade over
//! the bull close and its fast / medium / slow averages:
//!
//! 1. close above the slow average: hold the bull instrument
//! 2. close below the medium average: go to cash
//! 3. close below the fast average: hold the bear instrument
//! 4. otherwise: cash, with no reason attached
//!
//! A second pass cancels a bear call on the bar where the fast average has
//! just crossed above the medium one.

use rotation_core::{
    error::StrategyError,
    traits::StrategyConfig,
    types::{Allocation, MovingAverages, PriceBar, Signal},
};
use rotation_indicators::Sma;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window lengths of the three averages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Fast moving average period
    pub fast: usize,
    /// Medium moving average period
    pub medium: usize,
    /// Slow moving average period
    pub slow: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            fast: 9,
            medium: 14,
            slow: 19,
        }
    }
}

impl StrategyConfig for SignalConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast >= self.medium || self.medium >= self.slow {
            return Err(StrategyError::InvalidConfig(format!(
                "Periods must be strictly increasing, got {}/{}/{}",
                self.fast, self.medium, self.slow
            )));
        }
        Ok(())
    }
}

/// A bar together with its averages and signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedBar {
    pub bar: PriceBar,
    pub averages: MovingAverages,
    pub signal: Signal,
}

impl EvaluatedBar {
    /// The price the signal was computed from (bull close).
    pub fn price(&self) -> f64 {
        self.bar.bull_close
    }
}

/// Computes the per-bar rotation signal. Stateless: the same bars always
/// produce the same signals.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    /// Create an engine after validating the windows.
    pub fn new(config: SignalConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Bars needed before the first signal.
    pub fn warmup_period(&self) -> usize {
        self.config.slow
    }

    /// Primary classification of one bar. Strict inequalities only, first
    /// match wins.
    pub fn classify(&self, price: f64, averages: &MovingAverages) -> Signal {
        if price > averages.slow {
            Signal::new(
                Allocation::Bull,
                format!("Price {:.2} > MA{} {:.2}", price, self.config.slow, averages.slow),
            )
        } else if price < averages.medium {
            Signal::new(
                Allocation::Cash,
                format!("Price {:.2} < MA{} {:.2}", price, self.config.medium, averages.medium),
            )
        } else if price < averages.fast {
            Signal::new(
                Allocation::Bear,
                format!("Price {:.2} < MA{} {:.2}", price, self.config.fast, averages.fast),
            )
        } else {
            Signal::fallthrough()
        }
    }

    /// Crossover override: a bear call on the bar where fast crosses above
    /// medium becomes cash. Needs the previous usable bar's averages.
    pub fn apply_crossover(
        &self,
        primary: Signal,
        current: &MovingAverages,
        previous: Option<&MovingAverages>,
    ) -> Signal {
        let Some(previous) = previous else {
            return primary;
        };

        let crossed_up = current.fast_above_medium() && !previous.fast_above_medium();
        if crossed_up && primary.allocation == Allocation::Bear {
            return Signal::new(
                Allocation::Cash,
                format!(
                    "MA{} {:.2} crossed above MA{} {:.2}, exiting bear",
                    self.config.fast, current.fast, self.config.medium, current.medium
                ),
            );
        }

        primary
    }

    /// Evaluate every bar that has a full slow window.
    ///
    /// Bars without enough history are dropped, not reported as errors.
    /// Non-finite or non-positive prices and out-of-order dates are rejected.
    pub fn evaluate(&self, bars: &[PriceBar]) -> Result<Vec<EvaluatedBar>, StrategyError> {
        validate_input(bars)?;

        let closes: Vec<f64> = bars.iter().map(|b| b.bull_close).collect();
        let fast = self.averages(self.config.fast, &closes)?;
        let medium = self.averages(self.config.medium, &closes)?;
        let slow = self.averages(self.config.slow, &closes)?;

        let mut evaluated = Vec::with_capacity(bars.len().saturating_sub(self.config.slow - 1));
        let mut previous: Option<MovingAverages> = None;

        for (i, bar) in bars.iter().enumerate() {
            let (Some(f), Some(m), Some(s)) = (fast[i], medium[i], slow[i]) else {
                continue;
            };

            let averages = MovingAverages::new(f, m, s);
            let primary = self.classify(bar.bull_close, &averages);
            let signal = self.apply_crossover(primary, &averages, previous.as_ref());

            evaluated.push(EvaluatedBar {
                bar: *bar,
                averages,
                signal,
            });
            previous = Some(averages);
        }

        debug!(
            bars = bars.len(),
            usable = evaluated.len(),
            "Evaluated rotation signals"
        );

        Ok(evaluated)
    }

    /// The most recent evaluated bar.
    pub fn latest(&self, bars: &[PriceBar]) -> Result<EvaluatedBar, StrategyError> {
        self.evaluate(bars)?
            .pop()
            .ok_or(StrategyError::InsufficientData {
                required: self.warmup_period(),
                available: bars.len(),
            })
    }

    fn averages(&self, period: usize, closes: &[f64]) -> Result<Vec<Option<f64>>, StrategyError> {
        let sma = Sma::try_new(period).map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        Ok(sma.calculate_aligned(closes))
    }
}

fn validate_input(bars: &[PriceBar]) -> Result<(), StrategyError> {
    for (i, bar) in bars.iter().enumerate() {
        for (column, value) in bar.prices() {
            if !value.is_finite() || value <= 0.0 {
                return Err(StrategyError::MalformedInput {
                    date: bar.date.to_string(),
                    reason: format!("{} is {}", column, value),
                });
            }
        }

        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(StrategyError::MalformedInput {
                date: bar.date.to_string(),
                reason: format!("date does not follow {}", bars[i - 1].date),
            });
        }
    }
    Ok(())
}
