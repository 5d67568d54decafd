//! Live trading session.
//!
//! A session runs once per invocation, typically scheduled a few minutes
//! before the close: check the market clock, compute today's signal from
//! daily history, then align brokerage holdings with it.

mod gate;
mod session;

pub use gate::{ClockGate, SkipReason};
pub use session::{
    CapitalSource, OrderResult, SessionConfig, SessionOutcome, SessionReport, TradingSession,
};
