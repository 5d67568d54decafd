//! Logging and console output.

mod console;
mod logging;

pub use console::{market_state, signal_table};
pub use logging::{setup_logging, LogGuard};
