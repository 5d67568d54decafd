//! Broker integrations.

mod alpaca;
mod paper;

pub use alpaca::{AlpacaBroker, AlpacaConfig, DATA_URL, LIVE_URL, PAPER_URL};
pub use paper::PaperBroker;
