//! Core traits for the rotation system.

mod broker;
mod indicator;
mod market_data;
mod strategy;

pub use broker::Broker;
pub use indicator::Indicator;
pub use market_data::MarketData;
pub use strategy::StrategyConfig;
