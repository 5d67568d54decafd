//! Core types and traits for the rotation trading system.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, PriceBar)
//! - Signals, holdings and order types
//! - Core traits for brokers, market data sources and indicators

pub mod types;
pub mod traits;
pub mod error;

pub use error::TradingError;
pub use types::*;
pub use traits::*;
