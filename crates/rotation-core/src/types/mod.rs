//! Core data types for the rotation system.

mod clock;
mod instrument;
mod ohlcv;
mod order;
mod position;
mod signal;

pub use clock::MarketClock;
pub use instrument::InstrumentPair;
pub use ohlcv::{Bar, PriceBar};
pub use order::{Order, OrderRequest, OrderStatus, Side, TimeInForce};
pub use position::{Account, Holding, Position};
pub use signal::{Allocation, MovingAverages, Signal};
