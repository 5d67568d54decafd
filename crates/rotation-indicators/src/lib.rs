//! Technical indicators.
//!
//! Only the simple moving average is needed by the rotation signal; it is
//! computed in a single pass with a sliding window sum.

pub mod moving_average;

pub use moving_average::Sma;
