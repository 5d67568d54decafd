//! Rotation strategy.
//!
//! - [`SignalEngine`] classifies each daily bar as bull, bear or cash from
//!   three trailing averages of the bull instrument's close.
//! - [`PositionReconciler`] turns the latest target and the broker's
//!   holdings into the orders needed to align them.

mod reconcile;
mod signal;

pub use reconcile::PositionReconciler;
pub use signal::{EvaluatedBar, SignalConfig, SignalEngine};
