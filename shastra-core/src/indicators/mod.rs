//! Indicator engine.
//!
//! Indicators are pure functions: close history in, numeric series out, one
//! value per input point. The spread operations in [`spread`] are the two
//! capabilities exposed to the decision maker; [`Sma`] is their building
//! block.

pub mod result;
pub mod sma;
pub mod spread;

use thiserror::Error;

use crate::domain::SchemaError;

pub use result::{CrossDirection, Crossover, IndicatorKind, IndicatorResult};
pub use sma::Sma;
pub use spread::{
    ma_crossover, price_crossover, IndicatorRequest, SPREAD_HISTORY_LEN, TRADING_DAYS_PER_MONTH,
};

/// Trait for single-series indicators over closes.
///
/// `compute` returns a `Vec<f64>` of the same length as its input, with the
/// first `lookback()` values `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No value at index t may depend on closes after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of points needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}

/// Input rejected at the indicator boundary.
///
/// Insufficient history is not an error: it shows up as `None` values in an
/// otherwise successful result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("invalid input: price series is empty")]
    EmptySeries,

    #[error("invalid input: window '{name}' must be greater than zero")]
    NonPositiveWindow { name: &'static str },

    #[error("invalid input: dates must be strictly increasing (violated at index {index})")]
    UnorderedDates { index: usize },

    #[error("invalid input: {0}")]
    Schema(#[from] SchemaError),
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
