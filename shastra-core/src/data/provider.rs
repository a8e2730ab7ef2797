//! Price source trait and structured error types.
//!
//! The PriceSource trait abstracts over where bars come from (CSV file,
//! synthetic generator, in-memory fixtures) so the pipeline can swap
//! implementations and tests can mock them.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{PriceSeries, SeriesError};

/// Structured error types for data operations. Every variant means the
/// requested data is unavailable; none of them is retried.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars for '{symbol}' on or after {min_date}")]
    NoBarsInRange { symbol: String, min_date: NaiveDate },

    #[error("no bars loaded for '{symbol}' ({timeframe})")]
    EmptySeries { symbol: String, timeframe: String },

    #[error("cannot read price data from {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("price data is missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("malformed row at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

/// Trait for price data sources.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load the recent bar history for a symbol and timeframe.
    fn read_price_data(&self, symbol: &str, timeframe: &str) -> Result<PriceSeries, DataError>;
}
