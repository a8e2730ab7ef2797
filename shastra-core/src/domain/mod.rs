//! Domain types for shastra

pub mod bar;
pub mod columns;
pub mod series;
pub mod timestamp;

pub use bar::Bar;
pub use columns::{OhlcvColumns, SchemaError};
pub use series::{PriceSeries, SeriesError};

/// Create synthetic daily bars from close prices for testing.
///
/// open = previous close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = timestamp::start_of_day(chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}
