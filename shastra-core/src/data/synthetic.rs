//! Synthetic price source.
//!
//! Produces a deterministic random walk from a starting price of 100.0, seeded
//! from the symbol name, so the same symbol always yields the same bars.
//! Developer-only: useful for demos and tests when no price file is at hand.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::csv_source::DEFAULT_MAX_BARS;
use super::provider::{DataError, PriceSource};
use crate::domain::timestamp::start_of_day;
use crate::domain::{Bar, PriceSeries};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    start: NaiveDate,
    bars: usize,
}

impl SyntheticSource {
    pub fn new(start: NaiveDate, bars: usize) -> Self {
        Self { start, bars }
    }

    fn generate(&self, symbol: &str) -> Vec<Bar> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut bars = Vec::with_capacity(self.bars);
        let mut price = 100.0_f64;
        let mut current = self.start;

        while bars.len() < self.bars {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            bars.push(Bar {
                date: start_of_day(current),
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            current += chrono::Duration::days(1);
        }

        bars
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            DEFAULT_MAX_BARS,
        )
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn read_price_data(&self, symbol: &str, timeframe: &str) -> Result<PriceSeries, DataError> {
        tracing::warn!(symbol, "generating synthetic price data");
        Ok(PriceSeries::new(symbol, timeframe, self.generate(symbol))?)
    }
}
