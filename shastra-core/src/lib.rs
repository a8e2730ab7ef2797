//! Shastra Core — domain types, spread indicators, price data sources.
//!
//! This crate holds everything that does not depend on a decision maker:
//! - Domain types (bars, price series, column-oriented OHLCV tables)
//! - The indicator engine (SMA, moving-average crossover, price crossover)
//! - Price sources (CSV file, synthetic random walk, in-memory)

pub mod data;
pub mod domain;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::OhlcvColumns>();
        require_sync::<domain::OhlcvColumns>();

        require_send::<indicators::IndicatorResult>();
        require_sync::<indicators::IndicatorResult>();
        require_send::<indicators::IndicatorRequest>();
        require_sync::<indicators::IndicatorRequest>();
        require_send::<indicators::IndicatorError>();
        require_sync::<indicators::IndicatorError>();

        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::CsvPriceSource>();
        require_sync::<data::CsvPriceSource>();
    }

    /// Architecture contract: indicators see closes only, never a source.
    #[test]
    fn indicator_trait_takes_plain_closes() {
        fn _check_trait_object_builds(ind: &dyn indicators::Indicator, closes: &[f64]) -> Vec<f64> {
            ind.compute(closes)
        }
    }
}
