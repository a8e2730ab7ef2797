//! In-memory price source, keyed by symbol.

use std::collections::HashMap;

use super::provider::{DataError, PriceSource};
use crate::domain::{Bar, PriceSeries};

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    bars: HashMap<String, Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }
}

impl PriceSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_price_data(&self, symbol: &str, timeframe: &str) -> Result<PriceSeries, DataError> {
        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Ok(PriceSeries::new(symbol, timeframe, bars.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::make_bars;

    #[test]
    fn returns_stored_bars() {
        let source = InMemorySource::new().with_bars("INFY", make_bars(&[1.0, 2.0]));
        let series = source.read_price_data("INFY", "1d").unwrap();
        assert_eq!(series.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let source = InMemorySource::new();
        assert!(matches!(
            source.read_price_data("INFY", "1d"),
            Err(DataError::SymbolNotFound { .. })
        ));
    }
}
