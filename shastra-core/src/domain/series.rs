//! PriceSeries: the ordered bar history loaded for one run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Bar, OhlcvColumns};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("bar {index} is dated {date}, which does not follow the previous bar")]
    NotAscending { index: usize, date: NaiveDateTime },
}

/// Ordered OHLCV history for one symbol and timeframe.
///
/// Dates are strictly increasing. The series is immutable once built; the
/// only way in is [`PriceSeries::new`], which enforces the ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    timeframe: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        if let Some(index) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::NotAscending {
                index: index + 1,
                date: bars[index + 1].date,
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn dates(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Column-oriented copy of the full series, all five value columns present.
    pub fn to_columns(&self) -> OhlcvColumns {
        OhlcvColumns {
            date: self.dates(),
            open: Some(self.bars.iter().map(|b| b.open).collect()),
            high: Some(self.bars.iter().map(|b| b.high).collect()),
            low: Some(self.bars.iter().map(|b| b.low).collect()),
            close: self.closes(),
            volume: Some(self.bars.iter().map(|b| b.volume).collect()),
        }
    }

    /// Deterministic BLAKE3 hash over the symbol, timeframe and every bar.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        hasher.update(self.timeframe.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::make_bars;

    #[test]
    fn accepts_ascending_bars() {
        let series = PriceSeries::new("INFY", "1d", make_bars(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_bar().map(|b| b.close), Some(3.0));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].date = bars[1].date;
        let err = PriceSeries::new("INFY", "1d", bars).unwrap_err();
        assert!(matches!(err, SeriesError::NotAscending { index: 2, .. }));
    }

    #[test]
    fn empty_series_is_valid() {
        let series = PriceSeries::new("INFY", "1d", Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.to_columns().is_empty());
    }

    #[test]
    fn columns_mirror_bars() {
        let series = PriceSeries::new("INFY", "1d", make_bars(&[10.0, 11.0])).unwrap();
        let cols = series.to_columns();
        assert!(cols.validate().is_ok());
        assert_eq!(cols.close, vec![10.0, 11.0]);
        assert_eq!(cols.date, series.dates());
        assert_eq!(cols.volume.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn content_hash_is_deterministic_and_sensitive() {
        let a = PriceSeries::new("INFY", "1d", make_bars(&[10.0, 11.0])).unwrap();
        let b = PriceSeries::new("INFY", "1d", make_bars(&[10.0, 11.0])).unwrap();
        let c = PriceSeries::new("INFY", "1d", make_bars(&[10.0, 11.5])).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
