//! Spread indicators: moving-average crossover and price crossover.
//!
//! Both express one series relative to another as `a / b - 1`, so the output
//! is scale-independent: positive means `a` sits above `b`, negative below,
//! and a sign change marks a crossover. Points where either side is still
//! warming up carry no value.
//!
//! Both operations are pure. Results are cut to the most recent
//! [`SPREAD_HISTORY_LEN`] points.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::{Indicator, IndicatorError, IndicatorKind, IndicatorResult, Sma};
use crate::domain::OhlcvColumns;

/// Trading days in a month.
pub const TRADING_DAYS_PER_MONTH: usize = 22;

/// Points kept in a spread result: three months of daily bars.
pub const SPREAD_HISTORY_LEN: usize = TRADING_DAYS_PER_MONTH * 3;

/// One indicator computation with its window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "indicator", rename_all = "snake_case")]
pub enum IndicatorRequest {
    MaCrossover { fast_ma: usize, slow_ma: usize },
    PriceCrossover { ma: usize },
}

impl IndicatorRequest {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorRequest::MaCrossover { .. } => IndicatorKind::MaSpreadPct,
            IndicatorRequest::PriceCrossover { .. } => IndicatorKind::PriceSpreadPct,
        }
    }

    pub fn compute(&self, data: &OhlcvColumns) -> Result<IndicatorResult, IndicatorError> {
        match *self {
            IndicatorRequest::MaCrossover { fast_ma, slow_ma } => ma_crossover(data, fast_ma, slow_ma),
            IndicatorRequest::PriceCrossover { ma } => price_crossover(data, ma),
        }
    }
}

/// Percent deviation of the fast SMA from the slow SMA: `fast / slow - 1`.
///
/// `fast_ma >= slow_ma` is allowed; the spread then carries the opposite sign.
pub fn ma_crossover(
    data: &OhlcvColumns,
    fast_ma: usize,
    slow_ma: usize,
) -> Result<IndicatorResult, IndicatorError> {
    let fast = window("fast_ma", fast_ma)?;
    let slow = window("slow_ma", slow_ma)?;
    check_input(data)?;

    let fast_values = Sma::new(fast).compute(&data.close);
    let slow_values = Sma::new(slow).compute(&data.close);
    let spread = relative_spread(&fast_values, &slow_values);

    Ok(IndicatorResult::tail(
        IndicatorKind::MaSpreadPct,
        &data.date,
        spread,
        SPREAD_HISTORY_LEN,
    ))
}

/// Percent deviation of the close from its SMA: `close / ma - 1`.
pub fn price_crossover(data: &OhlcvColumns, ma: usize) -> Result<IndicatorResult, IndicatorError> {
    let period = window("ma", ma)?;
    check_input(data)?;

    let ma_values = Sma::new(period).compute(&data.close);
    let spread = relative_spread(&data.close, &ma_values);

    Ok(IndicatorResult::tail(
        IndicatorKind::PriceSpreadPct,
        &data.date,
        spread,
        SPREAD_HISTORY_LEN,
    ))
}

fn window(name: &'static str, value: usize) -> Result<NonZeroUsize, IndicatorError> {
    NonZeroUsize::new(value).ok_or(IndicatorError::NonPositiveWindow { name })
}

fn check_input(data: &OhlcvColumns) -> Result<(), IndicatorError> {
    if data.is_empty() {
        return Err(IndicatorError::EmptySeries);
    }
    data.validate()?;
    if let Some(index) = data.first_unordered_date() {
        return Err(IndicatorError::UnorderedDates { index });
    }
    Ok(())
}

/// `a / b - 1` elementwise; NaN inputs and non-finite results carry no value.
fn relative_spread(a: &[f64], b: &[f64]) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(&a, &b)| {
            let spread = a / b - 1.0;
            spread.is_finite().then_some(spread)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp::parse_timestamp;
    use crate::indicators::assert_approx;

    fn columns(closes: &[f64]) -> OhlcvColumns {
        let base = parse_timestamp("2024-01-02").unwrap();
        let dates = (0..closes.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        OhlcvColumns::from_closes(dates, closes.to_vec())
    }

    #[test]
    fn price_crossover_five_bars_window_three() {
        let result = price_crossover(&columns(&[10.0, 11.0, 12.0, 11.0, 10.0]), 3).unwrap();

        assert_eq!(result.kind, IndicatorKind::PriceSpreadPct);
        assert_eq!(result.len(), 5);
        assert!(result.values[0].is_none());
        assert!(result.values[1].is_none());
        assert_approx(result.values[2].unwrap(), 12.0 / 11.0 - 1.0, 1e-9);
        assert_approx(result.values[3].unwrap(), 11.0 / (34.0 / 3.0) - 1.0, 1e-9);
        assert_approx(result.values[4].unwrap(), 10.0 / 11.0 - 1.0, 1e-9);
        assert_approx(result.values[2].unwrap(), 0.0909, 1e-4);
        assert_approx(result.values[3].unwrap(), -0.0294, 1e-4);
        assert_approx(result.values[4].unwrap(), -0.0909, 1e-4);
    }

    #[test]
    fn ma_crossover_defined_from_slow_window() {
        let result = ma_crossover(&columns(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 2, 4).unwrap();

        assert_eq!(result.kind, IndicatorKind::MaSpreadPct);
        assert!(result.values[..3].iter().all(Option::is_none));
        assert!(result.values[3..].iter().all(Option::is_some));
        // fast[3] = 3.5, slow[3] = 2.5
        assert_approx(result.values[3].unwrap(), 3.5 / 2.5 - 1.0, 1e-9);
        // fast[5] = 5.5, slow[5] = 4.5
        assert_approx(result.values[5].unwrap(), 5.5 / 4.5 - 1.0, 1e-9);
    }

    #[test]
    fn fast_slower_than_slow_flips_sign() {
        let data = columns(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let normal = ma_crossover(&data, 2, 4).unwrap();
        let swapped = ma_crossover(&data, 4, 2).unwrap();
        for (a, b) in normal.values.iter().zip(&swapped.values) {
            match (a, b) {
                (Some(a), Some(b)) => assert!(a.signum() == -b.signum()),
                (None, None) => {}
                other => panic!("definedness differs: {other:?}"),
            }
        }
    }

    #[test]
    fn empty_series_is_invalid_input() {
        let empty = OhlcvColumns::default();
        assert_eq!(price_crossover(&empty, 3), Err(IndicatorError::EmptySeries));
        assert_eq!(ma_crossover(&empty, 2, 4), Err(IndicatorError::EmptySeries));
    }

    #[test]
    fn zero_window_is_invalid_input() {
        let data = columns(&[1.0, 2.0]);
        assert_eq!(
            price_crossover(&data, 0),
            Err(IndicatorError::NonPositiveWindow { name: "ma" })
        );
        assert_eq!(
            ma_crossover(&data, 2, 0),
            Err(IndicatorError::NonPositiveWindow { name: "slow_ma" })
        );
    }

    #[test]
    fn window_longer_than_series_yields_no_values() {
        let data = columns(&[1.0, 2.0, 3.0]);
        let result = price_crossover(&data, 10).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.defined_count(), 0);

        let result = ma_crossover(&data, 2, 10).unwrap();
        assert_eq!(result.defined_count(), 0);
    }

    #[test]
    fn window_equal_to_length_defines_only_last_point() {
        let data = columns(&[1.0, 2.0, 3.0, 4.0]);
        let result = price_crossover(&data, 4).unwrap();
        assert_eq!(result.defined_count(), 1);
        assert!(result.values[3].is_some());
    }

    #[test]
    fn output_truncated_to_history_len() {
        let closes: Vec<f64> = (0..132).map(|i| 100.0 + i as f64).collect();
        let data = columns(&closes);
        let result = price_crossover(&data, 5).unwrap();
        assert_eq!(result.len(), SPREAD_HISTORY_LEN);
        assert_eq!(result.dates.first(), data.date.get(132 - SPREAD_HISTORY_LEN));
        assert_eq!(result.dates.last(), data.date.last());
    }

    #[test]
    fn unordered_dates_are_invalid_input() {
        let mut data = columns(&[1.0, 2.0, 3.0]);
        data.date.swap(1, 2);
        assert_eq!(
            price_crossover(&data, 2),
            Err(IndicatorError::UnorderedDates { index: 2 })
        );
    }

    #[test]
    fn mismatched_columns_are_invalid_input() {
        let mut data = columns(&[1.0, 2.0, 3.0]);
        data.close.pop();
        assert!(matches!(price_crossover(&data, 2), Err(IndicatorError::Schema(_))));
    }

    #[test]
    fn zero_average_carries_no_value() {
        let result = price_crossover(&columns(&[0.0, 0.0, 1.0]), 2).unwrap();
        assert!(result.values[1].is_none());
        assert!(result.values[2].is_some());
    }

    #[test]
    fn flat_market_spreads_to_exact_zero() {
        let data = columns(&[0.1, 0.1, 0.1, 0.1]);
        let price = price_crossover(&data, 3).unwrap();
        assert_eq!(price.values, vec![None, None, Some(0.0), Some(0.0)]);

        let ma = ma_crossover(&data, 2, 3).unwrap();
        assert_eq!(ma.values, vec![None, None, Some(0.0), Some(0.0)]);
        assert!(ma.crossovers().is_empty());
    }

    #[test]
    fn clean_windows_after_infinite_close_are_defined() {
        let data = columns(&[1.0, f64::INFINITY, 1.0, 1.0, 1.0, 1.0]);
        let result = price_crossover(&data, 2).unwrap();
        assert!(result.values[..3].iter().all(Option::is_none));
        assert_eq!(&result.values[3..], &[Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn request_dispatches_to_operation() {
        let data = columns(&[10.0, 11.0, 12.0, 11.0, 10.0]);
        let req = IndicatorRequest::PriceCrossover { ma: 3 };
        assert_eq!(req.compute(&data), price_crossover(&data, 3));
        assert_eq!(req.kind(), IndicatorKind::PriceSpreadPct);

        let req = IndicatorRequest::MaCrossover { fast_ma: 2, slow_ma: 3 };
        assert_eq!(req.compute(&data), ma_crossover(&data, 2, 3));
    }

    #[test]
    fn request_deserializes_from_tagged_toml_shape() {
        let req: IndicatorRequest =
            serde_json::from_str(r#"{"indicator": "ma_crossover", "fast_ma": 5, "slow_ma": 20}"#)
                .unwrap();
        assert_eq!(req, IndicatorRequest::MaCrossover { fast_ma: 5, slow_ma: 20 });
    }
}
