//! Column-oriented OHLCV table.
//!
//! This is the shape price data takes when it crosses the capability
//! boundary: parallel arrays keyed by column name. `date` and `close` are
//! required; the remaining columns are carried when present.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Parallel OHLCV columns, index-aligned on `date`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OhlcvColumns {
    #[serde(with = "timestamp::seq")]
    pub date: Vec<NaiveDateTime>,
    #[serde(
        default,
        deserialize_with = "missing::optional_seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub open: Option<Vec<f64>>,
    #[serde(
        default,
        deserialize_with = "missing::optional_seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub high: Option<Vec<f64>>,
    #[serde(
        default,
        deserialize_with = "missing::optional_seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub low: Option<Vec<f64>>,
    #[serde(deserialize_with = "missing::seq")]
    pub close: Vec<f64>,
    #[serde(
        default,
        deserialize_with = "missing::optional_seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume: Option<Vec<f64>>,
}

impl OhlcvColumns {
    /// Build a table from the two required columns only.
    pub fn from_closes(date: Vec<NaiveDateTime>, close: Vec<f64>) -> Self {
        Self {
            date,
            close,
            ..Self::default()
        }
    }

    /// Number of rows, as given by the `date` column.
    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// Check that every present column has as many values as `date`.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let expected = self.date.len();
        let check = |column: &'static str, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(SchemaError::LengthMismatch {
                    column,
                    expected,
                    actual,
                })
            }
        };

        check("close", self.close.len())?;
        for (column, values) in [
            ("open", &self.open),
            ("high", &self.high),
            ("low", &self.low),
            ("volume", &self.volume),
        ] {
            if let Some(values) = values {
                check(column, values.len())?;
            }
        }
        Ok(())
    }

    /// Index of the first date that does not strictly follow its predecessor.
    pub fn first_unordered_date(&self) -> Option<usize> {
        self.date
            .windows(2)
            .position(|w| w[1] <= w[0])
            .map(|i| i + 1)
    }
}

/// Missing values serialize as JSON `null` and read back as NaN.
mod missing {
    use serde::{Deserialize, Deserializer};

    fn fill(values: Vec<Option<f64>>) -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }

    pub fn seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Option<f64>>::deserialize(deserializer).map(fill)
    }

    pub fn optional_seq<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        Ok(Option::<Vec<Option<f64>>>::deserialize(deserializer)?.map(fill))
    }
}
