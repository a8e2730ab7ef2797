//! Indicator output: a date-aligned spread series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::timestamp::{self, format_timestamp};

/// Which spread a result holds. The key doubles as the payload field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Fast SMA relative to slow SMA.
    MaSpreadPct,
    /// Close relative to its SMA.
    PriceSpreadPct,
}

impl IndicatorKind {
    pub fn key(&self) -> &'static str {
        match self {
            IndicatorKind::MaSpreadPct => "ma_spread_pct",
            IndicatorKind::PriceSpreadPct => "price_spread_pct",
        }
    }
}

/// Direction of a zero-crossing in a spread series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    /// Spread moved from <= 0 to > 0.
    Bullish,
    /// Spread moved from >= 0 to < 0.
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossover {
    #[serde(with = "timestamp::single")]
    pub date: NaiveDateTime,
    pub direction: CrossDirection,
}

/// Spread values index-aligned to dates. `None` marks "no value": the
/// window had not filled yet at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub kind: IndicatorKind,
    #[serde(with = "timestamp::seq")]
    pub dates: Vec<NaiveDateTime>,
    pub values: Vec<Option<f64>>,
}

impl IndicatorResult {
    /// Keep the last `keep` points of a full-length spread series.
    pub(crate) fn tail(
        kind: IndicatorKind,
        dates: &[NaiveDateTime],
        values: Vec<Option<f64>>,
        keep: usize,
    ) -> Self {
        let start = dates.len().saturating_sub(keep);
        Self {
            kind,
            dates: dates[start..].to_vec(),
            values: values[start..].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of points carrying a value.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// The most recent defined point.
    pub fn latest(&self) -> Option<(NaiveDateTime, f64)> {
        self.dates
            .iter()
            .zip(&self.values)
            .rev()
            .find_map(|(d, v)| v.map(|v| (*d, v)))
    }

    /// Sign changes between consecutive defined points, oldest first.
    pub fn crossovers(&self) -> Vec<Crossover> {
        let mut events = Vec::new();
        for i in 1..self.values.len() {
            let (Some(prev), Some(cur)) = (self.values[i - 1], self.values[i]) else {
                continue;
            };
            let direction = if cur > 0.0 && prev <= 0.0 {
                CrossDirection::Bullish
            } else if cur < 0.0 && prev >= 0.0 {
                CrossDirection::Bearish
            } else {
                continue;
            };
            events.push(Crossover {
                date: self.dates[i],
                direction,
            });
        }
        events
    }

    /// Render as the capability payload:
    /// `{"<key>": {"date": [...], "<key>": [...]}}`.
    pub fn to_payload(&self) -> Value {
        let key = self.kind.key();
        let dates: Vec<String> = self.dates.iter().map(format_timestamp).collect();

        let mut records = Map::new();
        records.insert("date".into(), json!(dates));
        records.insert(key.into(), json!(self.values));

        let mut payload = Map::new();
        payload.insert(key.into(), Value::Object(records));
        Value::Object(payload)
    }
}
