//! CSV price source.
//!
//! Reads a multi-symbol OHLCV file with one row per bar. Headers are matched
//! case-insensitively; `date`, `symbol` and `close` are required. When a
//! `timeframe` column exists, rows are also filtered on it. The result is the
//! last `max_bars` bars dated on or after `min_date`, oldest first.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info};

use super::provider::{DataError, PriceSource};
use crate::domain::timestamp::{parse_timestamp, start_of_day};
use crate::domain::{Bar, PriceSeries};
use crate::indicators::TRADING_DAYS_PER_MONTH;

/// Bars kept per load: six months of daily history.
pub const DEFAULT_MAX_BARS: usize = TRADING_DAYS_PER_MONTH * 6;

/// Earliest bar date considered by default.
pub fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2006, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
    min_date: NaiveDate,
    max_bars: usize,
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    symbol: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
    timeframe: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, DataError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        let require = |name: &'static str| find(name).ok_or(DataError::MissingColumn { column: name });

        Ok(Self {
            date: require("date")?,
            symbol: require("symbol")?,
            close: require("close")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            volume: find("volume"),
            timeframe: find("timeframe"),
        })
    }
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            min_date: default_min_date(),
            max_bars: DEFAULT_MAX_BARS,
        }
    }

    pub fn with_min_date(mut self, min_date: NaiveDate) -> Self {
        self.min_date = min_date;
        self
    }

    pub fn with_max_bars(mut self, max_bars: usize) -> Self {
        self.max_bars = max_bars;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unreadable(&self, source: csv::Error) -> DataError {
        DataError::Unreadable {
            path: self.path.clone(),
            source,
        }
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn read_price_data(&self, symbol: &str, timeframe: &str) -> Result<PriceSeries, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.unreadable(e))?;

        let columns = Columns::resolve(reader.headers().map_err(|e| self.unreadable(e))?)?;
        let cutoff = start_of_day(self.min_date);

        let mut symbol_seen = false;
        let mut rows_scanned = 0usize;
        let mut bars = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|e| self.unreadable(e))?;
            rows_scanned += 1;

            if record.get(columns.symbol) != Some(symbol) {
                continue;
            }
            if let Some(idx) = columns.timeframe {
                let row_timeframe = record.get(idx).unwrap_or_default();
                if !row_timeframe.eq_ignore_ascii_case(timeframe) {
                    continue;
                }
            }
            symbol_seen = true;

            let bar = parse_bar(&record, &columns)?;
            if bar.date >= cutoff {
                bars.push(bar);
            }
        }

        debug!(
            path = %self.path.display(),
            rows_scanned,
            matched = bars.len(),
            "scanned price file"
        );

        if !symbol_seen {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if bars.is_empty() {
            return Err(DataError::NoBarsInRange {
                symbol: symbol.to_string(),
                min_date: self.min_date,
            });
        }

        bars.sort_by(|a, b| a.date.cmp(&b.date));
        let start = bars.len().saturating_sub(self.max_bars);
        let bars = bars.split_off(start);

        let series = PriceSeries::new(symbol, timeframe, bars)?;
        info!(
            symbol,
            timeframe,
            bars = series.len(),
            "loaded price data"
        );
        Ok(series)
    }
}

fn parse_bar(record: &StringRecord, columns: &Columns) -> Result<Bar, DataError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let malformed = |reason: String| DataError::Malformed { line, reason };

    let raw_date = record.get(columns.date).unwrap_or_default();
    let date = parse_timestamp(raw_date).ok_or_else(|| malformed(format!("invalid date '{raw_date}'")))?;

    let number = |idx: usize, name: &str| -> Result<f64, DataError> {
        let raw = record.get(idx).unwrap_or_default();
        if raw.is_empty() {
            return Ok(f64::NAN);
        }
        raw.parse::<f64>()
            .map_err(|_| malformed(format!("invalid {name} '{raw}'")))
    };

    let close = number(columns.close, "close")?;
    let optional = |idx: Option<usize>, name: &str, fallback: f64| -> Result<f64, DataError> {
        idx.map_or(Ok(fallback), |i| number(i, name))
    };

    Ok(Bar {
        date,
        open: optional(columns.open, "open", close)?,
        high: optional(columns.high, "high", close)?,
        low: optional(columns.low, "low", close)?,
        close,
        volume: optional(columns.volume, "volume", 0.0)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const SAMPLE: &str = "\
Date,Symbol,Open,High,Low,Close,Volume
2024-01-03,INFY,11,12,10,11.5,200
2024-01-02,INFY,10,11,9,10.5,100
2005-12-30,INFY,9,10,8,9.5,50
2024-01-02,TCS,30,31,29,30.5,300
2024-01-04,INFY,12,13,11,12.5,300
";

    #[test]
    fn loads_filters_and_sorts() {
        let file = write_csv(SAMPLE);
        let series = CsvPriceSource::new(file.path())
            .read_price_data("INFY", "1d")
            .unwrap();

        assert_eq!(series.symbol(), "INFY");
        assert_eq!(series.timeframe(), "1d");
        assert_eq!(series.closes(), vec![10.5, 11.5, 12.5]);
        assert_eq!(series.bars()[0].volume, 100.0);
    }

    #[test]
    fn keeps_only_most_recent_bars() {
        let file = write_csv(SAMPLE);
        let series = CsvPriceSource::new(file.path())
            .with_max_bars(2)
            .read_price_data("INFY", "1d")
            .unwrap();
        assert_eq!(series.closes(), vec![11.5, 12.5]);
    }

    #[test]
    fn min_date_is_inclusive() {
        let file = write_csv(SAMPLE);
        let series = CsvPriceSource::new(file.path())
            .with_min_date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .read_price_data("INFY", "1d")
            .unwrap();
        assert_eq!(series.closes(), vec![11.5, 12.5]);
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let file = write_csv(SAMPLE);
        let err = CsvPriceSource::new(file.path())
            .read_price_data("NOPE", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "NOPE"));
    }

    #[test]
    fn symbol_with_only_old_bars_has_none_in_range() {
        let file = write_csv("Date,Symbol,Close\n2001-05-01,OLD,1.0\n");
        let err = CsvPriceSource::new(file.path())
            .read_price_data("OLD", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::NoBarsInRange { .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = CsvPriceSource::new("/definitely/not/here.csv")
            .read_price_data("INFY", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::Unreadable { .. }));
    }

    #[test]
    fn missing_close_column_is_reported() {
        let file = write_csv("Date,Symbol,Open\n2024-01-02,INFY,1.0\n");
        let err = CsvPriceSource::new(file.path())
            .read_price_data("INFY", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { column: "close" }));
    }

    #[test]
    fn close_only_file_fills_ohlc_from_close() {
        let file = write_csv("date,symbol,close\n2024-01-02,INFY,10.0\n");
        let series = CsvPriceSource::new(file.path())
            .read_price_data("INFY", "1d")
            .unwrap();
        let bar = &series.bars()[0];
        assert_eq!((bar.open, bar.high, bar.low, bar.volume), (10.0, 10.0, 10.0, 0.0));
    }

    #[test]
    fn timeframe_column_filters_rows() {
        let file = write_csv(
            "Date,Symbol,Timeframe,Close\n\
             2024-01-02,INFY,1d,10.0\n\
             2024-01-02 09:15:00,INFY,1h,10.1\n\
             2024-01-02 10:15:00,INFY,1h,10.2\n",
        );
        let source = CsvPriceSource::new(file.path());
        assert_eq!(source.read_price_data("INFY", "1h").unwrap().len(), 2);
        assert_eq!(source.read_price_data("INFY", "1D").unwrap().len(), 1);
        assert!(matches!(
            source.read_price_data("INFY", "5m"),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let file = write_csv("Date,Symbol,Close\n2024-01-02,INFY,1.0\n2024-01-02,INFY,2.0\n");
        let err = CsvPriceSource::new(file.path())
            .read_price_data("INFY", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidSeries(_)));
    }

    #[test]
    fn bad_number_reports_line() {
        let file = write_csv("Date,Symbol,Close\n2024-01-02,INFY,1.0\n2024-01-03,INFY,abc\n");
        let err = CsvPriceSource::new(file.path())
            .read_price_data("INFY", "1d")
            .unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 3, .. }), "{err}");
    }
}
