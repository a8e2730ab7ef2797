//! Price data sources

pub mod csv_source;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use csv_source::{default_min_date, CsvPriceSource, DEFAULT_MAX_BARS};
pub use memory::InMemorySource;
pub use provider::{DataError, PriceSource};
pub use synthetic::SyntheticSource;
