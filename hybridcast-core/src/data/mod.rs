//! Price history providers

pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker, FetchOutcome};
pub use csv_import::{read_series_csv, CsvProvider};
pub use provider::{DataError, DataSource, Period, SeriesProvider};
pub use synthetic::{SyntheticProvider, SyntheticShape};
pub use yahoo::YahooProvider;
