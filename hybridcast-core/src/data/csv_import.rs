//! CSV import provider.
//!
//! Reads `<dir>/<TICKER>.csv` with a header row containing `date` and `close`
//! columns (Yahoo's `Date`/`Close` export headers are accepted too; extra
//! columns are ignored). A missing file means "no data" for the ticker.
//!
//! The period is applied relative to the last row in the file, not to today,
//! so archived exports stay usable.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{DataError, DataSource, Period, SeriesProvider};
use crate::domain::{PricePoint, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: NaiveDate,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
}

/// Read a whole series from a CSV file.
pub fn read_series_csv(path: &Path, ticker: &str) -> Result<PriceSeries, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Io {
            path: display.clone(),
            reason: e.to_string(),
        })?;

    let mut points = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::Parse {
            path: display.clone(),
            reason: format!("row {}: {e}", line + 1),
        })?;
        points.push(PricePoint::new(row.date, row.close));
    }

    Ok(PriceSeries::new(ticker, points)?)
}

/// Provider backed by a directory of per-ticker CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path probed for a ticker: exact spelling first, then upper-case.
    fn path_for(&self, ticker: &str) -> Option<PathBuf> {
        [ticker.to_string(), ticker.to_ascii_uppercase()]
            .into_iter()
            .map(|name| self.dir.join(format!("{name}.csv")))
            .find(|p| p.is_file())
    }
}

impl SeriesProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries, DataError> {
        let Some(path) = self.path_for(ticker) else {
            return Ok(PriceSeries::empty(ticker));
        };
        let series = read_series_csv(&path, ticker)?;
        Ok(match series.last_date() {
            Some(last) => series.since(period.start_before(last)),
            None => series,
        })
    }
}
