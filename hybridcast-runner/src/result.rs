//! Result of one forecast run.

use chrono::NaiveDate;
use hybridcast_core::data::DataSource;
use hybridcast_core::domain::{Forecast, HybridForecast, Weights};
use hybridcast_core::neural::TrainingReport;
use hybridcast_core::statistical::SarimaSummary;
use serde::{Deserialize, Serialize};

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete output of a successful run. Never built from a partial pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub schema_version: u32,
    pub ticker: String,
    /// First forecast date.
    pub run_date: NaiveDate,
    pub config_hash: String,
    pub source: DataSource,
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_close: f64,
    pub future_dates: Vec<NaiveDate>,
    pub statistical: Forecast,
    pub neural: Forecast,
    pub hybrid: HybridForecast,
    pub sarima: SarimaSummary,
    pub training: TrainingReport,
    pub elapsed_secs: f64,
}

/// One forecast day across the three series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub statistical: f64,
    pub neural: f64,
    pub hybrid: f64,
}

impl ForecastResult {
    pub fn weights(&self) -> Weights {
        self.hybrid.weights()
    }

    pub fn rows(&self) -> impl Iterator<Item = ForecastRow> + '_ {
        self.future_dates
            .iter()
            .zip(self.statistical.values())
            .zip(self.neural.values())
            .zip(self.hybrid.values())
            .map(|(((&date, &statistical), &neural), &hybrid)| ForecastRow {
                date,
                statistical,
                neural,
                hybrid,
            })
    }
}
