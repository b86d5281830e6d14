//! HybridCast runner: configuration, the staged forecast pipeline, results and
//! run artifacts.

pub mod config;
pub mod export;
pub mod pipeline;
pub mod result;

pub use config::{CombineSection, ConfigError, ForecastConfig, RunSection};
pub use export::{export_forecast_csv, export_json, import_json, save_artifacts, ExportError};
pub use pipeline::{run_forecast, run_forecast_from_series, RunError, StageFailure};
pub use result::{ForecastResult, ForecastRow, SCHEMA_VERSION};
