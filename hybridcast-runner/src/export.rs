//! Run artifacts: `result.json` and `forecast.csv`.
//!
//! Artifacts for one run land in `<output-dir>/<TICKER>_<run-date>/`. The JSON
//! carries `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::result::{ForecastResult, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &ForecastResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn import_json(json: &str) -> Result<ForecastResult, ExportError> {
    let result: ForecastResult = serde_json::from_str(json)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: date, statistical, neural, hybrid.
pub fn export_forecast_csv(result: &ForecastResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "statistical", "neural", "hybrid"])?;
    for row in result.rows() {
        wtr.write_record([
            row.date.to_string(),
            format!("{:.6}", row.statistical),
            format!("{:.6}", row.neural),
            format!("{:.6}", row.hybrid),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ─── Files ──────────────────────────────────────────────────────────

/// `<output_dir>/<TICKER>_<run-date>`
pub fn artifact_dir(output_dir: &Path, result: &ForecastResult) -> PathBuf {
    output_dir.join(format!("{}_{}", result.ticker, result.run_date))
}

/// Write both artifacts, creating the run directory if needed.
pub fn save_artifacts(result: &ForecastResult, output_dir: &Path) -> Result<PathBuf, ExportError> {
    let dir = artifact_dir(output_dir, result);
    std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;

    let write = |name: &str, contents: String| {
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(|source| ExportError::Io { path, source })
    };
    write("result.json", export_json(result)?)?;
    write("forecast.csv", export_forecast_csv(result)?)?;
    Ok(dir)
}
