//! Forecasting error taxonomy and pipeline stages.
//!
//! Every failure inside the forecasting core is a [`ForecastError`]. The runner
//! attaches the ticker and the [`Stage`] that failed before surfacing it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage at which a run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Normalize,
    Window,
    StatisticalFit,
    NeuralTraining,
    NeuralInference,
    Combine,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Window => "window construction",
            Stage::StatisticalFit => "statistical fit",
            Stage::NeuralTraining => "neural training",
            Stage::NeuralInference => "neural inference",
            Stage::Combine => "combine",
        };
        f.write_str(name)
    }
}

/// Errors raised by the forecasting core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("no price history available")]
    EmptyData,

    #[error("price series is constant at {value}; min-max range is degenerate")]
    DegenerateRange { value: f64 },

    #[error("insufficient data for {what}: need at least {required} observations, got {actual}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("optimizer did not converge after {iterations} iterations: {reason}")]
    Convergence { iterations: usize, reason: String },

    #[error("non-finite prediction at forecast step {step}: {value}")]
    ModelInference { step: usize, value: f64 },

    #[error("training diverged at epoch {epoch} (loss = {loss})")]
    TrainingDiverged { epoch: usize, loss: f64 },

    #[error("forecast length mismatch: expected {expected}, got statistical={statistical}, neural={neural}")]
    ForecastLength {
        expected: usize,
        statistical: usize,
        neural: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cancelled")]
    Cancelled,
}

impl ForecastError {
    /// Short machine-friendly kind label (used in logs and artifacts).
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::EmptyData => "empty_data",
            ForecastError::DegenerateRange { .. } => "degenerate_range",
            ForecastError::InsufficientData { .. } => "insufficient_data",
            ForecastError::Convergence { .. } => "convergence",
            ForecastError::ModelInference { .. } => "model_inference",
            ForecastError::TrainingDiverged { .. } => "training_diverged",
            ForecastError::ForecastLength { .. } => "forecast_length",
            ForecastError::InvalidConfig(_) => "invalid_config",
            ForecastError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
