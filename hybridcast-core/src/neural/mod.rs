//! Recurrent sequence forecaster.
//!
//! A two-layer LSTM network trained on normalized look-back windows and rolled
//! forward recursively for multi-step forecasts.

pub mod adam;
pub mod dense;
pub mod forecaster;
mod init;
pub mod lstm;
pub mod model;

pub use adam::Adam;
pub use forecaster::{EpochLoss, SequenceForecaster, TrainingReport};
pub use model::SequenceModel;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Network shape and training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Look-back window length W.
    pub look_back: usize,
    /// Hidden units of the two stacked LSTM layers.
    pub lstm_units: [usize; 2],
    pub dense_units: usize,
    /// Dropout rate applied after each LSTM layer during training.
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Trailing fraction of training pairs held out for validation loss.
    pub validation_split: f64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            look_back: 60,
            lstm_units: [50, 50],
            dense_units: 25,
            dropout: 0.2,
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.001,
            validation_split: 0.0,
        }
    }
}

impl NeuralConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidConfig(msg));
        if self.look_back == 0 {
            return invalid("neural.look_back must be at least 1".into());
        }
        if self.lstm_units.contains(&0) || self.dense_units == 0 {
            return invalid("neural layer sizes must be non-zero".into());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("neural.dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.epochs == 0 {
            return invalid("neural.epochs must be at least 1".into());
        }
        if self.batch_size == 0 {
            return invalid("neural.batch_size must be at least 1".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!(
                "neural.learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return invalid(format!(
                "neural.validation_split must be in [0, 1), got {}",
                self.validation_split
            ));
        }
        Ok(())
    }
}
