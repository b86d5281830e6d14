//! TOML run configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Values are checked by [`ForecastConfig::validate`] before a
//! run starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hybridcast_core::data::Period;
use hybridcast_core::domain::Weights;
use hybridcast_core::neural::NeuralConfig;
use hybridcast_core::statistical::SarimaConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config hash error: {0}")]
    Hash(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[run]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// History window requested from the provider.
    pub period: Period,
    /// Master seed for weight init, shuffling and dropout.
    pub seed: u64,
    /// Training deadline in seconds; 0 disables it.
    pub timeout_secs: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            period: Period::default(),
            seed: 42,
            timeout_secs: 0,
        }
    }
}

/// `[combine]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineSection {
    pub weight_statistical: f64,
    pub weight_neural: f64,
}

impl Default for CombineSection {
    fn default() -> Self {
        let weights = Weights::default();
        Self {
            weight_statistical: weights.statistical,
            weight_neural: weights.neural,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub run: RunSection,
    pub neural: NeuralConfig,
    pub statistical: SarimaConfig,
    pub combine: CombineSection,
}

impl ForecastConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: hybridcast_core::ForecastError| ConfigError::Invalid(e.to_string());
        self.neural.validate().map_err(invalid)?;
        self.statistical.validate().map_err(invalid)?;
        self.weights().map_err(invalid)?;
        Ok(())
    }

    pub fn weights(&self) -> hybridcast_core::error::Result<Weights> {
        Weights::new(self.combine.weight_statistical, self.combine.weight_neural)
    }

    /// Training deadline, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.run.timeout_secs > 0).then(|| Duration::from_secs(self.run.timeout_secs))
    }

    /// BLAKE3 hash of the canonical JSON form; identical configs hash equal.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
