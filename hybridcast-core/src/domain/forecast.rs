//! Forecast value types.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Number of future days every forecast covers.
pub const HORIZON: usize = 30;

/// Ordered per-day point forecast in original price units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forecast {
    values: Vec<f64>,
}

impl Forecast {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for Forecast {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Convex combination weights for (statistical, neural).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub statistical: f64,
    pub neural: f64,
}

impl Weights {
    const SUM_TOLERANCE: f64 = 1e-9;

    /// Validated weights: finite, non-negative, summing to 1.
    pub fn new(statistical: f64, neural: f64) -> Result<Self> {
        let w = Self {
            statistical,
            neural,
        };
        w.validate()?;
        Ok(w)
    }

    /// Weights from the statistical share alone; the neural share is its complement.
    pub fn from_statistical(statistical: f64) -> Result<Self> {
        Self::new(statistical, 1.0 - statistical)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.statistical.is_finite() || !self.neural.is_finite() {
            return Err(ForecastError::InvalidConfig(
                "combination weights must be finite".into(),
            ));
        }
        if self.statistical < 0.0 || self.neural < 0.0 {
            return Err(ForecastError::InvalidConfig(format!(
                "combination weights must be non-negative (statistical={}, neural={})",
                self.statistical, self.neural
            )));
        }
        let sum = self.statistical + self.neural;
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ForecastError::InvalidConfig(format!(
                "combination weights must sum to 1 (got {sum})"
            )));
        }
        Ok(())
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            statistical: 0.4,
            neural: 0.6,
        }
    }
}

/// Elementwise convex blend of a statistical and a neural forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridForecast {
    values: Vec<f64>,
    weights: Weights,
}

impl HybridForecast {
    pub(crate) fn new(values: Vec<f64>, weights: Weights) -> Self {
        Self { values, weights }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `count` consecutive calendar days beginning at `start` (inclusive).
pub fn future_dates(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| start + Duration::days(i as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_forty_sixty() {
        let w = Weights::default();
        assert_eq!(w.statistical, 0.4);
        assert_eq!(w.neural, 0.6);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(Weights::new(0.5, 0.6).is_err());
        assert!(Weights::new(-0.1, 1.1).is_err());
        assert!(Weights::new(f64::NAN, 0.5).is_err());
        assert!(Weights::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn from_statistical_complements() {
        let w = Weights::from_statistical(0.25).unwrap();
        assert!((w.neural - 0.75).abs() < 1e-12);
        assert!(Weights::from_statistical(1.5).is_err());
    }

    #[test]
    fn future_dates_are_consecutive_calendar_days() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let dates = future_dates(start, HORIZON);
        assert_eq!(dates.len(), 30);
        assert_eq!(dates[0], start);
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(dates[29], start + Duration::days(29));
    }
}
