//! Min-max normalizer.
//!
//! Fit once per run on the observed closes; the fitted `(min, max)` are then
//! used unchanged to invert model output back to price units.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Fitted affine map `x -> (x - min) / (max - min)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit on `values` and return the scaler together with the scaled series.
    ///
    /// Fails with `EmptyData` on empty input and `DegenerateRange` when every
    /// value is identical (the range would be zero).
    pub fn fit_transform(values: &[f64]) -> Result<(Self, Vec<f64>)> {
        let scaler = Self::fit(values)?;
        let scaled = scaler.transform(values);
        Ok((scaler, scaled))
    }

    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidConfig(format!(
                "cannot normalize non-finite value {bad}"
            )));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max - min <= 0.0 {
            return Err(ForecastError::DegenerateRange { value: min });
        }
        Ok(Self { min, max })
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        let range = self.range();
        values.iter().map(|x| (x - self.min) / range).collect()
    }

    pub fn inverse(&self, values: &[f64]) -> Vec<f64> {
        let range = self.range();
        values.iter().map(|x| x * range + self.min).collect()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_to_unit_interval() {
        let (scaler, scaled) = MinMaxScaler::fit_transform(&[10.0, 15.0, 20.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.5, 1.0]);
        assert_eq!(scaler.min(), 10.0);
        assert_eq!(scaler.max(), 20.0);
    }

    #[test]
    fn constant_series_is_degenerate() {
        let err = MinMaxScaler::fit_transform(&[100.0; 1260]).unwrap_err();
        assert_eq!(err, ForecastError::DegenerateRange { value: 100.0 });
    }

    #[test]
    fn empty_series_is_empty_data() {
        assert_eq!(
            MinMaxScaler::fit(&[]).unwrap_err(),
            ForecastError::EmptyData
        );
    }

    #[test]
    fn rejects_nan() {
        assert!(MinMaxScaler::fit(&[1.0, f64::NAN, 2.0]).is_err());
    }

    #[test]
    fn inverse_uses_fitted_parameters_for_out_of_range_values() {
        let scaler = MinMaxScaler::fit(&[100.0, 200.0]).unwrap();
        // Forecasts may leave [0, 1]; they map back linearly, no refit.
        assert_eq!(scaler.inverse(&[1.5, -0.25]), vec![250.0, 75.0]);
    }

    #[test]
    fn round_trip_reconstructs_input() {
        let input = [101.3, 99.7, 150.25, 120.0, 99.7];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&input).unwrap();
        for (a, b) in scaler.inverse(&scaled).iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
