//! Convex blending of the statistical and neural forecasts.

use crate::domain::{Forecast, HybridForecast, Weights, HORIZON};
use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct Combiner {
    weights: Weights,
}

impl Combiner {
    pub fn new(weights: Weights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// `out[i] = w_s · statistical[i] + w_n · neural[i]`.
    ///
    /// Both inputs must hold exactly [`HORIZON`] values.
    pub fn combine(&self, statistical: &Forecast, neural: &Forecast) -> Result<HybridForecast> {
        if statistical.len() != HORIZON || neural.len() != HORIZON {
            return Err(ForecastError::ForecastLength {
                expected: HORIZON,
                statistical: statistical.len(),
                neural: neural.len(),
            });
        }
        let Weights {
            statistical: ws,
            neural: wn,
        } = self.weights;
        let values = statistical
            .values()
            .iter()
            .zip(neural.values())
            .map(|(s, n)| ws * s + wn * n)
            .collect();
        Ok(HybridForecast::new(values, self.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64, len: usize) -> Forecast {
        Forecast::from(vec![value; len])
    }

    #[test]
    fn default_weighting() {
        let stat: Forecast = (0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>().into();
        let neural: Forecast = (0..30).map(|i| 90.0 - i as f64).collect::<Vec<_>>().into();
        let hybrid = Combiner::default().combine(&stat, &neural).unwrap();
        assert_eq!(hybrid.len(), 30);
        for i in 0..30 {
            let expected = 0.4 * stat.values()[i] + 0.6 * neural.values()[i];
            assert_eq!(hybrid.values()[i], expected);
        }
        assert_eq!(hybrid.weights(), Weights::default());
    }

    #[test]
    fn custom_weights() {
        let combiner = Combiner::new(Weights::new(1.0, 0.0).unwrap()).unwrap();
        let hybrid = combiner
            .combine(&constant(5.0, 30), &constant(7.0, 30))
            .unwrap();
        assert!(hybrid.values().iter().all(|v| *v == 5.0));
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let combiner = Combiner::default();
        for (s, n) in [(29, 30), (30, 31), (0, 0), (31, 31)] {
            let err = combiner
                .combine(&constant(1.0, s), &constant(1.0, n))
                .unwrap_err();
            assert_eq!(
                err,
                ForecastError::ForecastLength {
                    expected: 30,
                    statistical: s,
                    neural: n,
                }
            );
        }
    }
}
