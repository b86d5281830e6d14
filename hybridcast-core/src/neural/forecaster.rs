//! Training loop and recursive multi-step inference.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::adam::Adam;
use super::model::{ModelGrads, SequenceModel};
use super::NeuralConfig;
use crate::cancel::CancelToken;
use crate::error::{ForecastError, Result};
use crate::rng::{RngHierarchy, Stream};
use crate::window::Windows;

/// Loss after one pass over the training pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    pub epoch: usize,
    /// Mean squared error over the epoch's mini-batches (dropout active).
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochLoss>,
    pub samples: usize,
    pub validation_samples: usize,
    pub parameters: usize,
}

impl TrainingReport {
    pub fn final_train_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train_loss)
    }
}

/// One freshly initialised network per run.
pub struct SequenceForecaster {
    config: NeuralConfig,
    model: SequenceModel,
    seeds: RngHierarchy,
}

impl SequenceForecaster {
    pub fn new(config: NeuralConfig, seeds: RngHierarchy) -> Result<Self> {
        config.validate()?;
        let mut init_rng = seeds.rng_for(Stream::WeightInit, 0);
        let model = SequenceModel::new(
            config.lstm_units,
            config.dense_units,
            config.dropout,
            &mut init_rng,
        );
        Ok(Self {
            config,
            model,
            seeds,
        })
    }

    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    pub fn model(&self) -> &SequenceModel {
        &self.model
    }

    /// Fit the network on `windows` with mini-batch Adam.
    ///
    /// Per-sample gradients inside a batch are computed in parallel and summed
    /// in batch order, so a given seed always yields the same weights.
    pub fn train(&mut self, windows: Windows<'_>, cancel: &CancelToken) -> Result<TrainingReport> {
        if windows.look_back() != self.config.look_back {
            return Err(ForecastError::InvalidConfig(format!(
                "windows use look-back {}, forecaster expects {}",
                windows.look_back(),
                self.config.look_back
            )));
        }

        let (train, validation) = windows.split_tail(self.config.validation_split);
        let n = train.len();
        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut order: Vec<usize> = (0..n).collect();
        let mut epochs = Vec::with_capacity(self.config.epochs);

        info!(
            samples = n,
            validation = validation.map_or(0, |v| v.len()),
            parameters = self.model.parameter_count(),
            epochs = self.config.epochs,
            "training sequence model"
        );

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut self.seeds.rng_for(Stream::Shuffle, epoch as u64));

            let mut loss_sum = 0.0;
            for batch in order.chunks(self.config.batch_size) {
                if cancel.is_cancelled() {
                    return Err(ForecastError::Cancelled);
                }

                let model = &self.model;
                let seeds = &self.seeds;
                let per_sample: Vec<(ModelGrads, f64)> = batch
                    .par_iter()
                    .map(|&idx| {
                        let (window, target) = train.get(idx);
                        let mut rng =
                            seeds.rng_for(Stream::Dropout, (epoch * n + idx) as u64);
                        let mut grads = model.zero_grads();
                        let loss = model.accumulate_sample(window, target, &mut rng, &mut grads);
                        (grads, loss)
                    })
                    .collect();

                let mut grads = self.model.zero_grads();
                for (sample_grads, loss) in &per_sample {
                    grads.add_assign(sample_grads);
                    loss_sum += loss;
                }
                grads.scale(1.0 / batch.len() as f64);
                optimizer.step(&mut self.model.params_mut(), &grads.slices());
            }

            let train_loss = loss_sum / n as f64;
            if !train_loss.is_finite() {
                return Err(ForecastError::TrainingDiverged {
                    epoch,
                    loss: train_loss,
                });
            }
            let validation_loss = validation.map(|v| self.mean_squared_error(v));
            debug!(epoch, train_loss, ?validation_loss, step = optimizer.timestep(), "epoch complete");
            epochs.push(EpochLoss {
                epoch,
                train_loss,
                validation_loss,
            });
        }

        Ok(TrainingReport {
            epochs,
            samples: n,
            validation_samples: validation.map_or(0, |v| v.len()),
            parameters: self.model.parameter_count(),
        })
    }

    /// Inference-mode MSE over a set of pairs.
    pub fn mean_squared_error(&self, windows: Windows<'_>) -> f64 {
        let errors: Vec<f64> = (0..windows.len())
            .into_par_iter()
            .map(|i| {
                let (window, target) = windows.get(i);
                (self.model.predict(window) - target).powi(2)
            })
            .collect();
        errors.iter().sum::<f64>() / windows.len() as f64
    }

    /// Roll the network forward `horizon` steps from `seed` (the last W
    /// normalized observations). Each prediction is pushed onto a W-length
    /// buffer whose oldest value is dropped.
    pub fn forecast(&self, seed: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let look_back = self.config.look_back;
        if seed.len() != look_back {
            return Err(ForecastError::InsufficientData {
                what: "forecast seed window",
                required: look_back,
                actual: seed.len(),
            });
        }

        let mut buffer: VecDeque<f64> = seed.iter().copied().collect();
        let mut predictions = Vec::with_capacity(horizon);
        for step in 0..horizon {
            let next = self.model.predict(buffer.make_contiguous());
            if !next.is_finite() {
                return Err(ForecastError::ModelInference { step, value: next });
            }
            predictions.push(next);
            buffer.pop_front();
            buffer.push_back(next);
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn small_config() -> NeuralConfig {
        NeuralConfig {
            look_back: 5,
            lstm_units: [4, 4],
            dense_units: 3,
            epochs: 3,
            batch_size: 8,
            learning_rate: 0.01,
            ..Default::default()
        }
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn untrained_forecast_is_flat_persistence() {
        let f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        let out = f.forecast(&[0.1, 0.2, 0.3, 0.4, 0.5], 30).unwrap();
        assert_eq!(out.len(), 30);
        assert!(out.iter().all(|v| *v == 0.5));
    }

    #[test]
    fn forecast_rejects_wrong_seed_length() {
        let f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        assert!(matches!(
            f.forecast(&[0.1, 0.2], 30),
            Err(ForecastError::InsufficientData { required: 5, actual: 2, .. })
        ));
    }

    #[test]
    fn non_finite_prediction_names_the_step() {
        let f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        let err = f.forecast(&[0.1, 0.2, 0.3, 0.4, f64::NAN], 30).unwrap_err();
        assert!(
            matches!(err, ForecastError::ModelInference { step: 0, value } if value.is_nan()),
            "{err:?}"
        );
    }

    #[test]
    fn training_reports_every_epoch() {
        let values = ramp(60);
        let windows = Windows::new(&values, 5).unwrap();
        let mut f = SequenceForecaster::new(small_config(), RngHierarchy::new(7, "T")).unwrap();
        let report = f.train(windows, &CancelToken::new()).unwrap();
        assert_eq!(report.epochs.len(), 3);
        assert_eq!(report.samples, 55);
        assert_eq!(report.validation_samples, 0);
        assert!(report.epochs.iter().all(|e| e.train_loss.is_finite()));
        assert!(report.epochs.iter().all(|e| e.validation_loss.is_none()));
    }

    #[test]
    fn validation_split_reports_holdout_loss() {
        let values = ramp(65);
        let windows = Windows::new(&values, 5).unwrap();
        let config = NeuralConfig {
            validation_split: 0.25,
            ..small_config()
        };
        let mut f = SequenceForecaster::new(config, RngHierarchy::new(7, "T")).unwrap();
        let report = f.train(windows, &CancelToken::new()).unwrap();
        assert_eq!(report.samples + report.validation_samples, 60);
        assert!(report.validation_samples > 0);
        assert!(report.epochs.iter().all(|e| e.validation_loss.is_some()));
    }

    #[test]
    fn same_seed_same_forecast() {
        let values = ramp(40);
        let run = || {
            let windows = Windows::new(&values, 5).unwrap();
            let mut f =
                SequenceForecaster::new(small_config(), RngHierarchy::new(99, "T")).unwrap();
            f.train(windows, &CancelToken::new()).unwrap();
            f.forecast(&values[35..], 10).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cancelled_token_stops_training() {
        let values = ramp(40);
        let windows = Windows::new(&values, 5).unwrap();
        let mut f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(f.train(windows, &cancel), Err(ForecastError::Cancelled));
    }

    #[test]
    fn expired_deadline_stops_training() {
        let values = ramp(40);
        let windows = Windows::new(&values, 5).unwrap();
        let mut f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        let cancel = CancelToken::with_timeout(Duration::ZERO);
        assert_eq!(f.train(windows, &cancel), Err(ForecastError::Cancelled));
    }

    #[test]
    fn diverging_learning_rate_is_reported() {
        let values = ramp(40);
        let windows = Windows::new(&values, 5).unwrap();
        let config = NeuralConfig {
            learning_rate: f64::MAX,
            epochs: 5,
            ..small_config()
        };
        let mut f = SequenceForecaster::new(config, RngHierarchy::new(1, "T")).unwrap();
        let result = f.train(windows, &CancelToken::new());
        assert!(matches!(
            result,
            Err(ForecastError::TrainingDiverged { .. })
        ));
    }

    #[test]
    fn mismatched_look_back_is_rejected() {
        let values = ramp(40);
        let windows = Windows::new(&values, 6).unwrap();
        let mut f = SequenceForecaster::new(small_config(), RngHierarchy::new(1, "T")).unwrap();
        assert!(matches!(
            f.train(windows, &CancelToken::new()),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
