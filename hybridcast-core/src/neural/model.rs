//! Stacked-LSTM regression network.
//!
//! ```text
//! window ─► LSTM(u1, all steps) ─► Dropout ─► LSTM(u2, last step) ─► Dropout
//!        ─► Dense(k) ─► Dense(1) ─► + window[W-1]
//! ```
//! The head is zero-initialised and added to the last window value, so a
//! freshly built network predicts persistence and training learns the delta.

use rand::Rng;

use super::dense::{Dense, DenseGrads};
use super::lstm::{LstmGrads, LstmLayer, LstmTrace};

#[derive(Debug, Clone)]
pub struct SequenceModel {
    lstm1: LstmLayer,
    lstm2: LstmLayer,
    dense: Dense,
    head: Dense,
    dropout: f64,
}

/// Gradients for every parameter of a [`SequenceModel`].
#[derive(Debug, Clone)]
pub struct ModelGrads {
    lstm1: LstmGrads,
    lstm2: LstmGrads,
    dense: DenseGrads,
    head: DenseGrads,
}

impl ModelGrads {
    pub fn add_assign(&mut self, other: &ModelGrads) {
        self.lstm1.add_assign(&other.lstm1);
        self.lstm2.add_assign(&other.lstm2);
        self.dense.add_assign(&other.dense);
        self.head.add_assign(&other.head);
    }

    pub fn scale(&mut self, factor: f64) {
        self.lstm1.scale(factor);
        self.lstm2.scale(factor);
        self.dense.scale(factor);
        self.head.scale(factor);
    }

    /// Slices in the same order as [`SequenceModel::params_mut`].
    pub fn slices(&self) -> [&[f64]; 8] {
        [
            &self.lstm1.weights,
            &self.lstm1.bias,
            &self.lstm2.weights,
            &self.lstm2.bias,
            &self.dense.weights,
            &self.dense.bias,
            &self.head.weights,
            &self.head.bias,
        ]
    }
}

/// Inverted-dropout mask: each unit kept with probability `1 - p` and scaled by
/// `1 / (1 - p)`.
fn dropout_mask(len: usize, p: f64, rng: &mut impl Rng) -> Vec<f64> {
    let keep = 1.0 - p;
    (0..len)
        .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
        .collect()
}

fn apply_mask(values: &[f64], mask: &[f64]) -> Vec<f64> {
    values.iter().zip(mask).map(|(v, m)| v * m).collect()
}

impl SequenceModel {
    pub fn new(
        lstm_units: [usize; 2],
        dense_units: usize,
        dropout: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let lstm1 = LstmLayer::new(1, lstm_units[0], rng);
        let lstm2 = LstmLayer::new(lstm_units[0], lstm_units[1], rng);
        let dense = Dense::new(lstm_units[1], dense_units, rng);
        let head = Dense::zeros(dense_units, 1);
        Self {
            lstm1,
            lstm2,
            dense,
            head,
            dropout,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.zero_grads().slices().iter().map(|s| s.len()).sum()
    }

    pub fn zero_grads(&self) -> ModelGrads {
        ModelGrads {
            lstm1: self.lstm1.zero_grads(),
            lstm2: self.lstm2.zero_grads(),
            dense: self.dense.zero_grads(),
            head: self.head.zero_grads(),
        }
    }

    pub fn params_mut(&mut self) -> [&mut [f64]; 8] {
        let [w1, b1] = self.lstm1.params_mut();
        let [w2, b2] = self.lstm2.params_mut();
        let [w3, b3] = self.dense.params_mut();
        let [w4, b4] = self.head.params_mut();
        [w1, b1, w2, b2, w3, b3, w4, b4]
    }

    /// Inference-mode prediction (no dropout) of the value following `window`.
    pub fn predict(&self, window: &[f64]) -> f64 {
        let steps = window.len();
        let trace1 = self.lstm1.forward(window, steps);
        let trace2 = self.lstm2.forward(trace1.outputs(), steps);
        let features = self.dense.forward(trace2.last_output(self.lstm2.hidden_size()));
        self.head.forward(&features)[0] + window[steps - 1]
    }

    /// Training-mode forward and backward pass for one sample.
    ///
    /// Adds `d(loss)/d(params)` for the squared error `(ŷ - target)²` into
    /// `grads` and returns that loss.
    pub fn accumulate_sample(
        &self,
        window: &[f64],
        target: f64,
        rng: &mut impl Rng,
        grads: &mut ModelGrads,
    ) -> f64 {
        let steps = window.len();
        let u1 = self.lstm1.hidden_size();
        let u2 = self.lstm2.hidden_size();

        let trace1 = self.lstm1.forward(window, steps);
        let mask1 = dropout_mask(steps * u1, self.dropout, rng);
        let dropped1 = apply_mask(trace1.outputs(), &mask1);

        let trace2: LstmTrace = self.lstm2.forward(&dropped1, steps);
        let mask2 = dropout_mask(u2, self.dropout, rng);
        let dropped2 = apply_mask(trace2.last_output(u2), &mask2);

        let features = self.dense.forward(&dropped2);
        let prediction = self.head.forward(&features)[0] + window[steps - 1];
        let error = prediction - target;

        let d_features = self.head.backward(&features, &[2.0 * error], &mut grads.head);
        let d_dropped2 = self.dense.backward(&dropped2, &d_features, &mut grads.dense);

        let mut d_out2 = vec![0.0; steps * u2];
        for (slot, (d, m)) in d_out2[(steps - 1) * u2..]
            .iter_mut()
            .zip(d_dropped2.iter().zip(&mask2))
        {
            *slot = d * m;
        }
        let d_dropped1 = self.lstm2.backward(&trace2, &d_out2, &mut grads.lstm2);
        let d_out1 = apply_mask(&d_dropped1, &mask1);
        self.lstm1.backward(&trace1, &d_out1, &mut grads.lstm1);

        error * error
    }
}
