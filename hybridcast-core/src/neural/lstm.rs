//! Long short-term memory layer with backpropagation through time.
//!
//! The forward pass computes, per step `t` with `z_t = [x_t, h_{t-1}]`:
//! ```text
//! i = σ(W_i z + b_i)    f = σ(W_f z + b_f)
//! g = tanh(W_g z + b_g) o = σ(W_o z + b_o)
//! c_t = f ⊙ c_{t-1} + i ⊙ g
//! h_t = o ⊙ tanh(c_t)
//! ```
//! Sequences are flat row-major buffers: `steps × width`.

use rand::Rng;

use super::init::glorot_uniform;

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Weights of one LSTM layer.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    input_size: usize,
    hidden_size: usize,
    /// Gate weights, `[4·hidden, input + hidden]` row-major, gate blocks i, f, g, o.
    weights: Vec<f64>,
    /// Gate biases, `4·hidden`.
    bias: Vec<f64>,
}

/// Gradient accumulator shaped like an [`LstmLayer`].
#[derive(Debug, Clone)]
pub struct LstmGrads {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl LstmGrads {
    pub fn add_assign(&mut self, other: &LstmGrads) {
        for (a, b) in self.weights.iter_mut().zip(&other.weights) {
            *a += b;
        }
        for (a, b) in self.bias.iter_mut().zip(&other.bias) {
            *a += b;
        }
    }

    pub fn scale(&mut self, factor: f64) {
        self.weights.iter_mut().for_each(|w| *w *= factor);
        self.bias.iter_mut().for_each(|b| *b *= factor);
    }
}

/// Activations kept from a forward pass for the backward pass.
#[derive(Debug, Clone)]
pub struct LstmTrace {
    steps: usize,
    /// `[x_t, h_{t-1}]` per step.
    z: Vec<f64>,
    /// Activated gates per step.
    gates: Vec<f64>,
    /// Cell state per step.
    cells: Vec<f64>,
    /// Hidden state per step (the layer output).
    outputs: Vec<f64>,
}

impl LstmTrace {
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// Hidden state after the final step.
    pub fn last_output(&self, hidden_size: usize) -> &[f64] {
        &self.outputs[(self.steps - 1) * hidden_size..]
    }
}

impl LstmLayer {
    /// Glorot-uniform gate weights, zero biases except the forget gate at 1.0.
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut impl Rng) -> Self {
        let zdim = input_size + hidden_size;
        let rows = 4 * hidden_size;
        let input_limit = glorot_uniform(input_size, rows);
        let recurrent_limit = glorot_uniform(hidden_size, rows);

        let mut weights = Vec::with_capacity(rows * zdim);
        for _ in 0..rows {
            for k in 0..zdim {
                let limit = if k < input_size {
                    input_limit
                } else {
                    recurrent_limit
                };
                weights.push(rng.gen_range(-limit..=limit));
            }
        }

        let mut bias = vec![0.0; rows];
        bias[hidden_size..2 * hidden_size].fill(1.0);

        Self {
            input_size,
            hidden_size,
            weights,
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn zero_grads(&self) -> LstmGrads {
        LstmGrads {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    pub fn params_mut(&mut self) -> [&mut [f64]; 2] {
        [&mut self.weights, &mut self.bias]
    }

    /// Run the layer over `steps` inputs laid out as `steps × input_size`.
    pub fn forward(&self, inputs: &[f64], steps: usize) -> LstmTrace {
        let (n_in, h) = (self.input_size, self.hidden_size);
        let zdim = n_in + h;
        debug_assert_eq!(inputs.len(), steps * n_in);

        let mut z = vec![0.0; steps * zdim];
        let mut gates = vec![0.0; steps * 4 * h];
        let mut cells = vec![0.0; steps * h];
        let mut outputs = vec![0.0; steps * h];
        let mut h_prev = vec![0.0; h];
        let mut c_prev = vec![0.0; h];

        for t in 0..steps {
            let zt = &mut z[t * zdim..(t + 1) * zdim];
            zt[..n_in].copy_from_slice(&inputs[t * n_in..(t + 1) * n_in]);
            zt[n_in..].copy_from_slice(&h_prev);
            let zt = &z[t * zdim..(t + 1) * zdim];

            let gt = &mut gates[t * 4 * h..(t + 1) * 4 * h];
            for (r, gate) in gt.iter_mut().enumerate() {
                let pre = self.bias[r] + dot(&self.weights[r * zdim..(r + 1) * zdim], zt);
                *gate = if r / h == 2 { pre.tanh() } else { sigmoid(pre) };
            }

            for j in 0..h {
                let (i, f, g, o) = (gt[j], gt[h + j], gt[2 * h + j], gt[3 * h + j]);
                let c = f * c_prev[j] + i * g;
                let hv = o * c.tanh();
                cells[t * h + j] = c;
                outputs[t * h + j] = hv;
                c_prev[j] = c;
                h_prev[j] = hv;
            }
        }

        LstmTrace {
            steps,
            z,
            gates,
            cells,
            outputs,
        }
    }

    /// Backpropagate `d_outputs` (`steps × hidden`) through the trace.
    ///
    /// Accumulates parameter gradients into `grads` and returns the gradient
    /// with respect to the inputs (`steps × input_size`).
    pub fn backward(&self, trace: &LstmTrace, d_outputs: &[f64], grads: &mut LstmGrads) -> Vec<f64> {
        let (n_in, h) = (self.input_size, self.hidden_size);
        let zdim = n_in + h;
        let steps = trace.steps;
        debug_assert_eq!(d_outputs.len(), steps * h);

        let zeros = vec![0.0; h];
        let mut dh_next = vec![0.0; h];
        let mut dc_next = vec![0.0; h];
        let mut dpre = vec![0.0; 4 * h];
        let mut dz = vec![0.0; zdim];
        let mut d_inputs = vec![0.0; steps * n_in];

        for t in (0..steps).rev() {
            let gt = &trace.gates[t * 4 * h..(t + 1) * 4 * h];
            let ct = &trace.cells[t * h..(t + 1) * h];
            let c_prev = if t > 0 {
                &trace.cells[(t - 1) * h..t * h]
            } else {
                &zeros[..]
            };

            for j in 0..h {
                let (i, f, g, o) = (gt[j], gt[h + j], gt[2 * h + j], gt[3 * h + j]);
                let tc = ct[j].tanh();
                let dh = d_outputs[t * h + j] + dh_next[j];
                let dc = dh * o * (1.0 - tc * tc) + dc_next[j];
                dpre[j] = dc * g * i * (1.0 - i);
                dpre[h + j] = dc * c_prev[j] * f * (1.0 - f);
                dpre[2 * h + j] = dc * i * (1.0 - g * g);
                dpre[3 * h + j] = dh * tc * o * (1.0 - o);
                dc_next[j] = dc * f;
            }

            let zt = &trace.z[t * zdim..(t + 1) * zdim];
            dz.fill(0.0);
            for (r, &d) in dpre.iter().enumerate() {
                if d == 0.0 {
                    continue;
                }
                grads.bias[r] += d;
                let row = r * zdim;
                let w_row = &self.weights[row..row + zdim];
                let g_row = &mut grads.weights[row..row + zdim];
                for k in 0..zdim {
                    g_row[k] += d * zt[k];
                    dz[k] += d * w_row[k];
                }
            }

            d_inputs[t * n_in..(t + 1) * n_in].copy_from_slice(&dz[..n_in]);
            dh_next.copy_from_slice(&dz[n_in..]);
        }

        d_inputs
    }
}
