//! Fully connected linear layer.

use rand::Rng;

use super::init::glorot_uniform;

/// `y = W x + b` with `W` stored `[outputs, inputs]` row-major.
#[derive(Debug, Clone)]
pub struct Dense {
    inputs: usize,
    outputs: usize,
    weights: Vec<f64>,
    bias: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl DenseGrads {
    pub fn add_assign(&mut self, other: &DenseGrads) {
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

impl Dense {
    /// Glorot-uniform weights, zero bias.
    pub fn new(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        let limit = glorot_uniform(inputs, outputs);
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-limit..=limit))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
        }
    }

    /// All weights and biases zero; the layer outputs zero until trained.
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            bias: vec![0.0; outputs],
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    pub fn params_mut(&mut self) -> [&mut [f64]; 2] {
        [&mut self.weights, &mut self.bias]
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.inputs);
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect()
    }

    /// Accumulate gradients for input `x` and upstream `dy`; returns `dL/dx`.
    pub fn backward(&self, x: &[f64], dy: &[f64], grads: &mut DenseGrads) -> Vec<f64> {
        let mut dx = vec![0.0; self.inputs];
        for (r, &d) in dy.iter().enumerate() {
            grads.bias[r] += d;
            let row = r * self.inputs;
            for k in 0..self.inputs {
                grads.weights[row + k] += d * x[k];
                dx[k] += d * self.weights[row + k];
            }
        }
        dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_layer_outputs_zero() {
        let layer = Dense::zeros(3, 1);
        assert_eq!(layer.forward(&[1.0, -2.0, 3.0]), vec![0.0]);
    }

    #[test]
    fn forward_is_affine() {
        let mut layer = Dense::zeros(2, 2);
        {
            let [w, b] = layer.params_mut();
            w.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
            b.copy_from_slice(&[0.5, -0.5]);
        }
        assert_eq!(layer.forward(&[1.0, 1.0]), vec![3.5, 6.5]);
    }

    #[test]
    fn backward_gradients() {
        let layer = Dense::new(3, 2, &mut StdRng::seed_from_u64(5));
        let x = [0.5, -1.0, 2.0];
        let mut grads = layer.zero_grads();
        let dx = layer.backward(&x, &[1.0, 0.0], &mut grads);
        // Only the first output row receives gradient.
        assert_eq!(&grads.weights[..3], &x);
        assert!(grads.weights[3..].iter().all(|g| *g == 0.0));
        assert_eq!(grads.bias, vec![1.0, 0.0]);
        assert_eq!(dx, layer.weights[..3].to_vec());
    }
}
