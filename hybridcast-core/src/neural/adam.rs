//! Adam optimizer over a fixed list of parameter slices.
//!
//! ```text
//! m = β1·m + (1 − β1)·g
//! v = β2·v + (1 − β2)·g²
//! θ = θ − lr · m̂ / (√v̂ + ε),   m̂ = m / (1 − β1^t),  v̂ = v / (1 − β2^t)
//! ```
//! Moment buffers are allocated lazily per slot on the first step.

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
    t: u64,
}

impl Adam {
    pub const BETA1: f64 = 0.9;
    pub const BETA2: f64 = 0.999;
    pub const EPSILON: f64 = 1e-7;

    pub fn new(learning_rate: f64) -> Self {
        Self::with_params(learning_rate, Self::BETA1, Self::BETA2, Self::EPSILON)
    }

    pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn timestep(&self) -> u64 {
        self.t
    }

    /// One update across every slot. `params[k]` and `grads[k]` must have equal
    /// length, and the slot layout must stay the same between calls.
    pub fn step(&mut self, params: &mut [&mut [f64]], grads: &[&[f64]]) {
        debug_assert_eq!(params.len(), grads.len());
        if self.m.len() != params.len() {
            self.m = params.iter().map(|p| vec![0.0; p.len()]).collect();
            self.v = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for (slot, (theta, g)) in params.iter_mut().zip(grads).enumerate() {
            let m = &mut self.m[slot];
            let v = &mut self.v[slot];
            for (i, (p, &gi)) in theta.iter_mut().zip(g.iter()).enumerate() {
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * gi;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * gi * gi;
                let m_hat = m[i] / bias_correction1;
                let v_hat = v[i] / bias_correction2;
                *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.01);
        let mut a = vec![1.0, 1.0];
        let mut b = vec![0.0];
        adam.step(
            &mut [a.as_mut_slice(), b.as_mut_slice()],
            &[&[0.5, -2.0][..], &[0.0][..]],
        );
        // Bias-corrected first step is lr · sign(g) for non-zero gradients.
        assert!((a[0] - 0.99).abs() < 1e-6);
        assert!((a[1] - 1.01).abs() < 1e-6);
        assert_eq!(b[0], 0.0);
        assert_eq!(adam.timestep(), 1);
    }

    #[test]
    fn minimises_a_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut x = vec![5.0];
        for _ in 0..500 {
            let g = [2.0 * (x[0] - 2.0)];
            adam.step(&mut [x.as_mut_slice()], &[&g[..]]);
        }
        assert!((x[0] - 2.0).abs() < 1e-2, "x = {}", x[0]);
    }
}
