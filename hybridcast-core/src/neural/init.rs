//! Weight initialisation helpers.

/// Glorot/Xavier uniform limit `sqrt(6 / (fan_in + fan_out))`.
pub(crate) fn glorot_uniform(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_shrinks_with_fan() {
        assert!((glorot_uniform(1, 5) - 1.0).abs() < 1e-12);
        assert!(glorot_uniform(50, 200) < glorot_uniform(1, 200));
    }
}
