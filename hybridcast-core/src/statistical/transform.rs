//! Maps between unconstrained optimizer space and stationary / invertible
//! lag-polynomial coefficients.
//!
//! Each unconstrained value becomes a partial autocorrelation in (-1, 1) via
//! `r = u / sqrt(1 + u²)`; the Durbin–Levinson recursion turns the partial
//! autocorrelations into coefficients whose polynomial has every root outside
//! the unit circle.

/// Coefficients `φ` such that `1 - φ₁B - … - φₙBⁿ` is stationary.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    let mut prev = vec![0.0; n];
    let mut curr = vec![0.0; n];
    for k in 0..n {
        let u = unconstrained[k];
        let r = u / (1.0 + u * u).sqrt();
        for i in 0..k {
            curr[i] = prev[i] + r * prev[k - i - 1];
        }
        curr[k] = r;
        prev[..=k].copy_from_slice(&curr[..=k]);
    }
    prev.iter().map(|y| -y).collect()
}

/// Coefficients `θ` such that `1 + θ₁B + … + θₙBⁿ` is invertible.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|c| -c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(constrain_stationary(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(constrain_stationary(&[]).is_empty());
    }

    #[test]
    fn first_order_is_bounded() {
        let phi = constrain_stationary(&[1e6])[0];
        assert!(phi.abs() < 1.0);
        let theta = constrain_invertible(&[-3.0])[0];
        assert!(theta.abs() < 1.0);
    }

    proptest! {
        #[test]
        fn second_order_lands_in_stationarity_triangle(a in -50.0f64..50.0, b in -50.0f64..50.0) {
            let phi = constrain_stationary(&[a, b]);
            prop_assert!(phi[1].abs() < 1.0);
            prop_assert!(phi[0] + phi[1] < 1.0);
            prop_assert!(phi[1] - phi[0] < 1.0);
        }
    }
}
