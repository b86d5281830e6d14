//! Property tests for the forecasting core.
//!
//! Uses proptest to verify:
//! 1. Normalizer round trip: inverse(fit_transform(x)) ≈ x
//! 2. Degenerate range: constant series never produce NaN/Inf
//! 3. Window count: L > W yields exactly L − W pairs of length W
//! 4. Combination law: out[i] == w_s·stat[i] + w_n·neural[i], length 30

use hybridcast_core::domain::{Forecast, Weights, HORIZON};
use hybridcast_core::{Combiner, ForecastError, MinMaxScaler, Windows};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..5000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// Price vectors guaranteed to contain at least two distinct values.
fn arb_varying_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 2..400).prop_filter("needs a non-zero range", |v| {
        v.iter().any(|x| *x != v[0])
    })
}

fn arb_forecast() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), HORIZON)
}

// ── 1. Normalizer round trip ─────────────────────────────────────────

proptest! {
    #[test]
    fn normalize_round_trip(series in arb_varying_series()) {
        let (scaler, normalized) = MinMaxScaler::fit_transform(&series).unwrap();
        prop_assert_eq!(normalized.len(), series.len());
        prop_assert!(normalized.iter().all(|v| (0.0..=1.0).contains(v)));

        let restored = scaler.inverse(&normalized);
        for (a, b) in restored.iter().zip(&series) {
            prop_assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "{} vs {}", a, b);
        }
    }
}

// ── 2. Degenerate range ──────────────────────────────────────────────

proptest! {
    #[test]
    fn constant_series_is_degenerate(value in arb_price(), len in 1usize..2000) {
        let series = vec![value; len];
        let err = MinMaxScaler::fit_transform(&series).unwrap_err();
        prop_assert_eq!(err, ForecastError::DegenerateRange { value });
    }
}

// ── 3. Window count ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn windows_cover_every_target(len in 2usize..300, look_back in 1usize..120) {
        let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
        match Windows::new(&values, look_back) {
            Ok(windows) => {
                prop_assert!(len > look_back);
                prop_assert_eq!(windows.len(), len - look_back);
                for (k, (window, target)) in windows.iter().enumerate() {
                    prop_assert_eq!(window.len(), look_back);
                    // Target index k + W follows the window directly.
                    prop_assert_eq!(target, (k + look_back) as f64);
                    prop_assert_eq!(window[look_back - 1] + 1.0, target);
                }
            }
            Err(ForecastError::InsufficientData { required, actual, .. }) => {
                prop_assert!(len <= look_back);
                prop_assert_eq!(required, look_back + 1);
                prop_assert_eq!(actual, len);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}

// ── 4. Combination law ───────────────────────────────────────────────

proptest! {
    #[test]
    fn combination_is_elementwise_convex(
        stat in arb_forecast(),
        neural in arb_forecast(),
        ws in 0.0..=1.0_f64,
    ) {
        let weights = Weights::from_statistical(ws).unwrap();
        let hybrid = Combiner::new(weights)
            .unwrap()
            .combine(&Forecast::from(stat.clone()), &Forecast::from(neural.clone()))
            .unwrap();
        prop_assert_eq!(hybrid.len(), HORIZON);
        for i in 0..HORIZON {
            let expected = weights.statistical * stat[i] + weights.neural * neural[i];
            prop_assert_eq!(hybrid.values()[i], expected);
            let (lo, hi) = (stat[i].min(neural[i]), stat[i].max(neural[i]));
            prop_assert!(hybrid.values()[i] >= lo - 1e-9 && hybrid.values()[i] <= hi + 1e-9);
        }
    }

    #[test]
    fn combination_rejects_wrong_lengths(a in 0usize..60, b in 0usize..60) {
        prop_assume!(a != HORIZON || b != HORIZON);
        let result = Combiner::default()
            .combine(&Forecast::from(vec![1.0; a]), &Forecast::from(vec![1.0; b]));
        let is_length_error = matches!(result, Err(ForecastError::ForecastLength { .. }));
        prop_assert!(is_length_error);
    }
}
