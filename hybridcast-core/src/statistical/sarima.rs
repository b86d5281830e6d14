//! Seasonal ARIMA fitted by conditional sum of squares.
//!
//! The model is `φ(B) Φ(Bˢ) (1-B)ᵈ (1-Bˢ)ᴰ yₜ = θ(B) Θ(Bˢ) εₜ` with no constant.
//! Coefficients are searched in unconstrained space and mapped onto the
//! stationary (AR) and invertible (MA) regions before every evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::optim::NelderMead;
use super::transform::{constrain_invertible, constrain_stationary};
use crate::error::{ForecastError, Result};

const MAX_ORDER: usize = 10;
const MAX_DIFFERENCING: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarimaConfig {
    /// Non-seasonal `(p, d, q)`.
    pub order: [usize; 3],
    /// Seasonal `(P, D, Q, s)`.
    pub seasonal_order: [usize; 4],
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: [1, 1, 1],
            seasonal_order: [1, 1, 1, 12],
            max_iterations: 2000,
            tolerance: 1e-8,
        }
    }
}

impl SarimaConfig {
    fn period(&self) -> usize {
        self.seasonal_order[3]
    }

    fn has_seasonal_terms(&self) -> bool {
        self.seasonal_order[..3].iter().any(|&o| o > 0)
    }

    /// Total lag removed by differencing, `d + D·s`.
    pub fn differencing_lag(&self) -> usize {
        self.order[1] + self.seasonal_order[1] * self.period()
    }

    /// Fewest raw observations the fit accepts: `d + D·s + max(p + P·s, q + Q·s) + s + 1`.
    pub fn min_observations(&self) -> usize {
        let [p, _, q] = self.order;
        let [sp, _, sq, s] = self.seasonal_order;
        self.differencing_lag() + (p + sp * s).max(q + sq * s) + s + 1
    }

    fn parameter_count(&self) -> usize {
        self.order[0] + self.order[2] + self.seasonal_order[0] + self.seasonal_order[2]
    }

    pub fn validate(&self) -> Result<()> {
        let [p, d, q] = self.order;
        let [sp, sd, sq, s] = self.seasonal_order;
        if [p, q, sp, sq].iter().any(|&o| o > MAX_ORDER) {
            return Err(ForecastError::InvalidConfig(format!(
                "statistical AR/MA orders must be <= {MAX_ORDER}"
            )));
        }
        if d > MAX_DIFFERENCING || sd > MAX_DIFFERENCING {
            return Err(ForecastError::InvalidConfig(format!(
                "statistical differencing orders must be <= {MAX_DIFFERENCING}"
            )));
        }
        if self.has_seasonal_terms() && s < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal period must be at least 2 when seasonal terms are set, got {s}"
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::InvalidConfig(
                "statistical.max_iterations must be at least 1".into(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "statistical.tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Fitted coefficients and goodness-of-fit statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaSummary {
    pub order: [usize; 3],
    pub seasonal_order: [usize; 4],
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Innovation variance (mean conditional squared residual).
    pub sigma2: f64,
    pub aic: f64,
    pub iterations: usize,
    /// Residuals that entered the sum of squares.
    pub residual_count: usize,
}

#[derive(Debug, Clone)]
struct Coefficients {
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    fn from_unconstrained(config: &SarimaConfig, u: &[f64]) -> Self {
        let [p, _, q] = config.order;
        let [sp, _, sq, _] = config.seasonal_order;
        let (ar, rest) = u.split_at(p);
        let (ma, rest) = rest.split_at(q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(sp);
        debug_assert_eq!(seasonal_ma.len(), sq);
        Self {
            ar: constrain_stationary(ar),
            ma: constrain_invertible(ma),
            seasonal_ar: constrain_stationary(seasonal_ar),
            seasonal_ma: constrain_invertible(seasonal_ma),
        }
    }

    /// `φ(B)·Φ(Bˢ)` as ascending lag coefficients, leading 1.
    fn ar_poly(&self, s: usize) -> Vec<f64> {
        poly_mul(&lag_poly(&self.ar, 1, -1.0), &lag_poly(&self.seasonal_ar, s, -1.0))
    }

    /// `θ(B)·Θ(Bˢ)` as ascending lag coefficients, leading 1.
    fn ma_poly(&self, s: usize) -> Vec<f64> {
        poly_mul(&lag_poly(&self.ma, 1, 1.0), &lag_poly(&self.seasonal_ma, s, 1.0))
    }
}

/// `1 + sign·(c₁B^lag + c₂B^{2·lag} + …)`
fn lag_poly(coeffs: &[f64], lag: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coeffs.len() * lag + 1];
    poly[0] = 1.0;
    for (k, c) in coeffs.iter().enumerate() {
        poly[(k + 1) * lag] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `(1 - B^lag)` applied once.
fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    values.windows(lag + 1).map(|w| w[lag] - w[0]).collect()
}

/// Conditional residuals of `w` under the given polynomials. The first
/// `ar_poly.len() - 1` residuals are conditioned to zero.
fn residuals(w: &[f64], ar_poly: &[f64], ma_poly: &[f64]) -> Vec<f64> {
    let ar_lag = ar_poly.len() - 1;
    let mut e = vec![0.0; w.len()];
    for t in ar_lag..w.len() {
        let mut value: f64 = ar_poly.iter().enumerate().map(|(i, a)| a * w[t - i]).sum();
        for (j, m) in ma_poly.iter().enumerate().skip(1).take(t) {
            value -= m * e[t - j];
        }
        e[t] = value;
    }
    e
}

fn conditional_variance(w: &[f64], ar_poly: &[f64], ma_poly: &[f64]) -> f64 {
    let ar_lag = ar_poly.len() - 1;
    let e = residuals(w, ar_poly, ma_poly);
    let tail = &e[ar_lag..];
    tail.iter().map(|x| x * x).sum::<f64>() / tail.len() as f64
}

pub struct Sarima {
    config: SarimaConfig,
}

impl Sarima {
    pub fn new(config: SarimaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SarimaConfig {
        &self.config
    }

    /// Fit on raw closing prices.
    pub fn fit(&self, closes: &[f64]) -> Result<FittedSarima> {
        let required = self.config.min_observations();
        if closes.len() < required {
            return Err(ForecastError::InsufficientData {
                what: "statistical fit",
                required,
                actual: closes.len(),
            });
        }

        let [_, d, _] = self.config.order;
        let [_, sd, _, s] = self.config.seasonal_order;
        let mut w = closes.to_vec();
        for _ in 0..d {
            w = difference(&w, 1);
        }
        for _ in 0..sd {
            w = difference(&w, s);
        }

        let config = &self.config;
        let objective = |u: &[f64]| {
            let c = Coefficients::from_unconstrained(config, u);
            conditional_variance(&w, &c.ar_poly(s), &c.ma_poly(s))
        };
        let optimizer = NelderMead {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            ..Default::default()
        };
        let k = config.parameter_count();
        let minimum = optimizer.minimize(objective, &vec![0.0; k])?;

        let coefficients = Coefficients::from_unconstrained(config, &minimum.point);
        let ar_poly = coefficients.ar_poly(s);
        let ma_poly = coefficients.ma_poly(s);
        let e = residuals(&w, &ar_poly, &ma_poly);
        let residual_count = w.len() - (ar_poly.len() - 1);
        let sigma2 = minimum.value;
        let aic = residual_count as f64 * sigma2.max(f64::MIN_POSITIVE).ln() + 2.0 * (k + 1) as f64;

        debug!(
            iterations = minimum.iterations,
            sigma2,
            aic,
            "statistical model converged"
        );

        // Integrate the differencing operators into the AR side so forecasting
        // works on raw prices directly.
        let mut full_ar = ar_poly;
        for _ in 0..d {
            full_ar = poly_mul(&full_ar, &[1.0, -1.0]);
        }
        for _ in 0..sd {
            full_ar = poly_mul(&full_ar, &lag_poly(&[1.0], s, -1.0));
        }

        let diff_lag = config.differencing_lag();
        let mut innovations = vec![0.0; diff_lag];
        innovations.extend_from_slice(&e);

        Ok(FittedSarima {
            history: closes.to_vec(),
            innovations,
            full_ar,
            ma_poly,
            summary: SarimaSummary {
                order: config.order,
                seasonal_order: config.seasonal_order,
                ar: coefficients.ar,
                ma: coefficients.ma,
                seasonal_ar: coefficients.seasonal_ar,
                seasonal_ma: coefficients.seasonal_ma,
                sigma2,
                aic,
                iterations: minimum.iterations,
                residual_count,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct FittedSarima {
    history: Vec<f64>,
    /// Residuals aligned with `history`; zero where undefined.
    innovations: Vec<f64>,
    /// `φ(B)Φ(Bˢ)(1-B)ᵈ(1-Bˢ)ᴰ`
    full_ar: Vec<f64>,
    ma_poly: Vec<f64>,
    summary: SarimaSummary,
}

impl FittedSarima {
    pub fn summary(&self) -> &SarimaSummary {
        &self.summary
    }

    /// Point forecast `horizon` steps past the last observation, with future
    /// innovations set to zero.
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let n = self.history.len();
        let mut y = self.history.clone();
        let mut eps = self.innovations.clone();
        y.reserve(horizon);
        eps.reserve(horizon);

        for step in 0..horizon {
            let t = n + step;
            let mut value = 0.0;
            for (i, a) in self.full_ar.iter().enumerate().skip(1) {
                value -= a * y[t - i];
            }
            for (j, m) in self.ma_poly.iter().enumerate().skip(1) {
                value += m * eps[t - j];
            }
            if !value.is_finite() {
                return Err(ForecastError::ModelInference { step, value });
            }
            y.push(value);
            eps.push(0.0);
        }
        Ok(y.split_off(n))
    }
}
