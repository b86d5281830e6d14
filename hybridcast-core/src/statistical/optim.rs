//! Derivative-free Nelder–Mead simplex minimiser.

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Relative spread of objective values across the simplex at convergence.
    pub tolerance: f64,
    /// Edge length of the initial simplex along each axis.
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

fn evaluate(f: &impl Fn(&[f64]) -> f64, x: &[f64], iterations: usize) -> Result<f64> {
    let value = f(x);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::Convergence {
            iterations,
            reason: format!("objective evaluated to {value}"),
        })
    }
}

/// `a + t·(b - a)`
fn lerp(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + t * (y - x)).collect()
}

impl NelderMead {
    /// Minimise `f` starting from `start`.
    ///
    /// Fails with [`ForecastError::Convergence`] when the simplex has not
    /// collapsed within `max_iterations` or when `f` returns a non-finite value.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        if n == 0 {
            return Ok(Minimum {
                point: Vec::new(),
                value: evaluate(&f, start, 0)?,
                iterations: 0,
            });
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), evaluate(&f, start, 0)?));
        for axis in 0..n {
            let mut vertex = start.to_vec();
            vertex[axis] += if start[axis] != 0.0 {
                0.05 * start[axis]
            } else {
                self.initial_step
            };
            let value = evaluate(&f, &vertex, 0)?;
            simplex.push((vertex, value));
        }

        for iteration in 1..=self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let best = simplex[0].1;
            let worst = simplex[n].1;
            if (worst - best).abs()
                <= self.tolerance * (best.abs() + worst.abs()) / 2.0 + f64::EPSILON
            {
                let (point, value) = simplex.swap_remove(0);
                return Ok(Minimum {
                    point,
                    value,
                    iterations: iteration - 1,
                });
            }

            let mut centroid = vec![0.0; n];
            for (vertex, _) in &simplex[..n] {
                for (c, v) in centroid.iter_mut().zip(vertex) {
                    *c += v / n as f64;
                }
            }

            let reflected = lerp(&centroid, &simplex[n].0, -REFLECTION);
            let f_reflected = evaluate(&f, &reflected, iteration)?;

            if f_reflected < best {
                let expanded = lerp(&centroid, &reflected, EXPANSION);
                let f_expanded = evaluate(&f, &expanded, iteration)?;
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }
            if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let (contracted, accept_below) = if f_reflected < worst {
                (lerp(&centroid, &reflected, CONTRACTION), f_reflected)
            } else {
                (lerp(&centroid, &simplex[n].0, CONTRACTION), worst)
            };
            let f_contracted = evaluate(&f, &contracted, iteration)?;
            if f_contracted <= accept_below {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = lerp(&anchor, &vertex.0, SHRINK);
                let value = evaluate(&f, &shrunk, iteration)?;
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        Err(ForecastError::Convergence {
            iterations: self.max_iterations,
            reason: format!(
                "objective spread {:e} still above tolerance",
                simplex[n].1 - simplex[0].1
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn finds_quadratic_minimum() {
        let nm = NelderMead::default();
        let min = nm
            .minimize(|x| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2) + 2.0, &[0.0, 0.0])
            .unwrap();
        assert!((min.point[0] - 3.0).abs() < 1e-3);
        assert!((min.point[1] + 1.0).abs() < 1e-3);
        assert!((min.value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn solves_rosenbrock() {
        let nm = NelderMead {
            max_iterations: 10_000,
            ..Default::default()
        };
        let min = nm.minimize(rosenbrock, &[-1.2, 1.0]).unwrap();
        assert!((min.point[0] - 1.0).abs() < 1e-2, "{:?}", min.point);
        assert!((min.point[1] - 1.0).abs() < 2e-2, "{:?}", min.point);
    }

    #[test]
    fn flat_zero_objective_converges_immediately() {
        let min = NelderMead::default().minimize(|_| 0.0, &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(min.iterations, 0);
    }

    #[test]
    fn iteration_budget_exhaustion_is_an_error() {
        let nm = NelderMead {
            max_iterations: 3,
            tolerance: 0.0,
            ..Default::default()
        };
        let err = nm.minimize(rosenbrock, &[-1.2, 1.0]).unwrap_err();
        assert!(matches!(err, ForecastError::Convergence { iterations: 3, .. }));
    }

    #[test]
    fn non_finite_objective_is_an_error() {
        let err = NelderMead::default()
            .minimize(|x| if x[0] > 0.05 { f64::NAN } else { x[0] * x[0] }, &[0.0])
            .unwrap_err();
        assert!(matches!(err, ForecastError::Convergence { .. }));
    }

    #[test]
    fn zero_dimensional_problem_evaluates_once() {
        let min = NelderMead::default().minimize(|_| 4.5, &[]).unwrap();
        assert_eq!(min.value, 4.5);
        assert!(min.point.is_empty());
    }
}
