//! Seasonal ARIMA forecaster.

pub mod optim;
pub mod sarima;
pub mod transform;

pub use optim::{Minimum, NelderMead};
pub use sarima::{FittedSarima, Sarima, SarimaConfig, SarimaSummary};
