//! Domain types for HybridCast

pub mod forecast;
pub mod series;

pub use forecast::{future_dates, Forecast, HybridForecast, Weights, HORIZON};
pub use series::{PricePoint, PriceSeries, SeriesError};

/// Ticker symbol type alias
pub type Ticker = String;
