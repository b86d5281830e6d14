//! HybridCast core: price-series data access, normalization, windowing, and
//! the statistical and neural forecasters that feed the hybrid combiner.

pub mod cancel;
pub mod combine;
pub mod data;
pub mod domain;
pub mod error;
pub mod neural;
pub mod normalize;
pub mod rng;
pub mod statistical;
pub mod window;

pub use cancel::CancelToken;
pub use combine::Combiner;
pub use error::{ForecastError, Stage};
pub use normalize::MinMaxScaler;
pub use window::Windows;
