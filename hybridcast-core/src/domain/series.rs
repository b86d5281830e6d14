//! PriceSeries: the chronologically ordered close history for one ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Structural problems with a price series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("dates not strictly ascending at index {index} ({previous} then {current})")]
    Unordered {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid close {value} on {date}")]
    InvalidClose { date: NaiveDate, value: f64 },
}

/// Ordered daily closes for a ticker. Immutable once constructed.
///
/// Invariants: dates strictly ascending, every close finite and positive.
/// An empty series is valid and means "no data" for the ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a validated series.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    date: p.date,
                    value: p.close,
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(SeriesError::Unordered {
                    index: i,
                    previous: points[i - 1].date,
                    current: p.date,
                });
            }
        }
        Ok(Self {
            ticker: ticker.into(),
            points,
        })
    }

    /// The "no data" series.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            points: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close prices in chronological order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Keep only observations on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start)
                .copied()
                .collect(),
        }
    }
}
