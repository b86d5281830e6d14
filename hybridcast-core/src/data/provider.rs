//! Series provider trait, look-back periods and structured data errors.
//!
//! The SeriesProvider trait abstracts over data sources (Yahoo Finance, CSV
//! import, synthetic generation) so the pipeline can swap implementations and
//! tests can inject fixed series.
//!
//! "No data" and "transport failure" are kept apart: a provider returns an
//! empty [`PriceSeries`] for an unknown ticker and a [`DataError`] only when it
//! could not answer the question at all.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{PriceSeries, SeriesError};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid series: {0}")]
    Validation(#[from] SeriesError),

    #[error("I/O error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::CsvImport => "csv_import",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// How far back to fetch, e.g. `5y`, `6mo`, `30d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Days(u32),
    Months(u32),
    Years(u32),
}

impl Period {
    /// First calendar date covered by this period when it ends at `end`.
    pub fn start_before(&self, end: NaiveDate) -> NaiveDate {
        match *self {
            Period::Days(n) => end
                .checked_sub_signed(Duration::days(i64::from(n)))
                .unwrap_or(NaiveDate::MIN),
            Period::Months(n) => end.checked_sub_months(Months::new(n)).unwrap_or(NaiveDate::MIN),
            Period::Years(n) => end
                .checked_sub_months(Months::new(n.saturating_mul(12)))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Years(5)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("period '{s}' has no unit (expected d, mo or y)"))?;
        let (num, unit) = s.split_at(split);
        let n: u32 = num
            .parse()
            .map_err(|_| format!("period '{s}' must start with a positive integer"))?;
        if n == 0 {
            return Err(format!("period '{s}' must be non-zero"));
        }
        match unit {
            "d" => Ok(Period::Days(n)),
            "mo" => Ok(Period::Months(n)),
            "y" => Ok(Period::Years(n)),
            other => Err(format!("unknown period unit '{other}' (expected d, mo or y)")),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// Trait for price history providers.
///
/// The returned series is chronological and validated. An empty series means
/// the provider has no history for the ticker.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which source tag results from this provider carry.
    fn source(&self) -> DataSource;

    /// Fetch daily closes for `ticker` covering `period` up to the latest day.
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_period_strings() {
        assert_eq!("5y".parse::<Period>().unwrap(), Period::Years(5));
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::Months(6));
        assert_eq!(" 30D ".parse::<Period>().unwrap(), Period::Days(30));
    }

    #[test]
    fn rejects_bad_period_strings() {
        assert!("5".parse::<Period>().is_err());
        assert!("y".parse::<Period>().is_err());
        assert!("0y".parse::<Period>().is_err());
        assert!("5w".parse::<Period>().is_err());
    }

    #[test]
    fn period_round_trips_through_display() {
        for p in [Period::Days(10), Period::Months(3), Period::Years(5)] {
            assert_eq!(p.to_string().parse::<Period>().unwrap(), p);
        }
    }

    #[test]
    fn huge_periods_clamp_to_earliest_date() {
        let end = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let days: Period = "4000000000d".parse().unwrap();
        assert_eq!(days.start_before(end), NaiveDate::MIN);
        assert_eq!(Period::Years(u32::MAX).start_before(end), NaiveDate::MIN);
        assert_eq!(Period::Months(u32::MAX).start_before(end), NaiveDate::MIN);
    }

    #[test]
    fn five_years_back_from_leap_day() {
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            Period::Years(5).start_before(end),
            NaiveDate::from_ymd_opt(2019, 2, 28).unwrap()
        );
        assert_eq!(
            Period::Days(29).start_before(end),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
    }
}
