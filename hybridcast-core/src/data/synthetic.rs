//! Synthetic series generator for offline runs and tests.
//!
//! Series land on weekdays only (a simple trading-calendar heuristic) and end
//! at the provider's configured end date. Results are tagged
//! [`DataSource::Synthetic`] so they are never mistaken for market data.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::provider::{DataError, DataSource, Period, SeriesProvider};
use crate::domain::{PricePoint, PriceSeries};

/// Shape of the generated close path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyntheticShape {
    /// `start + step * i`
    Linear { start: f64, step: f64 },
    /// Every close equals `value`.
    Constant { value: f64 },
    /// Multiplicative random walk with uniform daily returns in `±volatility`.
    RandomWalk {
        start: f64,
        volatility: f64,
        seed: u64,
    },
}

impl SyntheticShape {
    fn generate(&self, n: usize) -> Vec<f64> {
        match *self {
            SyntheticShape::Linear { start, step } => {
                (0..n).map(|i| start + step * i as f64).collect()
            }
            SyntheticShape::Constant { value } => vec![value; n],
            SyntheticShape::RandomWalk {
                start,
                volatility,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(seed);
                let vol = volatility.abs();
                let mut price = start;
                (0..n)
                    .map(|_| {
                        let current = price;
                        let r: f64 = if vol > 0.0 {
                            rng.gen_range(-vol..vol)
                        } else {
                            0.0
                        };
                        price *= 1.0 + r;
                        current
                    })
                    .collect()
            }
        }
    }
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays in `start..=end`.
fn weekdays_between(start: NaiveDate, end: NaiveDate) -> usize {
    if start > end {
        return 0;
    }
    let days = end.signed_duration_since(start).num_days() + 1;
    let full_weeks = days / 7;
    let partial = (0..days % 7)
        .filter_map(|i| start.checked_add_signed(Duration::days(full_weeks * 7 + i)))
        .filter(|d| is_weekday(*d))
        .count();
    full_weeks as usize * 5 + partial
}

/// The last `n` weekdays ending on or before `end`, ascending. Stops early at
/// the start of the calendar.
fn trailing_weekdays(end: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = Some(end);
    while let Some(day) = current {
        if dates.len() == n {
            break;
        }
        if is_weekday(day) {
            dates.push(day);
        }
        current = day.pred_opt();
    }
    dates.reverse();
    dates
}

/// Provider that fabricates a deterministic series.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    shape: SyntheticShape,
    end: NaiveDate,
    observations: Option<usize>,
}

impl SyntheticProvider {
    pub fn new(shape: SyntheticShape, end: NaiveDate) -> Self {
        Self {
            shape,
            end,
            observations: None,
        }
    }

    /// Emit exactly `n` observations regardless of the requested period.
    pub fn with_observations(mut self, n: usize) -> Self {
        self.observations = Some(n);
        self
    }

    pub fn shape(&self) -> SyntheticShape {
        self.shape
    }
}

impl SeriesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries, DataError> {
        let n = match self.observations {
            Some(n) => n,
            None => weekdays_between(period.start_before(self.end), self.end),
        };

        let dates = trailing_weekdays(self.end, n);
        let closes = self.shape.generate(dates.len());
        let points = dates
            .into_iter()
            .zip(closes)
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        Ok(PriceSeries::new(ticker, points)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        // A Friday
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn linear_series_has_requested_length_and_slope() {
        let provider = SyntheticProvider::new(
            SyntheticShape::Linear {
                start: 100.0,
                step: 0.1,
            },
            end(),
        )
        .with_observations(1260);
        let series = provider.fetch("LIN", Period::Years(5)).unwrap();
        assert_eq!(series.len(), 1260);
        let closes = series.closes();
        assert_eq!(closes[0], 100.0);
        assert!((closes[1259] - 225.9).abs() < 1e-9);
        assert_eq!(series.last_date(), Some(end()));
    }

    #[test]
    fn dates_skip_weekends() {
        let provider =
            SyntheticProvider::new(SyntheticShape::Constant { value: 100.0 }, end())
                .with_observations(10);
        let series = provider.fetch("C", Period::Years(1)).unwrap();
        assert!(series.points().iter().all(|p| is_weekday(p.date)));
    }

    #[test]
    fn period_drives_length_without_override() {
        let provider =
            SyntheticProvider::new(SyntheticShape::Constant { value: 1.0 }, end());
        let series = provider.fetch("C", Period::Days(13)).unwrap();
        // 2024-06-15 (Sat) .. 2024-06-28 (Fri): two full weeks of weekdays
        assert_eq!(series.len(), 10);
    }

    #[test]
    fn weekday_count_matches_calendar_walk() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for span in 0..40 {
            let end = start + Duration::days(span);
            let walked = start
                .iter_days()
                .take_while(|d| *d <= end)
                .filter(|d| is_weekday(*d))
                .count();
            assert_eq!(weekdays_between(start, end), walked, "span {span}");
        }
        assert_eq!(weekdays_between(end(), start), 0);
    }

    #[test]
    fn trailing_weekdays_stop_at_calendar_start() {
        let end = NaiveDate::MIN + Duration::days(3);
        let dates = trailing_weekdays(end, 100);
        assert!(dates.len() <= 4);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates.iter().all(|d| *d >= NaiveDate::MIN && is_weekday(*d)));
    }

    #[test]
    fn random_walk_is_seeded() {
        let shape = SyntheticShape::RandomWalk {
            start: 50.0,
            volatility: 0.02,
            seed: 7,
        };
        let a = SyntheticProvider::new(shape, end()).with_observations(100);
        let b = SyntheticProvider::new(shape, end()).with_observations(100);
        let sa = a.fetch("W", Period::Years(1)).unwrap();
        let sb = b.fetch("W", Period::Years(1)).unwrap();
        assert_eq!(sa.closes(), sb.closes());
        assert!(sa.closes().iter().all(|c| *c > 0.0));
    }

    #[test]
    fn zero_observations_is_empty() {
        let provider =
            SyntheticProvider::new(SyntheticShape::Constant { value: 1.0 }, end())
                .with_observations(0);
        assert!(provider.fetch("E", Period::Years(5)).unwrap().is_empty());
    }
}
