//! Sliding look-back windows over a normalized series.
//!
//! Pair `k` is `(values[k..k + W], values[k + W])`, i.e. the window ending just
//! before target index `i = k + W`. Pairs are borrowed views over the series
//! and always enumerate in ascending target index.

use crate::error::{ForecastError, Result};

/// Training pairs for one look-back length.
#[derive(Debug, Clone, Copy)]
pub struct Windows<'a> {
    values: &'a [f64],
    look_back: usize,
    /// Pair indices `start..end` covered by this set.
    start: usize,
    end: usize,
}

impl<'a> Windows<'a> {
    /// Every `(window, next value)` pair obtainable by sliding one step at a time.
    ///
    /// Requires `values.len() > look_back`; yields `values.len() - look_back` pairs.
    pub fn new(values: &'a [f64], look_back: usize) -> Result<Self> {
        if look_back == 0 {
            return Err(ForecastError::InvalidConfig(
                "look-back window must be at least 1".into(),
            ));
        }
        if values.len() <= look_back {
            return Err(ForecastError::InsufficientData {
                what: "window construction",
                required: look_back + 1,
                actual: values.len(),
            });
        }
        Ok(Self {
            values,
            look_back,
            start: 0,
            end: values.len() - look_back,
        })
    }

    pub fn look_back(&self) -> usize {
        self.look_back
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// The `i`-th pair of this set. Panics if `i >= len()`.
    pub fn get(&self, i: usize) -> (&'a [f64], f64) {
        assert!(i < self.len(), "window index {i} out of range");
        let k = self.start + i;
        (&self.values[k..k + self.look_back], self.values[k + self.look_back])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a [f64], f64)> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Split off the trailing `fraction` of pairs as a chronological hold-out.
    ///
    /// Returns `(train, None)` when `fraction` is zero or would leave either
    /// side empty.
    pub fn split_tail(self, fraction: f64) -> (Self, Option<Self>) {
        if !(fraction > 0.0 && fraction < 1.0) {
            return (self, None);
        }
        let held = (self.len() as f64 * fraction).round() as usize;
        if held == 0 || held >= self.len() {
            return (self, None);
        }
        let cut = self.end - held;
        let train = Self { end: cut, ..self };
        let validation = Self { start: cut, ..self };
        (train, Some(validation))
    }
}

/// The most recent `look_back` values, used to seed recursive forecasting.
pub fn last_window(values: &[f64], look_back: usize) -> Result<&[f64]> {
    if look_back == 0 || values.len() < look_back {
        return Err(ForecastError::InsufficientData {
            what: "forecast seed window",
            required: look_back.max(1),
            actual: values.len(),
        });
    }
    Ok(&values[values.len() - look_back..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_len_minus_look_back_pairs() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let windows = Windows::new(&values, 3).unwrap();
        assert_eq!(windows.len(), 7);
        let (first_in, first_target) = windows.get(0);
        assert_eq!(first_in, &[0.0, 1.0, 2.0]);
        assert_eq!(first_target, 3.0);
        let (last_in, last_target) = windows.get(6);
        assert_eq!(last_in, &[6.0, 7.0, 8.0]);
        assert_eq!(last_target, 9.0);
    }

    #[test]
    fn pairs_are_in_ascending_target_order() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let targets: Vec<f64> = Windows::new(&values, 5).unwrap().iter().map(|(_, t)| t).collect();
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn needs_look_back_plus_one_observations() {
        let values = vec![0.0; 60];
        let err = Windows::new(&values, 60).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                what: "window construction",
                required: 61,
                actual: 60,
            }
        );
        assert_eq!(Windows::new(&[0.0; 61], 60).unwrap().len(), 1);
    }

    #[test]
    fn zero_look_back_is_rejected() {
        assert!(matches!(
            Windows::new(&[1.0, 2.0], 0),
            Err(ForecastError::InvalidConfig(_))
        ));
    }

    #[test]
    fn split_tail_holds_out_latest_pairs() {
        let values: Vec<f64> = (0..110).map(|i| i as f64).collect();
        let (train, validation) = Windows::new(&values, 10).unwrap().split_tail(0.2);
        let validation = validation.unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(validation.len(), 20);
        assert_eq!(train.get(79).1, 89.0);
        assert_eq!(validation.get(0).1, 90.0);
    }

    #[test]
    fn split_tail_zero_keeps_everything() {
        let values = vec![0.5; 30];
        let (train, validation) = Windows::new(&values, 5).unwrap().split_tail(0.0);
        assert_eq!(train.len(), 25);
        assert!(validation.is_none());
    }

    #[test]
    fn last_window_takes_trailing_values() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(last_window(&values, 2).unwrap(), &[3.0, 4.0]);
        assert!(last_window(&values, 5).is_err());
    }
}
