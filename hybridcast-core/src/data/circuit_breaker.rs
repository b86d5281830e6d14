//! Fetch guard for remote series providers.
//!
//! The breaker is a three-state machine. `Closed` counts consecutive transient
//! failures and opens at the threshold. `Open` refuses every fetch until its
//! deadline. Once the deadline passes the next admission moves to `HalfOpen`
//! and lets a single probe through: a successful probe closes the breaker, a
//! failed one re-opens it for another full cooldown. A `Blocked` outcome
//! (HTTP 403) opens the breaker from any state.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::provider::DataError;

/// Result of one remote request, as seen by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The provider answered (including "no such ticker").
    Success,
    /// Rate limiting, 5xx or a dropped connection.
    Transient,
    /// The provider refused us outright.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Yahoo bans tend to last a while: 30-minute cooldown, opens after 3 failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The guarded value is a plain enum; a poisoned lock still holds a valid state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> BreakerState {
        *self.lock()
    }

    /// Ask to send a request. Moves an expired `Open` breaker to `HalfOpen`.
    pub fn admit(&self) -> Result<(), DataError> {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open { until } if Instant::now() >= until => {
                *state = BreakerState::HalfOpen;
                Ok(())
            }
            BreakerState::Open { .. } => Err(DataError::CircuitBreakerTripped),
        }
    }

    /// Feed back the outcome of an admitted request.
    pub fn record(&self, outcome: FetchOutcome) {
        let mut state = self.lock();
        let reopen = BreakerState::Open {
            until: Instant::now() + self.cooldown,
        };
        *state = match (outcome, *state) {
            (FetchOutcome::Success, _) => BreakerState::Closed { failures: 0 },
            (FetchOutcome::Blocked, _) => reopen,
            (FetchOutcome::Transient, BreakerState::HalfOpen) => reopen,
            (FetchOutcome::Transient, BreakerState::Open { until }) => BreakerState::Open { until },
            (FetchOutcome::Transient, BreakerState::Closed { failures }) => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    reopen
                } else {
                    BreakerState::Closed { failures }
                }
            }
        };
    }

    /// Whether a request would currently be admitted. Does not change state.
    pub fn is_allowed(&self) -> bool {
        match self.state() {
            BreakerState::Open { until } => Instant::now() >= until,
            _ => true,
        }
    }

    pub fn remaining_cooldown(&self) -> Duration {
        match self.state() {
            BreakerState::Open { until } => until.saturating_duration_since(Instant::now()),
            _ => Duration::ZERO,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::default_provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(cooldown_ms: u64, threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(Duration::from_millis(cooldown_ms), threshold)
    }

    #[test]
    fn new_breaker_admits() {
        let cb = breaker(60_000, 3);
        assert!(cb.admit().is_ok());
        assert_eq!(cb.state(), BreakerState::Closed { failures: 0 });
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }

    #[test]
    fn opens_at_failure_threshold() {
        let cb = breaker(60_000, 3);
        cb.record(FetchOutcome::Transient);
        cb.record(FetchOutcome::Transient);
        assert_eq!(cb.state(), BreakerState::Closed { failures: 2 });
        cb.record(FetchOutcome::Transient);
        assert!(matches!(cb.state(), BreakerState::Open { .. }));
        assert!(matches!(cb.admit(), Err(DataError::CircuitBreakerTripped)));
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn success_clears_failure_count() {
        let cb = breaker(60_000, 2);
        cb.record(FetchOutcome::Transient);
        cb.record(FetchOutcome::Success);
        cb.record(FetchOutcome::Transient);
        assert!(cb.admit().is_ok());
    }

    #[test]
    fn blocked_opens_immediately() {
        let cb = breaker(60_000, 10);
        cb.record(FetchOutcome::Blocked);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn expired_cooldown_admits_one_probe() {
        let cb = breaker(10, 1);
        cb.record(FetchOutcome::Blocked);
        assert!(cb.admit().is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_allowed());
        assert!(cb.admit().is_ok());
        assert_eq!(cb.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn failed_probe_reopens_and_successful_probe_closes() {
        let cb = breaker(10, 5);
        cb.record(FetchOutcome::Blocked);
        std::thread::sleep(Duration::from_millis(20));
        cb.admit().unwrap();
        cb.record(FetchOutcome::Transient);
        assert!(matches!(cb.state(), BreakerState::Open { .. }));

        std::thread::sleep(Duration::from_millis(20));
        cb.admit().unwrap();
        cb.record(FetchOutcome::Success);
        assert_eq!(cb.state(), BreakerState::Closed { failures: 0 });
    }
}
