//! Circuit breaker for an unreliable market-data source.
//!
//! After `failure_threshold` consecutive failed fetches (timeouts, transport
//! errors) the breaker trips and refuses all requests for a cooldown period.
//! "No data" and "validation" answers are real answers and do not count as
//! failures.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

use super::provider::DataError;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation — requests are allowed.
    Closed,
    /// Tripped — all requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl Default for CircuitBreaker {
    /// 60-second cooldown, trips after 3 consecutive failures.
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay meaningful even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if requests are currently allowed. Resets after the cooldown.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record a failure; trips once the threshold is reached.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold && inner.state == BreakerState::Closed {
            warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker tripped"
            );
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }

    /// Run `fetch` through the breaker: refuse when open, then record the
    /// outcome. A refusal carries the time left until the breaker resets.
    pub fn call<T>(&self, fetch: impl FnOnce() -> Result<T, DataError>) -> Result<T, DataError> {
        if !self.is_allowed() {
            let remaining = self.remaining_cooldown();
            return Err(DataError::CircuitBreakerTripped {
                retry_in_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            });
        }
        let result = fetch();
        match &result {
            Ok(_) => self.record_success(),
            Err(e) if counts_as_failure(e) => self.record_failure(),
            Err(_) => {}
        }
        result
    }
}

fn counts_as_failure(err: &DataError) -> bool {
    matches!(err, DataError::Timeout { .. } | DataError::Io { .. } | DataError::Other(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timeout() -> DataError {
        DataError::Timeout {
            source_name: "test".into(),
            timeout_ms: 1,
        }
    }

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        assert!(cb.is_allowed());
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }

    #[test]
    fn trips_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed()); // 2 < 3
        cb.record_failure();
        assert!(!cb.is_allowed()); // 3 >= 3 → tripped
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn success_resets_counter() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn expires_after_cooldown() {
        let cb = CircuitBreaker::new(Duration::from_millis(10));
        for _ in 0..3 {
            cb.record_failure();
        }
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
    }

    #[test]
    fn call_refuses_when_open() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        for _ in 0..3 {
            let _ = cb.call(|| Err::<(), _>(timeout()));
        }
        let refused = cb.call(|| Ok(1)).unwrap_err();
        match &refused {
            DataError::CircuitBreakerTripped { retry_in_secs } => assert!((1..=60).contains(retry_in_secs)),
            other => panic!("expected a refusal, got {other:?}"),
        }
        assert!(refused.to_string().contains("circuit breaker tripped"));
    }

    #[test]
    fn no_data_is_not_a_failure() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        for _ in 0..5 {
            let _ = cb.call(|| {
                Err::<(), _>(DataError::NoData {
                    symbol: "X".into(),
                    date: NaiveDate::from_ymd_opt(2026, 1, 27).unwrap(),
                })
            });
        }
        assert!(cb.is_allowed());
    }
}
