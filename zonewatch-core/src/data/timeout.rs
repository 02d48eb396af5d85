//! Fail-fast wrapper for slow sources.
//!
//! Every fetch runs on its own worker thread; the caller waits at most
//! `timeout` on a channel. An expired wait returns `DataError::Timeout`
//! and the worker is left to finish (its result is dropped). Failures feed a
//! [`CircuitBreaker`] so a dead source is not hammered.

use chrono::NaiveDate;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{CandleSource, DataError, PriceSource};
use crate::domain::{Candle, Timeframe};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug)]
pub struct TimeBounded<S> {
    inner: Arc<S>,
    timeout: Duration,
    breaker: CircuitBreaker,
    name: String,
}

impl<S: Send + Sync + 'static> TimeBounded<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(inner), timeout)
    }

    /// Share one underlying source between wrappers (e.g. candle and price
    /// roles).
    pub fn from_arc(inner: Arc<S>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            breaker: CircuitBreaker::default(),
            name: String::new(),
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn label(&self) -> &str {
        if self.name.is_empty() {
            "data source"
        } else {
            &self.name
        }
    }

    fn bounded<T, F>(&self, what: &str, op: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, DataError> + Send + 'static,
    {
        self.breaker.call(|| {
            let (tx, rx) = mpsc::channel();
            let inner = Arc::clone(&self.inner);
            thread::Builder::new()
                .name(format!("fetch-{what}"))
                .spawn(move || {
                    // Receiver may be gone after a timeout.
                    let _ = tx.send(op(&inner));
                })
                .map_err(|e| DataError::Other(format!("failed to spawn fetch worker: {e}")))?;

            match rx.recv_timeout(self.timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(source = self.label(), what, timeout_ms, "data fetch timed out");
                    Err(DataError::Timeout {
                        source_name: self.label().to_string(),
                        timeout_ms,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    Err(DataError::Other(format!("{} fetch worker died", self.label())))
                }
            }
        })
    }
}

impl<S: CandleSource + 'static> CandleSource for TimeBounded<S> {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            self.inner.name()
        } else {
            &self.name
        }
    }

    fn candles(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let sym = symbol.to_string();
        self.bounded("candles", move |s| s.candles(&sym, date, timeframe))
    }
}

impl<S: PriceSource + 'static> PriceSource for TimeBounded<S> {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            self.inner.name()
        } else {
            &self.name
        }
    }

    fn last_traded_price(&self, symbol: &str) -> Result<f64, DataError> {
        let sym = symbol.to_string();
        self.bounded("ltp", move |s| s.last_traded_price(&sym))
    }

    fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, DataError> {
        let sym = symbol.to_string();
        self.bounded("close", move |s| s.closing_price(&sym, date))
    }
}
