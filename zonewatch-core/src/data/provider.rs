//! Data source traits and structured error types.
//!
//! `CandleSource` and `PriceSource` abstract over the market-data backend
//! (CSV directory, synthetic generator, a broker client) so we can swap
//! implementations and mock for tests. Time bounds and circuit breaking are
//! layered on top by [`super::TimeBounded`]; sources themselves just fetch.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{Candle, Timeframe};
use crate::error::ErrorKind;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no candles for {symbol} on {date}")]
    NoData { symbol: String, date: NaiveDate },

    #[error("price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("{source_name} did not respond within {timeout_ms} ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("hard stop: circuit breaker tripped, data source refuses requests for another {retry_in_secs}s")]
    CircuitBreakerTripped { retry_in_secs: u64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed candle file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::PriceUnavailable { .. } => ErrorKind::PriceUnavailable,
            DataError::Timeout { .. } | DataError::CircuitBreakerTripped { .. } => ErrorKind::DataFetchTimeout,
            DataError::NoData { .. } => ErrorKind::NoData,
            DataError::Validation(_) | DataError::Io { .. } | DataError::Parse { .. } | DataError::Other(_) => {
                ErrorKind::Data
            }
        }
    }
}

/// Completed-day OHLC candles.
pub trait CandleSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Ordered candles for `symbol` on `date`. Fails with `NoData` when the
    /// symbol did not trade that day.
    fn candles(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Result<Vec<Candle>, DataError>;
}

/// Last-traded and historical closing prices.
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Current last-traded price (LIVE mode).
    fn last_traded_price(&self, symbol: &str) -> Result<f64, DataError>;

    /// Closing price recorded for `date` (REPLAY mode).
    fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, DataError>;
}

/// A price is usable only if it is finite and positive.
pub fn usable_price(symbol: &str, price: f64) -> Result<f64, DataError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(DataError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: format!("source returned unusable price {price}"),
        })
    }
}
