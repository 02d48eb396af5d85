//! Candle — the fundamental intraday market data unit.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single symbol at a fixed timeframe.
///
/// A day's candles form an ordered, immutable series; the extractor never
/// mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Trading date the candle belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle() -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 27)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
            open: 710.0,
            high: 712.0,
            low: 708.0,
            close: 711.0,
            volume: 50_000,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
        assert_eq!(sample_candle().range(), 4.0);
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle();
        candle.close = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_inverted_high_low() {
        let mut candle = sample_candle();
        candle.high = 707.0; // below low
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_date_is_session_date() {
        assert_eq!(
            sample_candle().date(),
            NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()
        );
    }
}
