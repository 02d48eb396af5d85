//! Volatility measures used by zone extraction.
//!
//! Only true range and its averages live here; no other indicator is
//! computed anywhere in the workspace.

pub mod atr;

pub use atr::{average_true_range, true_range, wilder_smooth, AtrMethod};

/// Build a session of 15-minute candles from `(open, high, low, close)` rows,
/// starting at 09:15 on `date`.
#[cfg(test)]
pub fn make_candles(date: chrono::NaiveDate, data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    let open_time = date.and_hms_opt(9, 15, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: open_time + chrono::Duration::minutes(15 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
