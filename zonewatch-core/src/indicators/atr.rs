//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Two averaging methods:
//! - `Simple`: arithmetic mean of the last `period` true ranges.
//! - `Wilder`: Wilder smoothing (EMA with alpha = 1/period), last value.
//!
//! A session too short for the chosen window falls back to
//! `mean(high) - mean(low)` so a volatility estimate always exists.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// How true ranges are averaged into a single ATR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtrMethod {
    #[default]
    Simple,
    Wilder,
}

/// Compute the True Range series from candles.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());
    let Some(first) = candles.first() else {
        return tr;
    };
    tr.push(first.high - first.low);

    for pair in candles.windows(2) {
        let pc = pair[0].close;
        let (h, l) = (pair[1].high, pair[1].low);
        tr.push((h - l).max((h - pc).abs()).max((l - pc).abs()));
    }
    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
/// Seed: mean of the first `period` values. Entries before the seed are NaN.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in period..n {
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }
    result
}

/// Single ATR value describing the session's volatility.
///
/// Returns `None` only for an empty series.
pub fn average_true_range(candles: &[Candle], period: usize, method: AtrMethod) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let tr = true_range(candles);

    let atr = match method {
        AtrMethod::Simple if period > 0 && tr.len() >= period => {
            Some(tr[tr.len() - period..].iter().sum::<f64>() / period as f64)
        }
        // TR[0] has no previous close, so the Wilder seed starts at TR[1].
        AtrMethod::Wilder => wilder_smooth(&tr[1..], period)
            .last()
            .copied()
            .filter(|v| v.is_finite()),
        AtrMethod::Simple => None,
    };

    Some(atr.unwrap_or_else(|| range_fallback(candles)))
}

fn range_fallback(candles: &[Candle]) -> f64 {
    let n = candles.len() as f64;
    let mean_high = candles.iter().map(|c| c.high).sum::<f64>() / n;
    let mean_low = candles.iter().map(|c| c.low).sum::<f64>() / n;
    mean_high - mean_low
}
