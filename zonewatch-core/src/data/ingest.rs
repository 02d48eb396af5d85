//! Session canonicalization at the data boundary.
//!
//! Everything downstream (ATR, impulse scan, origin) assumes a series that is
//! sorted, free of duplicate timestamps, confined to one day and made of sane
//! candles. Sources hand raw candles to [`validate_series`] before anything
//! else touches them.

use chrono::NaiveDate;
use tracing::warn;

use super::provider::DataError;
use crate::domain::Candle;

/// Sort, de-duplicate (first wins) and validate one day's candles.
///
/// Fails with `NoData` for an empty series and `Validation` for candles
/// from another day or with broken OHLC.
pub fn validate_series(symbol: &str, date: NaiveDate, mut candles: Vec<Candle>) -> Result<Vec<Candle>, DataError> {
    if candles.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            date,
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    let before = candles.len();
    candles.dedup_by_key(|c| c.timestamp);
    if candles.len() != before {
        warn!(symbol, %date, dropped = before - candles.len(), "duplicate candle timestamps dropped");
    }

    if let Some(stray) = candles.iter().find(|c| c.date() != date) {
        return Err(DataError::Validation(format!(
            "{symbol}: candle at {} is outside session {date}",
            stray.timestamp
        )));
    }

    let insane = candles.iter().filter(|c| !c.is_sane()).count();
    if insane > 0 {
        return Err(DataError::Validation(format!(
            "{symbol} {date}: {insane} candle(s) with invalid OHLC"
        )));
    }

    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()
    }

    #[test]
    fn sorts_and_dedups() {
        let mut candles = make_candles(day(), &[(100.0, 101.0, 99.0, 100.5); 4]);
        candles[1].close = 100.2;
        let dup = candles[1].clone();
        candles.swap(0, 3);
        candles.push(dup);
        let out = validate_series("TEST", day(), candles).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(out[1].close, 100.2);
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = validate_series("TEST", day(), vec![]).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn rejects_other_day() {
        let other = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        let candles = make_candles(other, &[(100.0, 101.0, 99.0, 100.5); 2]);
        assert!(matches!(
            validate_series("TEST", day(), candles),
            Err(DataError::Validation(_))
        ));
    }

    #[test]
    fn rejects_broken_ohlc() {
        let mut candles = make_candles(day(), &[(100.0, 101.0, 99.0, 100.5); 3]);
        candles[2].high = 98.0;
        assert!(matches!(
            validate_series("TEST", day(), candles),
            Err(DataError::Validation(_))
        ));
    }
}
