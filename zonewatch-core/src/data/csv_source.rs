//! CSV directory source.
//!
//! Layout: `{root}/{timeframe}/{SYMBOL}/{YYYY-MM-DD}.csv`, one file per
//! session, header `timestamp,open,high,low,close,volume`, timestamps as
//! `YYYY-MM-DD HH:MM:SS`.
//!
//! Prices are read from the same files: the closing price for a day is the
//! last candle's close, the last-traded price is the last close in the
//! live-date file. Writes are atomic (write to .tmp, rename into place).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::ingest::validate_series;
use super::provider::{usable_price, CandleSource, DataError, PriceSource};
use crate::domain::{Candle, Timeframe};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    root: PathBuf,
    /// Timeframe whose files answer price queries.
    price_timeframe: Timeframe,
    /// Session whose last close is the "last-traded" price.
    live_date: NaiveDate,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>, live_date: NaiveDate) -> Self {
        Self {
            root: root.into(),
            price_timeframe: Timeframe::default(),
            live_date,
        }
    }

    pub fn with_price_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.price_timeframe = timeframe;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{timeframe}/{SYMBOL}/{date}.csv`
    pub fn session_path(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> PathBuf {
        self.root
            .join(timeframe.as_str())
            .join(symbol.to_uppercase())
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    /// Write one session's candles atomically, replacing any existing file.
    pub fn write_session(
        &self,
        symbol: &str,
        date: NaiveDate,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<PathBuf, DataError> {
        let path = self.session_path(symbol, date, timeframe);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| DataError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        let parse_err = |e: csv::Error| DataError::Parse {
            path: tmp_path.clone(),
            message: e.to_string(),
        };
        let mut wtr = csv::Writer::from_path(&tmp_path).map_err(parse_err)?;
        for c in candles {
            wtr.serialize(CsvRow {
                timestamp: c.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .map_err(parse_err)?;
        }
        wtr.flush().map_err(|source| DataError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        drop(wtr);

        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Io {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }

    fn read_session(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let path = self.session_path(symbol, date, timeframe);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                date,
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| DataError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut candles = Vec::new();
        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| DataError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let timestamp = NaiveDateTime::parse_from_str(row.timestamp.trim(), TIMESTAMP_FORMAT).map_err(|e| {
                DataError::Parse {
                    path: path.clone(),
                    message: format!("row {}: bad timestamp '{}': {e}", line + 1, row.timestamp),
                }
            })?;
            candles.push(Candle {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        validate_series(symbol, date, candles)
    }

    fn last_close(&self, symbol: &str, date: NaiveDate) -> Result<f64, DataError> {
        let candles = self
            .read_session(symbol, date, self.price_timeframe)
            .map_err(|e| match e {
                DataError::NoData { .. } => DataError::PriceUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("no {} session file for {date}", self.price_timeframe),
                },
                other => other,
            })?;
        let close = candles.last().map(|c| c.close).unwrap_or(f64::NAN);
        usable_price(symbol, close)
    }
}

impl CandleSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn candles(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        self.read_session(symbol, date, timeframe)
    }
}

impl PriceSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn last_traded_price(&self, symbol: &str) -> Result<f64, DataError> {
        self.last_close(symbol, self.live_date)
    }

    fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, DataError> {
        self.last_close(symbol, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::indicators::make_candles;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()
    }

    #[test]
    fn write_then_read_session() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path(), day());
        let candles = make_candles(day(), &[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 100.0, 101.75)]);
        let path = src.write_session("tcs", day(), Timeframe::Minute15, &candles).unwrap();
        assert!(path.ends_with("15minute/TCS/2026-01-27.csv"));

        let loaded = src.candles("TCS", day(), Timeframe::Minute15).unwrap();
        assert_eq!(loaded, candles);
        assert_eq!(src.closing_price("TCS", day()).unwrap(), 101.75);
        assert_eq!(src.last_traded_price("TCS").unwrap(), 101.75);
    }

    #[test]
    fn reads_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path(), day());
        let path = src.session_path("INFY", day(), Timeframe::Minute15);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             2026-01-27 09:30:00,1659,1662,1658,1661,500\n\
             2026-01-27 09:15:00,1655,1660,1654,1659,700\n",
        )
        .unwrap();
        let loaded = src.candles("INFY", day(), Timeframe::Minute15).unwrap();
        assert_eq!(loaded.len(), 2);
        // sorted on load
        assert_eq!(loaded[0].close, 1659.0);
    }

    #[test]
    fn missing_file_is_no_data_or_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path(), day());
        let err = src.candles("MRF", day(), Timeframe::Minute15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
        let err = src.closing_price("MRF", day()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PriceUnavailable);
    }

    #[test]
    fn bad_timestamp_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path(), day());
        let path = src.session_path("TCS", day(), Timeframe::Minute15);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "timestamp,open,high,low,close,volume\n27/01/2026,1,1,1,1,1\n").unwrap();
        let err = src.candles("TCS", day(), Timeframe::Minute15).unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
        assert_eq!(err.kind(), ErrorKind::Data);
    }
}
