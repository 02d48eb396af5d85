//! Error kinds shared by every layer.
//!
//! Each concrete error enum (calendar, timeline, data, store, and the runner's
//! config/monitor/service errors) maps onto one `ErrorKind` through a `kind()`
//! method, so callers can branch on the category without matching variants.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or non-trading date input.
    InvalidDate,
    /// Execute day beyond the current trading day.
    FutureDate,
    /// Symbol has no candles for the requested day.
    NoData,
    /// Candle data exists but could not be read or failed validation.
    Data,
    /// No price could be obtained for a monitor row.
    PriceUnavailable,
    /// External source exceeded its bounded wait (or is refusing requests).
    DataFetchTimeout,
    /// Persistence failure.
    Store,
    /// Configuration file or value problem.
    Config,
    /// A row's fetch day disagrees with the active timeline.
    TimelineMismatch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidDate => "invalid_date",
            ErrorKind::FutureDate => "future_date",
            ErrorKind::NoData => "no_data",
            ErrorKind::Data => "data",
            ErrorKind::PriceUnavailable => "price_unavailable",
            ErrorKind::DataFetchTimeout => "data_fetch_timeout",
            ErrorKind::Store => "store",
            ErrorKind::Config => "config",
            ErrorKind::TimelineMismatch => "timeline_mismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
