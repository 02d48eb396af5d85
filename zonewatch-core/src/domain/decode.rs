//! Decode-list entries and watchlists — user selections, no algorithmic role.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::TimelineContext;

/// "Monitor `symbol`, selected on `decode_date`, against zones from `fetch_date`."
///
/// Unique on `(decode_date, symbol)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeEntry {
    pub decode_date: NaiveDate,
    pub symbol: String,
    pub fetch_date: NaiveDate,
}

/// A named snapshot of a timeline plus a symbol selection.
///
/// `fetch_day` is kept for display only; reloading always re-derives it from
/// `execute_day` and the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub name: String,
    pub description: String,
    pub execute_day: NaiveDate,
    pub fetch_day: NaiveDate,
    pub symbols: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Watchlist {
    /// Snapshot the given context and selection. Timestamps are set to now;
    /// stores keep the original `created_at` on upsert.
    pub fn from_context(
        name: impl Into<String>,
        description: impl Into<String>,
        context: &TimelineContext,
        symbols: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            execute_day: context.execute_day,
            fetch_day: context.fetch_day,
            symbols,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim, upper-case and de-duplicate symbols, keeping first-seen order.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for raw in symbols {
        let sym = raw.as_ref().trim().to_uppercase();
        if sym.is_empty() || out.contains(&sym) {
            continue;
        }
        out.push(sym);
    }
    out
}
