//! Persistence for zones, decode lists and watchlists.
//!
//! Zones are append-only: `save_zone` is an atomic insert-or-ignore on the
//! key `(symbol, fetch_date, timeframe, zone_low, zone_high)` and there is no
//! update or delete. Decode entries are insert-or-ignore on
//! `(decode_date, symbol)`. Watchlists upsert by name.
//!
//! Two engines: [`SqliteStore`] (file or in-memory SQLite) and
//! [`MemoryStore`] (mutex-guarded maps, for tests and ephemeral sessions).

pub mod memory;
pub mod sqlite;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DecodeEntry, StoredZone, Timeframe, Watchlist, Zone};
use crate::error::ErrorKind;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid zone: {0}")]
    InvalidZone(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Store
    }
}

/// Result of an insert-or-ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Inserted,
    AlreadyExists,
}

impl SaveOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, SaveOutcome::Inserted)
    }
}

pub trait ZoneStore: Send + Sync {
    /// Insert unless the key exists. Never overwrites.
    fn save_zone(&self, zone: &Zone) -> Result<SaveOutcome, StoreError>;

    /// Zones for the key prefix, ordered by `(zone_type, zone_low)`.
    fn load_zones(
        &self,
        symbol: &str,
        fetch_date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<StoredZone>, StoreError>;

    fn has_zones(&self, symbol: &str, fetch_date: NaiveDate, timeframe: Timeframe) -> Result<bool, StoreError> {
        Ok(!self.load_zones(symbol, fetch_date, timeframe)?.is_empty())
    }
}

pub trait DecodeStore: Send + Sync {
    /// Insert-or-ignore each symbol on `(decode_date, symbol)`. Returns how
    /// many rows were new.
    fn add_decode_entries(
        &self,
        decode_date: NaiveDate,
        symbols: &[String],
        fetch_date: NaiveDate,
    ) -> Result<usize, StoreError>;

    /// Entries for `decode_date` in insertion order.
    fn decode_entries(&self, decode_date: NaiveDate) -> Result<Vec<DecodeEntry>, StoreError>;
}

pub trait WatchlistStore: Send + Sync {
    /// Upsert by name; an existing watchlist keeps its `created_at`.
    fn save_watchlist(&self, watchlist: &Watchlist) -> Result<(), StoreError>;

    /// Most recently updated first.
    fn list_watchlists(&self) -> Result<Vec<Watchlist>, StoreError>;

    fn load_watchlist(&self, name: &str) -> Result<Option<Watchlist>, StoreError>;

    /// Returns false if no watchlist had that name.
    fn delete_watchlist(&self, name: &str) -> Result<bool, StoreError>;
}

/// Everything the service layer needs from one engine.
pub trait Store: ZoneStore + DecodeStore + WatchlistStore {}

impl<T: ZoneStore + DecodeStore + WatchlistStore> Store for T {}

/// Reject zones that violate `zone_low < zone_high` before they reach an engine.
pub(crate) fn check_zone(zone: &Zone) -> Result<(), StoreError> {
    if zone.zone_low.is_finite() && zone.zone_high.is_finite() && zone.zone_low < zone.zone_high {
        Ok(())
    } else {
        Err(StoreError::InvalidZone(format!(
            "{} {}: zone_low {} must be below zone_high {}",
            zone.symbol, zone.fetch_date, zone.zone_low, zone.zone_high
        )))
    }
}

/// Shared fixtures for engine tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::{ImpulseStrength, ZoneType};

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    pub fn zone(symbol: &str, low: f64, high: f64, zone_type: ZoneType) -> Zone {
        Zone {
            symbol: symbol.into(),
            fetch_date: day(27),
            timeframe: Timeframe::Minute15,
            zone_type,
            zone_low: low,
            zone_high: high,
            impulse_strength: ImpulseStrength::Strong,
            impulse_start_time: day(27).and_hms_opt(10, 30, 0).unwrap(),
            impulse_end_time: day(27).and_hms_opt(11, 15, 0).unwrap(),
        }
    }

    /// Behavior every engine must share.
    pub fn exercise_store<S: Store>(store: &S) {
        let z = zone("HINDZINC", 708.0, 712.0, ZoneType::Bullish);

        // insert-or-ignore
        assert_eq!(store.save_zone(&z).unwrap(), SaveOutcome::Inserted);
        assert_eq!(store.save_zone(&z).unwrap(), SaveOutcome::AlreadyExists);
        let mut weaker = z.clone();
        weaker.impulse_strength = ImpulseStrength::Weak;
        assert_eq!(store.save_zone(&weaker).unwrap(), SaveOutcome::AlreadyExists);

        // ordering by (zone_type, zone_low)
        store.save_zone(&zone("HINDZINC", 720.0, 724.0, ZoneType::Bearish)).unwrap();
        store.save_zone(&zone("HINDZINC", 700.0, 704.0, ZoneType::Bullish)).unwrap();
        let loaded = store.load_zones("HINDZINC", day(27), Timeframe::Minute15).unwrap();
        let lows: Vec<f64> = loaded.iter().map(|s| s.zone.zone_low).collect();
        assert_eq!(lows, vec![700.0, 708.0, 720.0]);
        // original record untouched
        assert_eq!(loaded[1].zone.impulse_strength, ImpulseStrength::Strong);
        assert_eq!(loaded[1].zone, z);

        assert!(store.has_zones("HINDZINC", day(27), Timeframe::Minute15).unwrap());
        assert!(!store.has_zones("HINDZINC", day(27), Timeframe::Minute5).unwrap());
        assert!(!store.has_zones("HINDZINC", day(28), Timeframe::Minute15).unwrap());

        // invalid zones are refused
        assert!(store.save_zone(&zone("BAD", 5.0, 5.0, ZoneType::Bullish)).is_err());

        // decode lists
        let syms = vec!["TCS".to_string(), "INFY".to_string()];
        assert_eq!(store.add_decode_entries(day(29), &syms, day(27)).unwrap(), 2);
        let more = vec!["INFY".to_string(), "MRF".to_string()];
        assert_eq!(store.add_decode_entries(day(29), &more, day(27)).unwrap(), 1);
        let entries = store.decode_entries(day(29)).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["TCS", "INFY", "MRF"]);
        assert!(entries.iter().all(|e| e.fetch_date == day(27) && e.decode_date == day(29)));
        assert!(store.decode_entries(day(30)).unwrap().is_empty());

        // watchlists
        let ctx = crate::timeline::TimelineContext {
            execute_day: day(29),
            fetch_day: day(27),
            mode: crate::timeline::Mode::Replay,
        };
        let first = Watchlist::from_context("metals", "zinc + steel", &ctx, vec!["HINDZINC".into()]);
        store.save_watchlist(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let other = Watchlist::from_context("it", "", &ctx, vec!["TCS".into(), "INFY".into()]);
        store.save_watchlist(&other).unwrap();
        let listed: Vec<String> = store.list_watchlists().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(listed, vec!["it", "metals"]);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut updated = Watchlist::from_context("metals", "", &ctx, vec!["TATASTEEL".into()]);
        updated.description = "steel only".into();
        store.save_watchlist(&updated).unwrap();
        let loaded = store.load_watchlist("metals").unwrap().unwrap();
        assert_eq!(loaded.symbols, vec!["TATASTEEL"]);
        assert_eq!(loaded.description, "steel only");
        assert_eq!(loaded.created_at, first.created_at);
        let listed: Vec<String> = store.list_watchlists().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(listed, vec!["metals", "it"]);

        assert!(store.delete_watchlist("it").unwrap());
        assert!(!store.delete_watchlist("it").unwrap());
        assert!(store.load_watchlist("it").unwrap().is_none());
    }
}
