//! SQLite store engine.
//!
//! One connection behind a mutex; uniqueness is enforced by the schema and
//! every insert is `INSERT OR IGNORE`, so concurrent savers of the same key
//! leave exactly one row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{check_zone, DecodeStore, SaveOutcome, StoreError, WatchlistStore, ZoneStore};
use crate::domain::{DecodeEntry, ImpulseStrength, StoredZone, Timeframe, Watchlist, Zone, ZoneType};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    fetch_date TEXT NOT NULL,
    timeframe TEXT NOT NULL,
    zone_type TEXT NOT NULL,
    zone_low REAL NOT NULL,
    zone_high REAL NOT NULL,
    impulse_strength TEXT NOT NULL,
    impulse_start_time TEXT NOT NULL,
    impulse_end_time TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(symbol, fetch_date, timeframe, zone_low, zone_high)
);

CREATE TABLE IF NOT EXISTS decode_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    decode_date TEXT NOT NULL,
    symbol TEXT NOT NULL,
    fetch_date TEXT NOT NULL,
    added_at TEXT NOT NULL,
    UNIQUE(decode_date, symbol)
);

CREATE TABLE IF NOT EXISTS watchlists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    execute_day TEXT NOT NULL,
    fetch_day TEXT NOT NULL,
    symbols TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_zones_lookup ON zones(symbol, fetch_date, timeframe);
CREATE INDEX IF NOT EXISTS idx_decode_date ON decode_lists(decode_date);
";

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened zone database");
        Self::with_connection(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── Row conversion ─────────────────────────────────────────────────

fn corrupt(table: &'static str, message: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        table,
        message: message.into(),
    }
}

fn parse_date(table: &'static str, s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| corrupt(table, format!("date '{s}': {e}")))
}

fn parse_datetime(table: &'static str, s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|e| corrupt(table, format!("datetime '{s}': {e}")))
}

/// Fixed-width UTC stamp so text order matches time order.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_utc(table: &'static str, s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("timestamp '{s}': {e}")))
}

/// Raw text columns of a zones row, converted after the query finishes.
struct ZoneRow {
    id: i64,
    symbol: String,
    fetch_date: String,
    timeframe: String,
    zone_type: String,
    zone_low: f64,
    zone_high: f64,
    impulse_strength: String,
    impulse_start_time: String,
    impulse_end_time: String,
    created_at: String,
}

impl ZoneRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            symbol: row.get(1)?,
            fetch_date: row.get(2)?,
            timeframe: row.get(3)?,
            zone_type: row.get(4)?,
            zone_low: row.get(5)?,
            zone_high: row.get(6)?,
            impulse_strength: row.get(7)?,
            impulse_start_time: row.get(8)?,
            impulse_end_time: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_stored(self) -> Result<StoredZone, StoreError> {
        const T: &str = "zones";
        Ok(StoredZone {
            id: self.id,
            zone: Zone {
                fetch_date: parse_date(T, &self.fetch_date)?,
                timeframe: self.timeframe.parse().map_err(|e: String| corrupt(T, e))?,
                zone_type: ZoneType::parse(&self.zone_type)
                    .ok_or_else(|| corrupt(T, format!("zone_type '{}'", self.zone_type)))?,
                zone_low: self.zone_low,
                zone_high: self.zone_high,
                impulse_strength: ImpulseStrength::parse(&self.impulse_strength)
                    .ok_or_else(|| corrupt(T, format!("impulse_strength '{}'", self.impulse_strength)))?,
                impulse_start_time: parse_datetime(T, &self.impulse_start_time)?,
                impulse_end_time: parse_datetime(T, &self.impulse_end_time)?,
                symbol: self.symbol,
            },
            created_at: parse_utc(T, &self.created_at)?,
        })
    }
}

struct WatchlistRow {
    name: String,
    description: String,
    execute_day: String,
    fetch_day: String,
    symbols: String,
    created_at: String,
    updated_at: String,
}

impl WatchlistRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            description: row.get(1)?,
            execute_day: row.get(2)?,
            fetch_day: row.get(3)?,
            symbols: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_watchlist(self) -> Result<Watchlist, StoreError> {
        const T: &str = "watchlists";
        Ok(Watchlist {
            execute_day: parse_date(T, &self.execute_day)?,
            fetch_day: parse_date(T, &self.fetch_day)?,
            symbols: serde_json::from_str(&self.symbols)?,
            created_at: parse_utc(T, &self.created_at)?,
            updated_at: parse_utc(T, &self.updated_at)?,
            name: self.name,
            description: self.description,
        })
    }
}

const WATCHLIST_COLUMNS: &str = "name, description, execute_day, fetch_day, symbols, created_at, updated_at";

// ─── Engine ─────────────────────────────────────────────────────────

impl ZoneStore for SqliteStore {
    fn save_zone(&self, zone: &Zone) -> Result<SaveOutcome, StoreError> {
        check_zone(zone)?;
        let changed = self.conn().execute(
            "INSERT OR IGNORE INTO zones
             (symbol, fetch_date, timeframe, zone_type, zone_low, zone_high,
              impulse_strength, impulse_start_time, impulse_end_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                zone.symbol,
                zone.fetch_date.format(DATE_FMT).to_string(),
                zone.timeframe.as_str(),
                zone.zone_type.as_str(),
                zone.zone_low,
                zone.zone_high,
                zone.impulse_strength.as_str(),
                zone.impulse_start_time.format(DATETIME_FMT).to_string(),
                zone.impulse_end_time.format(DATETIME_FMT).to_string(),
                stamp(Utc::now()),
            ],
        )?;

        if changed > 0 {
            debug!(symbol = %zone.symbol, fetch_date = %zone.fetch_date, "zone inserted");
            Ok(SaveOutcome::Inserted)
        } else {
            debug!(symbol = %zone.symbol, fetch_date = %zone.fetch_date, "zone already stored");
            Ok(SaveOutcome::AlreadyExists)
        }
    }

    fn load_zones(
        &self,
        symbol: &str,
        fetch_date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<StoredZone>, StoreError> {
        let rows: Vec<ZoneRow> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT id, symbol, fetch_date, timeframe, zone_type, zone_low, zone_high,
                        impulse_strength, impulse_start_time, impulse_end_time, created_at
                 FROM zones
                 WHERE symbol = ?1 AND fetch_date = ?2 AND timeframe = ?3
                 ORDER BY CASE zone_type WHEN 'BULLISH' THEN 0 ELSE 1 END, zone_low",
            )?;
            let mapped = stmt.query_map(
                params![symbol, fetch_date.format(DATE_FMT).to_string(), timeframe.as_str()],
                ZoneRow::from_row,
            )?;
            mapped.collect::<rusqlite::Result<_>>()?
        };
        rows.into_iter().map(ZoneRow::into_stored).collect()
    }

    fn has_zones(&self, symbol: &str, fetch_date: NaiveDate, timeframe: Timeframe) -> Result<bool, StoreError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM zones WHERE symbol = ?1 AND fetch_date = ?2 AND timeframe = ?3",
            params![symbol, fetch_date.format(DATE_FMT).to_string(), timeframe.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl DecodeStore for SqliteStore {
    fn add_decode_entries(
        &self,
        decode_date: NaiveDate,
        symbols: &[String],
        fetch_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO decode_lists (decode_date, symbol, fetch_date, added_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let decode = decode_date.format(DATE_FMT).to_string();
            let fetch = fetch_date.format(DATE_FMT).to_string();
            for symbol in symbols {
                added += stmt.execute(params![decode, symbol, fetch, stamp(Utc::now())])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    fn decode_entries(&self, decode_date: NaiveDate) -> Result<Vec<DecodeEntry>, StoreError> {
        let rows: Vec<(String, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT symbol, fetch_date FROM decode_lists
                 WHERE decode_date = ?1
                 ORDER BY added_at, id",
            )?;
            let mapped = stmt.query_map(params![decode_date.format(DATE_FMT).to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            mapped.collect::<rusqlite::Result<_>>()?
        };
        rows.into_iter()
            .map(|(symbol, fetch)| {
                Ok(DecodeEntry {
                    decode_date,
                    symbol,
                    fetch_date: parse_date("decode_lists", &fetch)?,
                })
            })
            .collect()
    }
}

impl WatchlistStore for SqliteStore {
    fn save_watchlist(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        let symbols = serde_json::to_string(&watchlist.symbols)?;
        self.conn().execute(
            "INSERT INTO watchlists (name, description, execute_day, fetch_day, symbols, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                execute_day = excluded.execute_day,
                fetch_day = excluded.fetch_day,
                symbols = excluded.symbols,
                updated_at = excluded.updated_at",
            params![
                watchlist.name,
                watchlist.description,
                watchlist.execute_day.format(DATE_FMT).to_string(),
                watchlist.fetch_day.format(DATE_FMT).to_string(),
                symbols,
                stamp(watchlist.created_at),
                stamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn list_watchlists(&self) -> Result<Vec<Watchlist>, StoreError> {
        let rows: Vec<WatchlistRow> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {WATCHLIST_COLUMNS} FROM watchlists ORDER BY updated_at DESC, name"
            ))?;
            let mapped = stmt.query_map([], WatchlistRow::from_row)?;
            mapped.collect::<rusqlite::Result<_>>()?
        };
        rows.into_iter().map(WatchlistRow::into_watchlist).collect()
    }

    fn load_watchlist(&self, name: &str) -> Result<Option<Watchlist>, StoreError> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {WATCHLIST_COLUMNS} FROM watchlists WHERE name = ?1"),
                params![name],
                WatchlistRow::from_row,
            )
            .optional()?;
        row.map(WatchlistRow::into_watchlist).transpose()
    }

    fn delete_watchlist(&self, name: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM watchlists WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{day, exercise_store, zone};

    #[test]
    fn shared_store_contract() {
        exercise_store(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trading_zones.db");
        let z = zone("HINDZINC", 708.0, 712.0, ZoneType::Bullish);
        {
            let store = SqliteStore::open(&path).unwrap();
            assert!(store.save_zone(&z).unwrap().is_inserted());
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.save_zone(&z).unwrap(), SaveOutcome::AlreadyExists);
        let loaded = store.load_zones("HINDZINC", day(27), Timeframe::Minute15).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].zone, z);
    }

    #[test]
    fn concurrent_saves_insert_once() {
        let store = std::sync::Arc::new(SqliteStore::open_in_memory().unwrap());
        let z = zone("INFY", 1650.0, 1655.0, ZoneType::Bullish);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                let z = z.clone();
                std::thread::spawn(move || store.save_zone(&z).unwrap())
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(SaveOutcome::is_inserted)
            .count();
        assert_eq!(inserted, 1);
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO zones (symbol, fetch_date, timeframe, zone_type, zone_low, zone_high,
                 impulse_strength, impulse_start_time, impulse_end_time, created_at)
                 VALUES ('X', '2026-01-27', '15minute', 'SIDEWAYS', 1.0, 2.0, 'WEAK',
                 '2026-01-27 10:00:00', '2026-01-27 11:00:00', '2026-01-27T00:00:00Z')",
                [],
            )
            .unwrap();
        let err = store.load_zones("X", day(27), Timeframe::Minute15).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { table: "zones", .. }));
    }
}
