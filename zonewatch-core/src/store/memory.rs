//! In-memory store engine.

use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{check_zone, DecodeStore, SaveOutcome, StoreError, WatchlistStore, ZoneStore};
use crate::domain::{DecodeEntry, StoredZone, Timeframe, Watchlist, Zone, ZoneKey};

#[derive(Debug, Default)]
struct Tables {
    next_zone_id: i64,
    zones: BTreeMap<ZoneKey, StoredZone>,
    /// decode_date → entries in insertion order
    decode: HashMap<NaiveDate, Vec<DecodeEntry>>,
    watchlists: HashMap<String, Watchlist>,
}

/// All tables behind one mutex, so every insert-or-ignore is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ZoneStore for MemoryStore {
    fn save_zone(&self, zone: &Zone) -> Result<SaveOutcome, StoreError> {
        check_zone(zone)?;
        let mut t = self.lock();
        let key = zone.key();
        if t.zones.contains_key(&key) {
            return Ok(SaveOutcome::AlreadyExists);
        }
        t.next_zone_id += 1;
        let stored = StoredZone {
            id: t.next_zone_id,
            zone: zone.clone(),
            created_at: Utc::now(),
        };
        t.zones.insert(key, stored);
        Ok(SaveOutcome::Inserted)
    }

    fn load_zones(
        &self,
        symbol: &str,
        fetch_date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<StoredZone>, StoreError> {
        let t = self.lock();
        let mut zones: Vec<StoredZone> = t
            .zones
            .values()
            .filter(|s| s.zone.symbol == symbol && s.zone.fetch_date == fetch_date && s.zone.timeframe == timeframe)
            .cloned()
            .collect();
        zones.sort_by(|a, b| {
            a.zone
                .zone_type
                .cmp(&b.zone.zone_type)
                .then(a.zone.zone_low.total_cmp(&b.zone.zone_low))
        });
        Ok(zones)
    }
}

impl DecodeStore for MemoryStore {
    fn add_decode_entries(
        &self,
        decode_date: NaiveDate,
        symbols: &[String],
        fetch_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut t = self.lock();
        let entries = t.decode.entry(decode_date).or_default();
        let mut added = 0;
        for symbol in symbols {
            if entries.iter().any(|e| &e.symbol == symbol) {
                continue;
            }
            entries.push(DecodeEntry {
                decode_date,
                symbol: symbol.clone(),
                fetch_date,
            });
            added += 1;
        }
        Ok(added)
    }

    fn decode_entries(&self, decode_date: NaiveDate) -> Result<Vec<DecodeEntry>, StoreError> {
        Ok(self.lock().decode.get(&decode_date).cloned().unwrap_or_default())
    }
}

impl WatchlistStore for MemoryStore {
    fn save_watchlist(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        let mut t = self.lock();
        let mut record = watchlist.clone();
        record.updated_at = Utc::now();
        if let Some(existing) = t.watchlists.get(&watchlist.name) {
            record.created_at = existing.created_at;
        }
        t.watchlists.insert(record.name.clone(), record);
        Ok(())
    }

    fn list_watchlists(&self) -> Result<Vec<Watchlist>, StoreError> {
        let mut all: Vec<Watchlist> = self.lock().watchlists.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    fn load_watchlist(&self, name: &str) -> Result<Option<Watchlist>, StoreError> {
        Ok(self.lock().watchlists.get(name).cloned())
    }

    fn delete_watchlist(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.lock().watchlists.remove(name).is_some())
    }
}
