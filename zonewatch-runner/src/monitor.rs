//! Execute-day monitor.
//!
//! One pass evaluates every decode entry against the zones stored for its
//! fetch day, using a live last-traded price (LIVE) or the recorded close of
//! the execute day (REPLAY). A missing price marks that row unavailable and
//! the pass continues. The monitor only reads.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use zonewatch_core::data::{usable_price, DataError, PriceSource};
use zonewatch_core::domain::{DecodeEntry, StoredZone, Timeframe, Zone, ZoneType};
use zonewatch_core::error::ErrorKind;
use zonewatch_core::store::{StoreError, ZoneStore};
use zonewatch_core::timeline::{Mode, TimelineContext};

/// Float slack on the near-zone comparison.
const NEAR_TOLERANCE: f64 = 1e-9;

/// `[monitor]` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Max distance from a zone edge, in percent, that still counts as near.
    pub near_zone_percent: f64,
    /// Delay between passes in watch mode.
    pub refresh_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            near_zone_percent: 0.5,
            refresh_interval_ms: 3000,
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(
        "{symbol}: decode entry fetch day {entry_fetch_day} does not match active fetch day {context_fetch_day}"
    )]
    TimelineMismatch {
        symbol: String,
        entry_fetch_day: chrono::NaiveDate,
        context_fetch_day: chrono::NaiveDate,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MonitorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MonitorError::TimelineMismatch { .. } => ErrorKind::TimelineMismatch,
            MonitorError::Store(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    InsideBullish,
    InsideBearish,
    Near,
    Away,
    NoZone,
    PriceUnavailable,
}

impl MonitorStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            MonitorStatus::InsideBullish => "🟢",
            MonitorStatus::InsideBearish => "🔴",
            MonitorStatus::Near => "🟡",
            MonitorStatus::Away | MonitorStatus::NoZone => "⚪",
            MonitorStatus::PriceUnavailable => "⚠",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MonitorStatus::InsideBullish => "inside bullish",
            MonitorStatus::InsideBearish => "inside bearish",
            MonitorStatus::Near => "near",
            MonitorStatus::Away => "away",
            MonitorStatus::NoZone => "no zone",
            MonitorStatus::PriceUnavailable => "price unavailable",
        }
    }

    /// Rows worth surfacing in the alerts view.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            MonitorStatus::InsideBullish | MonitorStatus::InsideBearish | MonitorStatus::Near
        )
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.glyph(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// Price is in or approaching the zone without having closed through it.
    Holding,
    NoTouchYet,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Holding => "Holding",
            Reaction::NoTouchYet => "No touch yet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorRow {
    pub symbol: String,
    pub execute_day: chrono::NaiveDate,
    pub fetch_day: chrono::NaiveDate,
    pub mode: Mode,
    pub price: Option<f64>,
    /// The zone the row was classified against.
    pub zone: Option<Zone>,
    /// Signed percent from the nearest edge; 0 inside.
    pub distance_percent: Option<f64>,
    pub status: MonitorStatus,
    pub reaction: Option<Reaction>,
    /// Why the price was unavailable.
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub context: TimelineContext,
    pub rows: Vec<MonitorRow>,
}

impl MonitorReport {
    pub fn count(&self, status: MonitorStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }
}

/// Only inside and near rows.
pub fn alerts(report: &MonitorReport) -> MonitorReport {
    MonitorReport {
        context: report.context,
        rows: report
            .rows
            .iter()
            .filter(|r| r.status.is_alert())
            .cloned()
            .collect(),
    }
}

/// Signed percent offset of `price` from the nearest edge of `zone`.
pub fn distance_percent(zone: &Zone, price: f64) -> f64 {
    if zone.contains(price) {
        0.0
    } else if price > zone.zone_high {
        (price - zone.zone_high) / zone.zone_high * 100.0
    } else {
        (price - zone.zone_low) / zone.zone_low * 100.0
    }
}

/// Classification of one price against one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub distance_percent: f64,
    pub status: MonitorStatus,
    pub reaction: Reaction,
}

pub fn classify(zone: &Zone, price: f64, near_zone_percent: f64) -> Classification {
    let distance = distance_percent(zone, price);
    let (status, reaction) = if zone.contains(price) {
        let status = match zone.zone_type {
            ZoneType::Bullish => MonitorStatus::InsideBullish,
            ZoneType::Bearish => MonitorStatus::InsideBearish,
        };
        (status, Reaction::Holding)
    } else if distance.abs() <= near_zone_percent + NEAR_TOLERANCE {
        (MonitorStatus::Near, Reaction::Holding)
    } else {
        (MonitorStatus::Away, Reaction::NoTouchYet)
    };
    Classification {
        distance_percent: distance,
        status,
        reaction,
    }
}

/// A containing zone wins, otherwise the smallest absolute distance.
fn nearest_zone(zones: &[StoredZone], price: f64) -> Option<&Zone> {
    zones
        .iter()
        .map(|s| &s.zone)
        .find(|z| z.contains(price))
        .or_else(|| {
            zones
                .iter()
                .map(|s| &s.zone)
                .min_by(|a, b| distance_percent(a, price).abs().total_cmp(&distance_percent(b, price).abs()))
        })
}

/// Stateless evaluator over a price source and a zone store.
pub struct ExecuteDayMonitor<'a, Z: ?Sized> {
    prices: &'a dyn PriceSource,
    store: &'a Z,
    timeframe: Timeframe,
    near_zone_percent: f64,
}

impl<'a, Z: ZoneStore + ?Sized> ExecuteDayMonitor<'a, Z> {
    pub fn new(prices: &'a dyn PriceSource, store: &'a Z, timeframe: Timeframe, config: &MonitorConfig) -> Self {
        Self {
            prices,
            store,
            timeframe,
            near_zone_percent: config.near_zone_percent,
        }
    }

    /// One pass over `entries`, rows in entry order.
    ///
    /// Every entry must carry the context's fetch day; any mismatch fails
    /// the whole pass before a price is fetched.
    pub fn evaluate(&self, context: &TimelineContext, entries: &[DecodeEntry]) -> Result<MonitorReport, MonitorError> {
        if let Some(bad) = entries.iter().find(|e| e.fetch_date != context.fetch_day) {
            return Err(MonitorError::TimelineMismatch {
                symbol: bad.symbol.clone(),
                entry_fetch_day: bad.fetch_date,
                context_fetch_day: context.fetch_day,
            });
        }

        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            rows.push(self.evaluate_symbol(context, &entry.symbol)?);
        }
        debug!(%context, rows = rows.len(), "monitor pass complete");
        Ok(MonitorReport {
            context: *context,
            rows,
        })
    }

    fn price(&self, context: &TimelineContext, symbol: &str) -> Result<f64, DataError> {
        let raw = match context.mode {
            Mode::Live => self.prices.last_traded_price(symbol)?,
            Mode::Replay => self.prices.closing_price(symbol, context.execute_day)?,
        };
        usable_price(symbol, raw)
    }

    fn evaluate_symbol(&self, context: &TimelineContext, symbol: &str) -> Result<MonitorRow, MonitorError> {
        let mut row = MonitorRow {
            symbol: symbol.to_string(),
            execute_day: context.execute_day,
            fetch_day: context.fetch_day,
            mode: context.mode,
            price: None,
            zone: None,
            distance_percent: None,
            status: MonitorStatus::PriceUnavailable,
            reaction: None,
            note: None,
        };

        let price = match self.price(context, symbol) {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol, source = self.prices.name(), error = %e, "price unavailable");
                row.note = Some(e.to_string());
                return Ok(row);
            }
        };
        row.price = Some(price);

        let zones = self.store.load_zones(symbol, context.fetch_day, self.timeframe)?;
        let Some(zone) = nearest_zone(&zones, price) else {
            row.status = MonitorStatus::NoZone;
            return Ok(row);
        };

        let c = classify(zone, price, self.near_zone_percent);
        row.zone = Some(zone.clone());
        row.distance_percent = Some(c.distance_percent);
        row.status = c.status;
        row.reaction = Some(c.reaction);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use zonewatch_core::domain::ImpulseStrength;
    use zonewatch_core::store::MemoryStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn zone(symbol: &str, low: f64, high: f64, zone_type: ZoneType) -> Zone {
        Zone {
            symbol: symbol.into(),
            fetch_date: d(27),
            timeframe: Timeframe::Minute15,
            zone_type,
            zone_low: low,
            zone_high: high,
            impulse_strength: ImpulseStrength::Strong,
            impulse_start_time: d(27).and_hms_opt(10, 45, 0).unwrap(),
            impulse_end_time: d(27).and_hms_opt(11, 30, 0).unwrap(),
        }
    }

    fn ctx(mode: Mode) -> TimelineContext {
        TimelineContext {
            execute_day: d(29),
            fetch_day: d(27),
            mode,
        }
    }

    fn entry(symbol: &str) -> DecodeEntry {
        DecodeEntry {
            decode_date: d(29),
            symbol: symbol.into(),
            fetch_date: d(27),
        }
    }

    /// LTP and closes from fixed tables; absent symbols are unavailable.
    #[derive(Default)]
    struct FixedPrices {
        ltp: HashMap<String, f64>,
        close: HashMap<String, f64>,
    }

    impl PriceSource for FixedPrices {
        fn name(&self) -> &str {
            "fixed"
        }

        fn last_traded_price(&self, symbol: &str) -> Result<f64, DataError> {
            self.ltp.get(symbol).copied().ok_or_else(|| DataError::PriceUnavailable {
                symbol: symbol.into(),
                reason: "not quoted".into(),
            })
        }

        fn closing_price(&self, symbol: &str, _date: NaiveDate) -> Result<f64, DataError> {
            self.close.get(symbol).copied().ok_or_else(|| DataError::PriceUnavailable {
                symbol: symbol.into(),
                reason: "no close".into(),
            })
        }
    }

    #[test]
    fn edges_are_inside() {
        let z = zone("X", 708.0, 712.0, ZoneType::Bullish);
        assert_eq!(classify(&z, 708.0, 0.5).status, MonitorStatus::InsideBullish);
        assert_eq!(classify(&z, 712.0, 0.5).status, MonitorStatus::InsideBullish);
        assert_eq!(classify(&z, 712.0, 0.5).distance_percent, 0.0);
        let z = zone("X", 708.0, 712.0, ZoneType::Bearish);
        assert_eq!(classify(&z, 710.0, 0.5).status, MonitorStatus::InsideBearish);
        assert_eq!(classify(&z, 710.0, 0.5).reaction, Reaction::Holding);
    }

    #[test]
    fn near_boundary() {
        let z = zone("X", 708.0, 712.0, ZoneType::Bullish);
        let at_threshold = 712.0 * 1.005;
        assert_eq!(classify(&z, at_threshold, 0.5).status, MonitorStatus::Near);
        let past = 712.0 * 1.0051;
        let c = classify(&z, past, 0.5);
        assert_eq!(c.status, MonitorStatus::Away);
        assert_eq!(c.reaction, Reaction::NoTouchYet);

        // below the zone, distance is negative
        let below = 708.0 * 0.996;
        let c = classify(&z, below, 0.5);
        assert_eq!(c.status, MonitorStatus::Near);
        assert!(c.distance_percent < 0.0);
    }

    #[test]
    fn hindzinc_is_near_and_holding() {
        let z = zone("HINDZINC", 708.0, 712.0, ZoneType::Bullish);
        let c = classify(&z, 715.20, 0.5);
        assert!((c.distance_percent - 0.449_438).abs() < 1e-5);
        assert_eq!(c.status, MonitorStatus::Near);
        assert_eq!(c.reaction, Reaction::Holding);
        assert_eq!(c.status.glyph(), "🟡");
    }

    #[test]
    fn nearest_zone_prefers_containing_then_closest() {
        let stored = |z: Zone, id| StoredZone {
            id,
            zone: z,
            created_at: chrono::Utc::now(),
        };
        let zones = vec![
            stored(zone("X", 100.0, 102.0, ZoneType::Bullish), 1),
            stored(zone("X", 104.0, 106.0, ZoneType::Bullish), 2),
            stored(zone("X", 110.0, 112.0, ZoneType::Bearish), 3),
        ];
        assert_eq!(nearest_zone(&zones, 105.0).unwrap().zone_low, 104.0);
        assert_eq!(nearest_zone(&zones, 108.5).unwrap().zone_low, 110.0);
        assert_eq!(nearest_zone(&zones, 102.5).unwrap().zone_low, 100.0);
        assert!(nearest_zone(&[], 103.0).is_none());
    }

    #[test]
    fn pass_keeps_order_and_marks_each_row() {
        let store = MemoryStore::new();
        store.save_zone(&zone("HINDZINC", 708.0, 712.0, ZoneType::Bullish)).unwrap();
        store.save_zone(&zone("TATASTEEL", 200.0, 203.0, ZoneType::Bearish)).unwrap();
        store.save_zone(&zone("TCS", 3000.0, 3010.0, ZoneType::Bullish)).unwrap();

        let mut prices = FixedPrices::default();
        prices.ltp.insert("HINDZINC".into(), 715.20);
        prices.ltp.insert("TATASTEEL".into(), 202.32);
        prices.ltp.insert("TCS".into(), 3144.40);
        prices.ltp.insert("INFY".into(), 1659.50);
        // MRF has no price

        let monitor = ExecuteDayMonitor::new(&prices, &store, Timeframe::Minute15, &MonitorConfig::default());
        let entries: Vec<DecodeEntry> = ["HINDZINC", "MRF", "TATASTEEL", "TCS", "INFY"]
            .iter()
            .map(|s| entry(s))
            .collect();
        let report = monitor.evaluate(&ctx(Mode::Live), &entries).unwrap();

        let statuses: Vec<MonitorStatus> = report.rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                MonitorStatus::Near,
                MonitorStatus::PriceUnavailable,
                MonitorStatus::InsideBearish,
                MonitorStatus::Away,
                MonitorStatus::NoZone,
            ]
        );
        assert!(report.rows.iter().all(|r| r.fetch_day == d(27) && r.execute_day == d(29)));
        assert!(report.rows[1].note.as_deref().unwrap().contains("not quoted"));
        assert_eq!(report.rows[4].price, Some(1659.50));
        assert!(report.rows[4].reaction.is_none());

        let alerts = alerts(&report);
        let names: Vec<&str> = alerts.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(names, vec!["HINDZINC", "TATASTEEL"]);
    }

    #[test]
    fn replay_uses_execute_day_close() {
        let store = MemoryStore::new();
        store.save_zone(&zone("HINDZINC", 708.0, 712.0, ZoneType::Bullish)).unwrap();
        let mut prices = FixedPrices::default();
        prices.ltp.insert("HINDZINC".into(), 900.0);
        prices.close.insert("HINDZINC".into(), 710.0);

        let monitor = ExecuteDayMonitor::new(&prices, &store, Timeframe::Minute15, &MonitorConfig::default());
        let report = monitor.evaluate(&ctx(Mode::Replay), &[entry("HINDZINC")]).unwrap();
        assert_eq!(report.rows[0].price, Some(710.0));
        assert_eq!(report.rows[0].status, MonitorStatus::InsideBullish);
    }

    #[test]
    fn non_positive_price_is_unavailable() {
        let store = MemoryStore::new();
        let mut prices = FixedPrices::default();
        prices.ltp.insert("ZERO".into(), 0.0);
        let monitor = ExecuteDayMonitor::new(&prices, &store, Timeframe::Minute15, &MonitorConfig::default());
        let report = monitor.evaluate(&ctx(Mode::Live), &[entry("ZERO")]).unwrap();
        assert_eq!(report.rows[0].status, MonitorStatus::PriceUnavailable);
        assert_eq!(report.rows[0].price, None);
    }

    #[test]
    fn mismatched_fetch_day_fails_the_pass() {
        let store = MemoryStore::new();
        let prices = FixedPrices::default();
        let monitor = ExecuteDayMonitor::new(&prices, &store, Timeframe::Minute15, &MonitorConfig::default());
        let mut stale = entry("TCS");
        stale.fetch_date = d(23);
        let err = monitor
            .evaluate(&ctx(Mode::Live), &[entry("INFY"), stale])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimelineMismatch);
        assert!(err.to_string().contains("TCS"));
    }
}
