//! Zone — an immutable price range where a dominant impulse originated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Timeframe;

/// Side of the market the zone is expected to defend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    /// Impulse left the zone upward (demand).
    Bullish,
    /// Impulse left the zone downward (supply).
    Bearish,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Bullish => "BULLISH",
            ZoneType::Bearish => "BEARISH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BULLISH" => Some(ZoneType::Bullish),
            "BEARISH" => Some(ZoneType::Bearish),
            _ => None,
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative bucket for how far an impulse exceeded the ATR threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpulseStrength {
    Weak,
    Moderate,
    Strong,
}

impl ImpulseStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpulseStrength::Weak => "WEAK",
            ImpulseStrength::Moderate => "MODERATE",
            ImpulseStrength::Strong => "STRONG",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEAK" => Some(ImpulseStrength::Weak),
            "MODERATE" => Some(ImpulseStrength::Moderate),
            "STRONG" => Some(ImpulseStrength::Strong),
            _ => None,
        }
    }
}

impl fmt::Display for ImpulseStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted zone.
///
/// Produced by the extractor as a pure function of the candle series; the
/// creation timestamp is assigned by the store (see [`StoredZone`]).
/// Invariant: `zone_low < zone_high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub symbol: String,
    pub fetch_date: NaiveDate,
    pub timeframe: Timeframe,
    pub zone_type: ZoneType,
    pub zone_low: f64,
    pub zone_high: f64,
    pub impulse_strength: ImpulseStrength,
    pub impulse_start_time: NaiveDateTime,
    pub impulse_end_time: NaiveDateTime,
}

impl Zone {
    /// Zone width (high minus low).
    pub fn width(&self) -> f64 {
        self.zone_high - self.zone_low
    }

    pub fn mid(&self) -> f64 {
        (self.zone_low + self.zone_high) / 2.0
    }

    /// Edge-inclusive containment.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.zone_low && price <= self.zone_high
    }

    /// Uniqueness key used by every store engine.
    pub fn key(&self) -> ZoneKey {
        ZoneKey {
            symbol: self.symbol.clone(),
            fetch_date: self.fetch_date,
            timeframe: self.timeframe,
            low_bits: self.zone_low.to_bits(),
            high_bits: self.zone_high.to_bits(),
        }
    }
}

/// `(symbol, fetch_date, timeframe, zone_low, zone_high)` with the prices
/// compared bit-for-bit, matching SQLite's REAL equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneKey {
    pub symbol: String,
    pub fetch_date: NaiveDate,
    pub timeframe: Timeframe,
    low_bits: u64,
    high_bits: u64,
}

/// A zone as persisted: store-assigned id and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredZone {
    pub id: i64,
    #[serde(flatten)]
    pub zone: Zone,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_zone() -> Zone {
        let day = NaiveDate::from_ymd_opt(2026, 1, 27).unwrap();
        Zone {
            symbol: "HINDZINC".into(),
            fetch_date: day,
            timeframe: Timeframe::Minute15,
            zone_type: ZoneType::Bullish,
            zone_low: 708.0,
            zone_high: 712.0,
            impulse_strength: ImpulseStrength::Strong,
            impulse_start_time: day.and_hms_opt(10, 30, 0).unwrap(),
            impulse_end_time: day.and_hms_opt(11, 30, 0).unwrap(),
        }
    }

    #[test]
    fn contains_is_edge_inclusive() {
        let zone = sample_zone();
        assert!(zone.contains(708.0));
        assert!(zone.contains(712.0));
        assert!(zone.contains(710.0));
        assert!(!zone.contains(712.01));
        assert!(!zone.contains(707.99));
    }

    #[test]
    fn geometry() {
        let zone = sample_zone();
        assert_eq!(zone.width(), 4.0);
        assert_eq!(zone.mid(), 710.0);
    }

    #[test]
    fn key_ignores_strength_and_times() {
        let a = sample_zone();
        let mut b = sample_zone();
        b.impulse_strength = ImpulseStrength::Weak;
        b.impulse_end_time = b.impulse_start_time;
        assert_eq!(a.key(), b.key());

        b.zone_high = 712.5;
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn labels_round_trip() {
        assert_eq!(ZoneType::parse(ZoneType::Bearish.as_str()), Some(ZoneType::Bearish));
        assert_eq!(
            ImpulseStrength::parse(ImpulseStrength::Moderate.as_str()),
            Some(ImpulseStrength::Moderate)
        );
        assert_eq!(ZoneType::parse("SIDEWAYS"), None);
    }

    #[test]
    fn zone_type_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&ZoneType::Bullish).unwrap(), "\"BULLISH\"");
    }
}
