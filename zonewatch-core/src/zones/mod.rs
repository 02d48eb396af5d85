//! Zone extraction.
//!
//! Pipeline per symbol/day:
//! 1. ATR over the session ([`crate::indicators::average_true_range`])
//! 2. Major impulse ([`impulse::find_major_impulse`])
//! 3. Origin run immediately before the launch candle ([`origin::find_origin`])
//! 4. Validation: the impulse carried price away from the origin by at least
//!    the qualifying threshold, on the impulse side
//!
//! Extraction is a pure function of its inputs. Absence of a qualifying setup
//! is a normal outcome (`None`), never an error. Idempotence of repeated runs
//! is the store's concern.

pub mod impulse;
pub mod origin;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Candle, ImpulseStrength, Timeframe, Zone};
use crate::indicators::{average_true_range, AtrMethod};

pub use impulse::{find_major_impulse, Direction, ImpulseMove};
pub use origin::{find_origin, OriginRun};

/// Detection parameters (`[detection]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub atr_period: usize,
    pub atr_method: AtrMethod,
    /// Impulse qualification threshold as a multiple of ATR.
    pub atr_multiplier: f64,
    pub zone_candles_min: usize,
    pub zone_candles_max: usize,
    /// Sessions shorter than this yield no zone.
    pub min_candles: usize,
    pub impulse_min_span: usize,
    pub impulse_max_span: usize,
    /// Max adverse excursion after launch, as a fraction of the net move.
    pub max_pullback_ratio: f64,
    /// Balanced run: total range < ratio × average candle range.
    pub compression_ratio: f64,
    /// Balanced run: |last close − first close| < ratio × total range.
    pub max_progress_ratio: f64,
    pub moderate_atr_multiple: f64,
    pub strong_atr_multiple: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_method: AtrMethod::Simple,
            atr_multiplier: 1.5,
            zone_candles_min: 2,
            zone_candles_max: 6,
            min_candles: 20,
            impulse_min_span: 3,
            impulse_max_span: 19,
            max_pullback_ratio: 0.3,
            compression_ratio: 2.5,
            max_progress_ratio: 0.5,
            moderate_atr_multiple: 2.0,
            strong_atr_multiple: 3.0,
        }
    }
}

impl ExtractorConfig {
    /// Bucket an impulse by `magnitude / atr`.
    pub fn strength_for(&self, atr_multiple: f64) -> ImpulseStrength {
        if atr_multiple >= self.strong_atr_multiple {
            ImpulseStrength::Strong
        } else if atr_multiple >= self.moderate_atr_multiple {
            ImpulseStrength::Moderate
        } else {
            ImpulseStrength::Weak
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.atr_period == 0 {
            return Err("atr_period must be at least 1".into());
        }
        if !(self.atr_multiplier.is_finite() && self.atr_multiplier > 0.0) {
            return Err(format!("atr_multiplier must be > 0, got {}", self.atr_multiplier));
        }
        if self.zone_candles_min < 2 || self.zone_candles_min > self.zone_candles_max {
            return Err(format!(
                "zone candle bounds must satisfy 2 <= min <= max, got {}..{}",
                self.zone_candles_min, self.zone_candles_max
            ));
        }
        if self.impulse_min_span == 0 || self.impulse_min_span > self.impulse_max_span {
            return Err(format!(
                "impulse span bounds must satisfy 1 <= min <= max, got {}..{}",
                self.impulse_min_span, self.impulse_max_span
            ));
        }
        if self.moderate_atr_multiple > self.strong_atr_multiple {
            return Err("moderate_atr_multiple must not exceed strong_atr_multiple".into());
        }
        for (name, v) in [
            ("max_pullback_ratio", self.max_pullback_ratio),
            ("compression_ratio", self.compression_ratio),
            ("max_progress_ratio", self.max_progress_ratio),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(format!("{name} must be a non-negative number, got {v}"));
            }
        }
        Ok(())
    }
}

/// Stateless zone extractor.
#[derive(Debug, Clone, Default)]
pub struct ZoneExtractor {
    config: ExtractorConfig,
}

impl ZoneExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract at most one zone from a completed session.
    ///
    /// `candles` must be a validated series for `fetch_date`
    /// (see [`crate::data::validate_series`]).
    pub fn extract(
        &self,
        symbol: &str,
        fetch_date: NaiveDate,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Option<Zone> {
        let cfg = &self.config;
        if candles.len() < cfg.min_candles {
            debug!(symbol, candles = candles.len(), "session too short for extraction");
            return None;
        }

        let atr = average_true_range(candles, cfg.atr_period, cfg.atr_method)?;
        let Some(impulse) = find_major_impulse(candles, atr, cfg) else {
            debug!(symbol, atr, "no qualifying impulse");
            return None;
        };
        let Some(origin) = find_origin(candles, impulse.start, cfg) else {
            debug!(symbol, launch = impulse.start, "no balanced origin before impulse");
            return None;
        };
        if !self.moved_away(candles, &impulse, &origin, atr) {
            debug!(symbol, "impulse did not carry price away from origin");
            return None;
        }

        Some(Zone {
            symbol: symbol.to_string(),
            fetch_date,
            timeframe,
            zone_type: impulse.direction.zone_type(),
            zone_low: origin.zone_low,
            zone_high: origin.zone_high,
            impulse_strength: impulse.strength,
            impulse_start_time: candles[impulse.start].timestamp,
            impulse_end_time: candles[impulse.end].timestamp,
        })
    }

    fn moved_away(&self, candles: &[Candle], impulse: &ImpulseMove, origin: &OriginRun, atr: f64) -> bool {
        let end_close = candles[impulse.end].close;
        let beyond = match impulse.direction {
            Direction::Up => end_close > origin.zone_high,
            Direction::Down => end_close < origin.zone_low,
        };
        beyond && (end_close - origin.mid()).abs() >= self.config.atr_multiplier * atr
    }
}
