//! Origin zone: the balanced run of candles an impulse launched from.

use super::ExtractorConfig;
use crate::domain::Candle;

/// Candles `start..=end` and their extremes. `end` is the candle just
/// before the launch; the launch candle itself belongs to the impulse.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginRun {
    pub start: usize,
    pub end: usize,
    pub zone_low: f64,
    pub zone_high: f64,
}

impl OriginRun {
    pub fn candle_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn mid(&self) -> f64 {
        (self.zone_low + self.zone_high) / 2.0
    }
}

/// Widest balanced run immediately preceding `launch`, between
/// `zone_candles_min` and `zone_candles_max` candles long.
///
/// Longest first: a consolidation that is balanced as a whole is taken in
/// full rather than clipped to its last few candles.
pub fn find_origin(candles: &[Candle], launch: usize, config: &ExtractorConfig) -> Option<OriginRun> {
    if launch >= candles.len() {
        return None;
    }
    let longest = config.zone_candles_max.min(launch);
    if longest < config.zone_candles_min {
        return None;
    }

    (config.zone_candles_min..=longest).rev().find_map(|len| {
        let start = launch - len;
        balanced_extremes(&candles[start..launch], config).map(|(zone_low, zone_high)| OriginRun {
            start,
            end: launch - 1,
            zone_low,
            zone_high,
        })
    })
}

/// `(low, high)` of `run` if it is compressed and shows no directional
/// progress; `None` otherwise.
fn balanced_extremes(run: &[Candle], config: &ExtractorConfig) -> Option<(f64, f64)> {
    let (first, last) = (run.first()?, run.last()?);
    let low = run.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = run.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let range = high - low;
    if range <= 0.0 || range.is_nan() {
        return None;
    }

    let avg_candle_range = run.iter().map(Candle::range).sum::<f64>() / run.len() as f64;
    let compressed = range < config.compression_ratio * avg_candle_range;
    let progress = (last.close - first.close).abs();
    let flat = progress < config.max_progress_ratio * range;

    (compressed && flat).then_some((low, high))
}
