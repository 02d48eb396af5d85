//! Major-impulse scan.
//!
//! An impulse runs from a launch candle `start` to an end candle `end` and is
//! measured close-to-close. Adverse excursion is measured over the candles
//! after the launch.

use serde::{Deserialize, Serialize};

use super::ExtractorConfig;
use crate::domain::{Candle, ImpulseStrength, ZoneType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// An upward impulse leaves a demand zone behind; downward leaves supply.
    pub fn zone_type(self) -> ZoneType {
        match self {
            Direction::Up => ZoneType::Bullish,
            Direction::Down => ZoneType::Bearish,
        }
    }
}

/// Transient result of the impulse scan. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseMove {
    pub start: usize,
    pub end: usize,
    pub direction: Direction,
    /// Absolute close-to-close displacement.
    pub magnitude: f64,
    pub strength: ImpulseStrength,
}

impl ImpulseMove {
    pub fn span(&self) -> usize {
        self.end - self.start
    }
}

/// Largest qualifying directional displacement in the session.
///
/// Qualifying: `magnitude >= atr_multiplier * atr`, span within
/// `[impulse_min_span, impulse_max_span]`, and adverse excursion at most
/// `max_pullback_ratio * magnitude`. Equal magnitudes prefer the shorter span.
pub fn find_major_impulse(candles: &[Candle], atr: f64, config: &ExtractorConfig) -> Option<ImpulseMove> {
    let n = candles.len();
    if n == 0 || atr.is_nan() || atr <= 0.0 {
        return None;
    }
    let threshold = config.atr_multiplier * atr;
    let mut best: Option<ImpulseMove> = None;

    for start in 0..n {
        let start_close = candles[start].close;
        let last = (start + config.impulse_max_span).min(n - 1);

        for end in (start + config.impulse_min_span)..=last {
            let net = candles[end].close - start_close;
            let magnitude = net.abs();
            if magnitude < threshold || magnitude == 0.0 {
                continue;
            }

            let direction = if net > 0.0 {
                Direction::Up
            } else {
                Direction::Down
            };
            let after_launch = &candles[start + 1..=end];
            let pullback = match direction {
                Direction::Up => {
                    start_close - after_launch.iter().map(|c| c.low).fold(f64::INFINITY, f64::min)
                }
                Direction::Down => {
                    after_launch.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max) - start_close
                }
            };
            if pullback > magnitude * config.max_pullback_ratio {
                continue;
            }

            let better = match &best {
                None => true,
                Some(b) => magnitude > b.magnitude || (magnitude == b.magnitude && end - start < b.span()),
            };
            if better {
                best = Some(ImpulseMove {
                    start,
                    end,
                    direction,
                    magnitude,
                    strength: config.strength_for(magnitude / atr),
                });
            }
        }
    }

    best
}
