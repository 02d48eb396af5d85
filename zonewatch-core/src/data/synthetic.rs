//! Deterministic synthetic market data.
//!
//! Stands in for a broker in offline/demo runs. Each (symbol, date,
//! timeframe) session is generated from a BLAKE3-seeded RNG, so the same
//! request always yields the same candles. A session is a random walk with
//! one balance-then-impulse episode planted in it, which gives the extractor
//! something realistic to find. Prices sit on the 0.05 tick grid.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{CandleSource, DataError, PriceSource};
use crate::calendar::TradingCalendar;
use crate::domain::{Candle, Timeframe};

/// Session open 09:15, close 15:30 (375 minutes).
const SESSION_OPEN: (u32, u32) = (9, 15);
const SESSION_MINUTES: u32 = 375;
const TICK: f64 = 0.05;
const DEFAULT_BASE_PRICE: f64 = 1000.0;

/// (symbol, session base price, last-traded price)
const REFERENCE_PRICES: [(&str, f64, f64); 7] = [
    ("HINDZINC", 715.0, 715.20),
    ("TATASTEEL", 202.0, 202.32),
    ("RELIANCE", 1391.0, 1391.00),
    ("INFY", 1659.0, 1659.50),
    ("TCS", 3144.0, 3144.40),
    ("HDFCBANK", 935.0, 935.50),
    ("MRF", 130915.0, 130915.00),
];

fn reference(symbol: &str) -> Option<(f64, f64)> {
    REFERENCE_PRICES
        .iter()
        .find(|(s, _, _)| s.eq_ignore_ascii_case(symbol))
        .map(|&(_, base, ltp)| (base, ltp))
}

fn on_tick(price: f64) -> f64 {
    (price / TICK).round() * TICK
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    calendar: TradingCalendar,
}

impl SyntheticSource {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self { calendar }
    }

    pub fn base_price(symbol: &str) -> f64 {
        reference(symbol).map_or(DEFAULT_BASE_PRICE, |(base, _)| base)
    }

    fn seed(symbol: &str, date: NaiveDate, timeframe: Timeframe) -> [u8; 32] {
        let key = format!("{}|{}|{}", symbol.to_uppercase(), date, timeframe.as_str());
        *blake3::hash(key.as_bytes()).as_bytes()
    }

    /// Generate one session. Never fails; trading-day checks happen in the
    /// trait methods.
    pub fn session(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Vec<Candle> {
        let mut rng = StdRng::from_seed(Self::seed(symbol, date, timeframe));
        let base = Self::base_price(symbol);
        let count = (SESSION_MINUTES / timeframe.minutes()).max(1) as usize;
        let step = Duration::minutes(i64::from(timeframe.minutes()));
        let Some(open_time) = date.and_hms_opt(SESSION_OPEN.0, SESSION_OPEN.1, 0) else {
            return Vec::new();
        };

        // Episode layout: drift, balance, impulse, drift.
        let balance_start = rng.gen_range(2..6).min(count);
        let balance_len = rng.gen_range(3..=6);
        let impulse_len = 4;
        let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

        let mut candles = Vec::with_capacity(count);
        let mut price = on_tick(base * (1.0 + rng.gen_range(-0.01..0.01)));
        for i in 0..count {
            let open = price;
            let (close, wick) = if i >= balance_start && i < balance_start + balance_len {
                let anchor = candles.get(balance_start.saturating_sub(1)).map_or(open, |c: &Candle| c.close);
                (anchor + base * rng.gen_range(-0.0008..0.0008), base * 0.001)
            } else if i >= balance_start + balance_len && i < balance_start + balance_len + impulse_len {
                (open + direction * base * rng.gen_range(0.004..0.008), base * 0.0005)
            } else {
                (open + base * rng.gen_range(-0.002..0.002), base * rng.gen_range(0.0005..0.0015))
            };
            let close = on_tick(close);
            let high = on_tick(open.max(close) + wick);
            let low = on_tick(open.min(close) - wick);

            candles.push(Candle {
                timestamp: open_time + step * i as i32,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(10_000..100_000u64),
            });
            price = close;
        }
        candles
    }
}

impl CandleSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn candles(&self, symbol: &str, date: NaiveDate, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        if !self.calendar.is_trading_day(date) {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                date,
            });
        }
        Ok(self.session(symbol, date, timeframe))
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn last_traded_price(&self, symbol: &str) -> Result<f64, DataError> {
        Ok(reference(symbol).map_or(DEFAULT_BASE_PRICE, |(_, ltp)| ltp))
    }

    fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, DataError> {
        let candles = self.candles(symbol, date, Timeframe::default()).map_err(|_| {
            DataError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: format!("{date} is not a trading day"),
            }
        })?;
        candles
            .last()
            .map(|c| c.close)
            .ok_or_else(|| DataError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: "empty session".into(),
            })
    }
}
