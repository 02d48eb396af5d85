//! Trading calendar — weekday + exchange-holiday arithmetic.
//!
//! Deterministic, pure logic. No IO, no wall-clock.
//!
//! A trading day is any Monday–Friday that is not in the configured holiday
//! set. The default holiday set is the 2026 NSE list.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::error::ErrorKind;

/// Longest run of consecutive non-trading days the calendar will walk before
/// declaring the holiday set broken.
pub const MAX_NON_TRADING_RUN: u32 = 30;

/// NSE equity holidays for 2026 as (month, day).
const NSE_HOLIDAYS_2026: [(u32, u32); 15] = [
    (1, 26),  // Republic Day
    (3, 3),   // Holi
    (3, 30),  // Ram Navami
    (4, 2),   // Mahavir Jayanti
    (4, 3),   // Good Friday
    (4, 14),  // Ambedkar Jayanti
    (5, 1),   // Maharashtra Day
    (8, 15),  // Independence Day
    (8, 19),  // Muharram
    (10, 2),  // Gandhi Jayanti
    (10, 20), // Dussehra
    (11, 4),  // Diwali
    (11, 5),  // Diwali
    (11, 25), // Gurunanak Jayanti
    (12, 25), // Christmas
];

/// Date errors. All of them are `ErrorKind::InvalidDate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    Malformed { input: String },

    #[error("{date} is not a trading day (weekend or exchange holiday)")]
    NonTradingDay { date: NaiveDate },

    #[error("no trading day within {MAX_NON_TRADING_RUN} days of {date}; check the holiday calendar")]
    Exhausted { date: NaiveDate },

    #[error("date out of range stepping from {date}")]
    OutOfRange { date: NaiveDate },
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidDate
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, CalendarError> {
    let trimmed = input.trim();
    // chrono accepts single-digit fields for %m/%d; require the canonical width.
    if trimmed.len() != 10 {
        return Err(CalendarError::Malformed {
            input: input.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| CalendarError::Malformed {
        input: input.to_string(),
    })
}

/// Exchange calendar: weekends plus a holiday set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::nse_2026()
    }
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Weekends only, no holidays.
    pub fn weekdays_only() -> Self {
        Self::new(std::iter::empty())
    }

    /// The 2026 NSE holiday list.
    pub fn nse_2026() -> Self {
        Self::new(
            NSE_HOLIDAYS_2026
                .iter()
                .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(2026, m, d)),
        )
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// The trading day `n` trading days after (`n > 0`) or before (`n < 0`) `date`.
    ///
    /// `n == 0` returns `date` itself when it is a trading day, otherwise the
    /// most recent trading day before it.
    pub fn trading_day_offset(&self, date: NaiveDate, n: i32) -> Result<NaiveDate, CalendarError> {
        if n == 0 {
            return if self.is_trading_day(date) {
                Ok(date)
            } else {
                self.step(date, Direction::Back)
            };
        }

        let direction = if n > 0 {
            Direction::Forward
        } else {
            Direction::Back
        };
        let mut current = date;
        for _ in 0..n.unsigned_abs() {
            current = self.step(current, direction)?;
        }
        Ok(current)
    }

    /// The current trading day as of `today` (rolls weekends/holidays back).
    pub fn current_trading_day(&self, today: NaiveDate) -> Result<NaiveDate, CalendarError> {
        self.trading_day_offset(today, 0)
    }

    /// All trading days in the inclusive range `[start, end]`.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect()
    }

    /// Nearest trading day strictly before/after `from`.
    fn step(&self, from: NaiveDate, direction: Direction) -> Result<NaiveDate, CalendarError> {
        let mut current = from;
        for _ in 0..=MAX_NON_TRADING_RUN {
            current = match direction {
                Direction::Forward => current.succ_opt(),
                Direction::Back => current.pred_opt(),
            }
            .ok_or(CalendarError::OutOfRange { date: from })?;
            if self.is_trading_day(current) {
                return Ok(current);
            }
        }
        Err(CalendarError::Exhausted { date: from })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Back,
}
