//! Timeline resolution — one (execute day, fetch day, mode) triple per session.
//!
//! The context is a plain value. It is derived fresh from the execute day and
//! the calendar every time and passed explicitly into extraction and
//! monitoring; nothing here holds mutable state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::calendar::{parse_date, CalendarError, TradingCalendar};
use crate::error::ErrorKind;

/// Trading days between the fetch day and the execute day.
pub const FETCH_DAY_LAG: i32 = 2;

/// LIVE reads last-traded prices; REPLAY reads the execute day's close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Live,
    Replay,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "LIVE",
            Mode::Replay => "REPLAY",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active timeline every monitor row is evaluated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineContext {
    pub execute_day: NaiveDate,
    pub fetch_day: NaiveDate,
    pub mode: Mode,
}

impl fmt::Display for TimelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "execute {} | fetch {} | {}",
            self.execute_day, self.fetch_day, self.mode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error(transparent)]
    InvalidDate(#[from] CalendarError),

    #[error("execute day {execute_day} is after the current trading day {current}")]
    FutureDate {
        execute_day: NaiveDate,
        current: NaiveDate,
    },
}

impl TimelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TimelineError::InvalidDate(_) => ErrorKind::InvalidDate,
            TimelineError::FutureDate { .. } => ErrorKind::FutureDate,
        }
    }
}

/// Derives timeline contexts from a trading calendar.
#[derive(Debug, Clone, Default)]
pub struct TimelineResolver {
    calendar: TradingCalendar,
}

impl TimelineResolver {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Resolve `execute_day` as seen from `today`.
    ///
    /// Rejects non-trading execute days and any execute day after the current
    /// trading day.
    pub fn resolve(
        &self,
        execute_day: NaiveDate,
        today: NaiveDate,
    ) -> Result<TimelineContext, TimelineError> {
        if !self.calendar.is_trading_day(execute_day) {
            return Err(CalendarError::NonTradingDay { date: execute_day }.into());
        }

        let current = self.calendar.current_trading_day(today)?;
        if execute_day > current {
            return Err(TimelineError::FutureDate {
                execute_day,
                current,
            });
        }

        let fetch_day = self
            .calendar
            .trading_day_offset(execute_day, -FETCH_DAY_LAG)?;
        let mode = if execute_day == current {
            Mode::Live
        } else {
            Mode::Replay
        };

        let context = TimelineContext {
            execute_day,
            fetch_day,
            mode,
        };
        debug!(%context, "timeline resolved");
        Ok(context)
    }

    /// Parse a `YYYY-MM-DD` execute day, then resolve it.
    pub fn resolve_str(
        &self,
        execute_day: &str,
        today: NaiveDate,
    ) -> Result<TimelineContext, TimelineError> {
        let day = parse_date(execute_day)?;
        self.resolve(day, today)
    }
}
