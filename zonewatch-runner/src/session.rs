//! Monitoring session: the active timeline plus the symbols gathered for it.
//!
//! Changing the execute day clears the selection, so a decode entry can never
//! carry a fetch day from a previous timeline. The mode alone may change.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use zonewatch_core::domain::{normalize_symbols, DecodeEntry, Watchlist};
use zonewatch_core::error::ErrorKind;
use zonewatch_core::timeline::{TimelineContext, TimelineError, TimelineResolver};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no execute day selected")]
    NoActiveTimeline,

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoActiveTimeline => ErrorKind::InvalidDate,
            SessionError::Timeline(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonitorSession {
    resolver: TimelineResolver,
    context: Option<TimelineContext>,
    symbols: Vec<String>,
}

impl MonitorSession {
    pub fn new(resolver: TimelineResolver) -> Self {
        Self {
            resolver,
            context: None,
            symbols: Vec::new(),
        }
    }

    pub fn context(&self) -> Option<&TimelineContext> {
        self.context.as_ref()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Resolve and activate `execute_day`. New execute/fetch days drop the
    /// gathered symbols; a mode change alone (LIVE → REPLAY once the day
    /// rolls over) keeps them. On error the session is left unchanged.
    pub fn set_execute_day(&mut self, execute_day: NaiveDate, today: NaiveDate) -> Result<TimelineContext, SessionError> {
        let next = self.resolver.resolve(execute_day, today)?;
        let same_days = self
            .context
            .is_some_and(|ctx| ctx.execute_day == next.execute_day && ctx.fetch_day == next.fetch_day);
        if !same_days {
            if !self.symbols.is_empty() {
                info!(dropped = self.symbols.len(), context = %next, "timeline changed, selection cleared");
            }
            self.symbols.clear();
        }
        self.context = Some(next);
        Ok(next)
    }

    /// Add symbols to the selection (trimmed, upper-cased, de-duplicated).
    /// Returns how many were new.
    pub fn add_symbols<S: AsRef<str>>(&mut self, symbols: &[S]) -> Result<usize, SessionError> {
        if self.context.is_none() {
            return Err(SessionError::NoActiveTimeline);
        }
        let before = self.symbols.len();
        let mut merged = std::mem::take(&mut self.symbols);
        merged.extend(symbols.iter().map(|s| s.as_ref().to_string()));
        self.symbols = normalize_symbols(&merged);
        Ok(self.symbols.len() - before)
    }

    pub fn clear_symbols(&mut self) {
        self.symbols.clear();
    }

    /// Decode entries for the selection, all on the active context's dates.
    pub fn decode_entries(&self) -> Vec<DecodeEntry> {
        let Some(ctx) = self.context else {
            return Vec::new();
        };
        self.symbols
            .iter()
            .map(|symbol| DecodeEntry {
                decode_date: ctx.execute_day,
                symbol: symbol.clone(),
                fetch_date: ctx.fetch_day,
            })
            .collect()
    }

    /// Restore a saved watchlist. The fetch day is re-derived from the
    /// calendar; the stored one is ignored.
    pub fn load_watchlist(&mut self, watchlist: &Watchlist, today: NaiveDate) -> Result<TimelineContext, SessionError> {
        let ctx = self.set_execute_day(watchlist.execute_day, today)?;
        self.symbols.clear();
        self.add_symbols(&watchlist.symbols)?;
        Ok(ctx)
    }

    /// Snapshot the active context and selection.
    pub fn to_watchlist(&self, name: &str, description: &str) -> Result<Watchlist, SessionError> {
        let ctx = self.context.ok_or(SessionError::NoActiveTimeline)?;
        Ok(Watchlist::from_context(name, description, &ctx, self.symbols.clone()))
    }
}
