//! ZoneWatch Core — trading calendar, timeline, zone extraction, data sources, stores.
//!
//! This crate contains everything below the orchestration layer:
//! - Domain types (candles, zones, decode entries, watchlists)
//! - Trading calendar and execute/fetch day resolution
//! - ATR-based impulse and origin-zone extraction
//! - Candle/price source traits with CSV and synthetic backends, bounded by
//!   timeouts and a circuit breaker
//! - Append-only zone store (SQLite and in-memory engines)

pub mod calendar;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod store;
pub mod timeline;
pub mod zones;

pub use calendar::{parse_date, CalendarError, TradingCalendar};
pub use error::ErrorKind;
pub use timeline::{Mode, TimelineContext, TimelineError, TimelineResolver};
pub use zones::{ExtractorConfig, ZoneExtractor};
