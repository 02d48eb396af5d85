//! Request service: the surface a dashboard or CLI talks to.
//!
//! `ZoneService` owns the configuration, timeline resolver, extractor, data
//! sources and store, and answers one request at a time. It holds no
//! timeline state of its own; every call resolves (or receives) the context
//! it works under.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use zonewatch_core::calendar::CalendarError;
use zonewatch_core::data::{
    CandleSource, CsvSource, PriceSource, SyntheticSource, TimeBounded,
};
use zonewatch_core::domain::{normalize_symbols, DecodeEntry, StoredZone, Watchlist};
use zonewatch_core::error::ErrorKind;
use zonewatch_core::store::{SqliteStore, Store, StoreError};
use zonewatch_core::timeline::{TimelineContext, TimelineError, TimelineResolver, FETCH_DAY_LAG};
use zonewatch_core::zones::ZoneExtractor;

use crate::config::{AppConfig, ConfigError, SourceKind};
use crate::extraction::{ExtractRequest, ExtractionProgress, ExtractionReport, FetchDayProcessor};
use crate::monitor::{alerts, ExecuteDayMonitor, MonitorError, MonitorReport};
use crate::session::{MonitorSession, SessionError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("fetch date {given} does not belong to decode date {decode_date} (expected {expected})")]
    FetchDayMismatch {
        decode_date: NaiveDate,
        expected: NaiveDate,
        given: NaiveDate,
    },

    #[error("no watchlist named '{0}'")]
    WatchlistNotFound(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Config(e) => e.kind(),
            ServiceError::Calendar(e) => e.kind(),
            ServiceError::Timeline(e) => e.kind(),
            ServiceError::Store(e) => e.kind(),
            ServiceError::Monitor(e) => e.kind(),
            ServiceError::Session(e) => e.kind(),
            ServiceError::FetchDayMismatch { .. } => ErrorKind::TimelineMismatch,
            ServiceError::WatchlistNotFound(_) => ErrorKind::Store,
        }
    }
}

/// Add `symbols` to the decode list of `decode_date`, against `fetch_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeRequest {
    pub decode_date: NaiveDate,
    pub symbols: Vec<String>,
    pub fetch_date: NaiveDate,
}

/// Result of the combined extract-and-monitor flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackReport {
    pub context: TimelineContext,
    pub extraction: ExtractionReport,
    /// Decode entries that were new.
    pub added: usize,
}

pub struct ZoneService {
    config: AppConfig,
    resolver: TimelineResolver,
    extractor: ZoneExtractor,
    candles: Arc<dyn CandleSource>,
    prices: Arc<dyn PriceSource>,
    store: Arc<dyn Store>,
}

impl ZoneService {
    pub fn new(
        config: AppConfig,
        candles: Arc<dyn CandleSource>,
        prices: Arc<dyn PriceSource>,
        store: Arc<dyn Store>,
    ) -> Self {
        let resolver = TimelineResolver::new(config.calendar.trading_calendar());
        let extractor = ZoneExtractor::new(config.detection.clone());
        Self {
            config,
            resolver,
            extractor,
            candles,
            prices,
            store,
        }
    }

    /// Wire the configured sources (time-bounded) and the SQLite database.
    ///
    /// `today` anchors the CSV source's notion of the live session.
    pub fn from_config(config: AppConfig, today: NaiveDate) -> Result<Self, ServiceError> {
        config.validate()?;
        let store = Arc::new(SqliteStore::open(&config.database_path)?);
        let (candles, prices) = build_sources(&config, today)?;
        Ok(Self::new(config, candles, prices, store))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TimelineResolver {
        &self.resolver
    }

    /// A fresh session bound to this service's calendar.
    pub fn session(&self) -> MonitorSession {
        MonitorSession::new(self.resolver.clone())
    }

    pub fn resolve(&self, execute_day: NaiveDate, today: NaiveDate) -> Result<TimelineContext, ServiceError> {
        Ok(self.resolver.resolve(execute_day, today)?)
    }

    /// Extract and store zones for `symbols` on `fetch_date`.
    pub fn extract(
        &self,
        symbols: &[String],
        fetch_date: NaiveDate,
        progress: &dyn ExtractionProgress,
    ) -> Result<ExtractionReport, ServiceError> {
        self.extract_with(symbols, fetch_date, false, progress)
    }

    fn extract_with(
        &self,
        symbols: &[String],
        fetch_date: NaiveDate,
        skip_existing: bool,
        progress: &dyn ExtractionProgress,
    ) -> Result<ExtractionReport, ServiceError> {
        if !self.resolver.calendar().is_trading_day(fetch_date) {
            return Err(CalendarError::NonTradingDay { date: fetch_date }.into());
        }
        let request = ExtractRequest {
            symbols: normalize_symbols(symbols),
            fetch_date,
            timeframe: self.config.timeframe,
            skip_existing,
        };
        let processor = FetchDayProcessor::new(
            self.candles.as_ref(),
            self.store.as_ref(),
            &self.extractor,
            self.config.data.max_concurrency,
        );
        Ok(processor.run(&request, progress))
    }

    /// The fetch day a decode date monitors against.
    pub fn fetch_day_for(&self, decode_date: NaiveDate) -> Result<NaiveDate, ServiceError> {
        let calendar = self.resolver.calendar();
        if !calendar.is_trading_day(decode_date) {
            return Err(CalendarError::NonTradingDay { date: decode_date }.into());
        }
        Ok(calendar.trading_day_offset(decode_date, -FETCH_DAY_LAG)?)
    }

    /// Insert-or-ignore decode entries. The fetch date must be the one the
    /// calendar derives for the decode date.
    pub fn add_decode_entries(&self, request: &DecodeRequest) -> Result<usize, ServiceError> {
        let expected = self.fetch_day_for(request.decode_date)?;
        if request.fetch_date != expected {
            return Err(ServiceError::FetchDayMismatch {
                decode_date: request.decode_date,
                expected,
                given: request.fetch_date,
            });
        }
        let symbols = normalize_symbols(&request.symbols);
        let added = self
            .store
            .add_decode_entries(request.decode_date, &symbols, request.fetch_date)?;
        info!(decode_date = %request.decode_date, added, requested = symbols.len(), "decode entries added");
        Ok(added)
    }

    pub fn decode_entries(&self, decode_date: NaiveDate) -> Result<Vec<DecodeEntry>, ServiceError> {
        Ok(self.store.decode_entries(decode_date)?)
    }

    /// Resolve `execute_day`, extract zones missing for its fetch day, and
    /// put every symbol on the execute day's decode list.
    pub fn track(
        &self,
        symbols: &[String],
        execute_day: NaiveDate,
        today: NaiveDate,
        progress: &dyn ExtractionProgress,
    ) -> Result<TrackReport, ServiceError> {
        let context = self.resolve(execute_day, today)?;
        let symbols = normalize_symbols(symbols);
        let extraction = self.extract_with(&symbols, context.fetch_day, true, progress)?;
        let added = self
            .store
            .add_decode_entries(context.execute_day, &symbols, context.fetch_day)?;
        Ok(TrackReport {
            context,
            extraction,
            added,
        })
    }

    /// Monitor pass over the decode list of `decode_date` (default: the
    /// current trading day).
    pub fn evaluate(&self, decode_date: Option<NaiveDate>, today: NaiveDate) -> Result<MonitorReport, ServiceError> {
        let decode_date = match decode_date {
            Some(d) => d,
            None => self.resolver.calendar().current_trading_day(today)?,
        };
        let context = self.resolve(decode_date, today)?;
        let entries = self.store.decode_entries(decode_date)?;
        self.evaluate_entries(&context, &entries)
    }

    /// Monitor pass over an in-memory selection.
    pub fn evaluate_session(&self, session: &MonitorSession) -> Result<MonitorReport, ServiceError> {
        let context = *session.context().ok_or(SessionError::NoActiveTimeline)?;
        self.evaluate_entries(&context, &session.decode_entries())
    }

    fn evaluate_entries(&self, context: &TimelineContext, entries: &[DecodeEntry]) -> Result<MonitorReport, ServiceError> {
        let monitor = ExecuteDayMonitor::new(
            self.prices.as_ref(),
            self.store.as_ref(),
            self.config.timeframe,
            &self.config.monitor,
        );
        Ok(monitor.evaluate(context, entries)?)
    }

    pub fn alerts(&self, decode_date: Option<NaiveDate>, today: NaiveDate) -> Result<MonitorReport, ServiceError> {
        Ok(alerts(&self.evaluate(decode_date, today)?))
    }

    pub fn zones(&self, symbol: &str, fetch_day: NaiveDate) -> Result<Vec<StoredZone>, ServiceError> {
        let symbol = symbol.trim().to_uppercase();
        Ok(self.store.load_zones(&symbol, fetch_day, self.config.timeframe)?)
    }

    // ─── Watchlists ─────────────────────────────────────────────────

    pub fn save_watchlist(&self, name: &str, description: &str, session: &MonitorSession) -> Result<Watchlist, ServiceError> {
        let watchlist = session.to_watchlist(name.trim(), description)?;
        self.store.save_watchlist(&watchlist)?;
        info!(name = %watchlist.name, symbols = watchlist.symbols.len(), "watchlist saved");
        Ok(watchlist)
    }

    pub fn list_watchlists(&self) -> Result<Vec<Watchlist>, ServiceError> {
        Ok(self.store.list_watchlists()?)
    }

    /// Load a watchlist into `session`, re-resolving its execute day.
    pub fn load_watchlist(
        &self,
        name: &str,
        session: &mut MonitorSession,
        today: NaiveDate,
    ) -> Result<TimelineContext, ServiceError> {
        let watchlist = self
            .store
            .load_watchlist(name)?
            .ok_or_else(|| ServiceError::WatchlistNotFound(name.to_string()))?;
        Ok(session.load_watchlist(&watchlist, today)?)
    }

    pub fn delete_watchlist(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.store.delete_watchlist(name)?)
    }
}

/// Candle and price sources for the configured backend. Each role gets its
/// own timeout wrapper and circuit breaker.
pub fn build_sources(
    config: &AppConfig,
    today: NaiveDate,
) -> Result<(Arc<dyn CandleSource>, Arc<dyn PriceSource>), ServiceError> {
    let timeout = config.data.fetch_timeout();
    match config.data.source {
        SourceKind::Synthetic => {
            let source = Arc::new(SyntheticSource::new(config.calendar.trading_calendar()));
            Ok((
                Arc::new(TimeBounded::from_arc(Arc::clone(&source), timeout).with_name("synthetic candles")),
                Arc::new(TimeBounded::from_arc(source, timeout).with_name("synthetic prices")),
            ))
        }
        SourceKind::Csv => {
            let live_date = config.calendar.trading_calendar().current_trading_day(today)?;
            let source = Arc::new(
                CsvSource::new(&config.data.data_dir, live_date).with_price_timeframe(config.timeframe),
            );
            Ok((
                Arc::new(TimeBounded::from_arc(Arc::clone(&source), timeout).with_name("csv candles")),
                Arc::new(TimeBounded::from_arc(source, timeout).with_name("csv prices")),
            ))
        }
    }
}
