//! Fetch-day processor: fetch → validate → extract → save, per symbol.
//!
//! Symbols are independent and run on a bounded rayon pool. One symbol's
//! failure never affects the others; every symbol yields an
//! [`ExtractionOutcome`] and outcomes come back in request order.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use zonewatch_core::data::{validate_series, CandleSource, DataError};
use zonewatch_core::domain::{Timeframe, Zone};
use zonewatch_core::error::ErrorKind;
use zonewatch_core::store::ZoneStore;
use zonewatch_core::zones::ZoneExtractor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub symbols: Vec<String>,
    pub fetch_date: NaiveDate,
    pub timeframe: Timeframe,
    /// Leave symbols alone when zones already exist for the key.
    #[serde(default)]
    pub skip_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// A zone was extracted; `inserted` is false when the store already had it.
    Stored { zone: Zone, inserted: bool },
    /// `skip_existing` and the store already holds zones for the key.
    Skipped { existing: usize },
    NoZone,
    NoData { message: String },
    Failed { kind: ErrorKind, message: String },
}

impl ExtractionOutcome {
    fn from_data_error(e: &DataError) -> Self {
        match e.kind() {
            ErrorKind::NoData => ExtractionOutcome::NoData { message: e.to_string() },
            kind => ExtractionOutcome::Failed {
                kind,
                message: e.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExtractionOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExtractionOutcome::Stored { inserted: true, .. } => "stored",
            ExtractionOutcome::Stored { inserted: false, .. } => "already stored",
            ExtractionOutcome::Skipped { .. } => "skipped",
            ExtractionOutcome::NoZone => "no zone",
            ExtractionOutcome::NoData { .. } => "no data",
            ExtractionOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: ExtractionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub fetch_date: NaiveDate,
    pub timeframe: Timeframe,
    pub outcomes: Vec<SymbolOutcome>,
}

impl ExtractionReport {
    /// Zones produced by this run, new or already stored.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            ExtractionOutcome::Stored { zone, .. } => Some(zone),
            _ => None,
        })
    }

    pub fn inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, ExtractionOutcome::Stored { inserted: true, .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failure()).count()
    }
}

/// Progress callback for batch extraction. Called from worker threads.
pub trait ExtractionProgress: Send + Sync {
    /// Called when a symbol starts.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol has an outcome.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, outcome: &ExtractionOutcome);

    /// Called once the whole batch is done.
    fn on_batch_complete(&self, report: &ExtractionReport);
}

/// Discards all progress.
pub struct NoProgress;

impl ExtractionProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _symbol: &str, _index: usize, _total: usize, _outcome: &ExtractionOutcome) {}
    fn on_batch_complete(&self, _report: &ExtractionReport) {}
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl ExtractionProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Extracting {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, outcome: &ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Stored { zone, .. } => println!(
                "  {}: {symbol} {} {:.2}-{:.2} ({})",
                outcome.label(),
                zone.zone_type,
                zone.zone_low,
                zone.zone_high,
                zone.impulse_strength
            ),
            ExtractionOutcome::NoData { message } | ExtractionOutcome::Failed { message, .. } => {
                println!("  {}: {symbol}: {message}", outcome.label())
            }
            _ => println!("  {}: {symbol}", outcome.label()),
        }
    }

    fn on_batch_complete(&self, report: &ExtractionReport) {
        println!(
            "\nExtraction complete: {} symbols, {} new zones, {} failed",
            report.outcomes.len(),
            report.inserted(),
            report.failed()
        );
    }
}

pub struct FetchDayProcessor<'a, Z: ?Sized> {
    candles: &'a dyn CandleSource,
    store: &'a Z,
    extractor: &'a ZoneExtractor,
    max_concurrency: usize,
}

impl<'a, Z: ZoneStore + ?Sized> FetchDayProcessor<'a, Z> {
    pub fn new(
        candles: &'a dyn CandleSource,
        store: &'a Z,
        extractor: &'a ZoneExtractor,
        max_concurrency: usize,
    ) -> Self {
        Self {
            candles,
            store,
            extractor,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn run(&self, request: &ExtractRequest, progress: &dyn ExtractionProgress) -> ExtractionReport {
        let total = request.symbols.len();
        let work = |(index, symbol): (usize, &String)| {
            progress.on_start(symbol, index, total);
            let outcome = self.process_symbol(symbol, request);
            progress.on_complete(symbol, index, total, &outcome);
            SymbolOutcome {
                symbol: symbol.clone(),
                outcome,
            }
        };

        // Build a pool only when parallelism is allowed
        let pool = if self.max_concurrency > 1 && total > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.max_concurrency)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "failed to build extraction pool, running sequentially");
                    None
                }
            }
        } else {
            None
        };

        let outcomes: Vec<SymbolOutcome> = match pool {
            Some(pool) => pool.install(|| request.symbols.par_iter().enumerate().map(work).collect()),
            None => request.symbols.iter().enumerate().map(work).collect(),
        };

        let report = ExtractionReport {
            fetch_date: request.fetch_date,
            timeframe: request.timeframe,
            outcomes,
        };
        info!(
            fetch_date = %report.fetch_date,
            symbols = total,
            inserted = report.inserted(),
            failed = report.failed(),
            "extraction batch complete"
        );
        progress.on_batch_complete(&report);
        report
    }

    fn process_symbol(&self, symbol: &str, request: &ExtractRequest) -> ExtractionOutcome {
        let (date, tf) = (request.fetch_date, request.timeframe);

        if request.skip_existing {
            match self.store.load_zones(symbol, date, tf) {
                Ok(existing) if !existing.is_empty() => {
                    return ExtractionOutcome::Skipped {
                        existing: existing.len(),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    return ExtractionOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            }
        }

        let candles = match self
            .candles
            .candles(symbol, date, tf)
            .and_then(|raw| validate_series(symbol, date, raw))
        {
            Ok(c) => c,
            Err(e) => {
                warn!(symbol, %date, error = %e, "candles unavailable");
                return ExtractionOutcome::from_data_error(&e);
            }
        };

        let Some(zone) = self.extractor.extract(symbol, date, tf, &candles) else {
            info!(symbol, %date, "no qualifying zone");
            return ExtractionOutcome::NoZone;
        };

        match self.store.save_zone(&zone) {
            Ok(saved) => {
                info!(
                    symbol,
                    %date,
                    zone_type = %zone.zone_type,
                    low = zone.zone_low,
                    high = zone.zone_high,
                    strength = %zone.impulse_strength,
                    inserted = saved.is_inserted(),
                    "zone extracted"
                );
                ExtractionOutcome::Stored {
                    zone,
                    inserted: saved.is_inserted(),
                }
            }
            Err(e) => ExtractionOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
