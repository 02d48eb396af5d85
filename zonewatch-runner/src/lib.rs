//! ZoneWatch Runner — configuration, batch extraction, monitoring and the
//! request service.
//!
//! This crate builds on `zonewatch-core` to provide:
//! - `zonewatch.toml` loading with defaults for every field
//! - Fetch-day batch extraction over a bounded worker pool
//! - Execute-day monitoring (status, distance, reaction per decode entry)
//! - A monitoring session that keeps decode entries on one timeline
//! - `ZoneService`, the single entry point used by the CLI

pub mod config;
pub mod extraction;
pub mod monitor;
pub mod service;
pub mod session;

pub use config::{AppConfig, CalendarConfig, ConfigError, DataConfig, SourceKind, DEFAULT_CONFIG_FILE};
pub use extraction::{
    ExtractRequest, ExtractionOutcome, ExtractionProgress, ExtractionReport, FetchDayProcessor,
    NoProgress, StdoutProgress, SymbolOutcome,
};
pub use monitor::{
    alerts, classify, distance_percent, ExecuteDayMonitor, MonitorConfig, MonitorError,
    MonitorReport, MonitorRow, MonitorStatus, Reaction,
};
pub use service::{build_sources, DecodeRequest, ServiceError, TrackReport, ZoneService};
pub use session::{MonitorSession, SessionError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn service_is_send_sync() {
        assert_send::<ZoneService>();
        assert_sync::<ZoneService>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<ExtractionReport>();
        assert_sync::<ExtractionReport>();
        assert_send::<MonitorReport>();
        assert_sync::<MonitorReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AppConfig>();
        assert_sync::<AppConfig>();
        assert_send::<MonitorSession>();
        assert_sync::<MonitorSession>();
    }
}
