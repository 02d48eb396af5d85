//! Application configuration (`zonewatch.toml`).
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration. Detection parameters reuse the core
//! [`ExtractorConfig`] under `[detection]`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use zonewatch_core::calendar::TradingCalendar;
use zonewatch_core::domain::Timeframe;
use zonewatch_core::error::ErrorKind;
use zonewatch_core::zones::ExtractorConfig;

use crate::monitor::MonitorConfig;

pub const DEFAULT_CONFIG_FILE: &str = "zonewatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

/// Which backend answers candle and price requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Synthetic,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: SourceKind,
    /// Root of the CSV layout (`csv` source only).
    pub data_dir: PathBuf,
    pub fetch_timeout_ms: u64,
    /// Upper bound on symbols extracted in parallel.
    pub max_concurrency: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            data_dir: PathBuf::from("data"),
            fetch_timeout_ms: 10_000,
            max_concurrency: 4,
        }
    }
}

impl DataConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// `holidays` replaces the built-in NSE 2026 list when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub holidays: Option<Vec<NaiveDate>>,
}

impl CalendarConfig {
    pub fn trading_calendar(&self) -> TradingCalendar {
        match &self.holidays {
            Some(days) => TradingCalendar::new(days.iter().copied()),
            None => TradingCalendar::nse_2026(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub timeframe: Timeframe,
    pub detection: ExtractorConfig,
    pub monitor: MonitorConfig,
    pub data: DataConfig,
    pub calendar: CalendarConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("trading_zones.db"),
            timeframe: Timeframe::Minute15,
            detection: ExtractorConfig::default(),
            monitor: MonitorConfig::default(),
            data: DataConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[detection] {e}")))?;
        let near = self.monitor.near_zone_percent;
        if !(near.is_finite() && near >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "[monitor] near_zone_percent must be >= 0, got {near}"
            )));
        }
        if self.data.max_concurrency == 0 {
            return Err(ConfigError::Invalid("[data] max_concurrency must be at least 1".into()));
        }
        if self.data.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("[data] fetch_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
