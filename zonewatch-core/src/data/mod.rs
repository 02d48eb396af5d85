//! Market data: source traits, concrete sources, and the guards around them.

pub mod circuit_breaker;
pub mod csv_source;
pub mod ingest;
pub mod provider;
pub mod synthetic;
pub mod timeout;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_source::CsvSource;
pub use ingest::validate_series;
pub use provider::{usable_price, CandleSource, DataError, PriceSource};
pub use synthetic::SyntheticSource;
pub use timeout::{TimeBounded, DEFAULT_FETCH_TIMEOUT};
