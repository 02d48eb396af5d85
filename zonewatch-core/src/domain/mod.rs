//! Domain types for ZoneWatch

pub mod candle;
pub mod decode;
pub mod timeframe;
pub mod zone;

pub use candle::Candle;
pub use decode::{normalize_symbols, DecodeEntry, Watchlist};
pub use timeframe::Timeframe;
pub use zone::{ImpulseStrength, StoredZone, Zone, ZoneKey, ZoneType};
