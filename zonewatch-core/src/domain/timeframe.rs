//! Candle timeframe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval used for candle requests and as part of the zone key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Timeframe {
    #[serde(rename = "5minute")]
    Minute5,
    #[serde(rename = "10minute")]
    Minute10,
    #[default]
    #[serde(rename = "15minute")]
    Minute15,
    #[serde(rename = "day")]
    Day,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute5 => "5minute",
            Timeframe::Minute10 => "10minute",
            Timeframe::Minute15 => "15minute",
            Timeframe::Day => "day",
        }
    }

    /// Bar length in minutes. A daily bar spans the whole 375-minute session.
    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::Minute5 => 5,
            Timeframe::Minute10 => 10,
            Timeframe::Minute15 => 15,
            Timeframe::Day => 375,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "5minute" => Ok(Timeframe::Minute5),
            "10minute" => Ok(Timeframe::Minute10),
            "15minute" => Ok(Timeframe::Minute15),
            "day" => Ok(Timeframe::Day),
            other => Err(format!(
                "unknown timeframe '{other}'. Valid: 5minute, 10minute, 15minute, day"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_kite_names() {
        for tf in [
            Timeframe::Minute5,
            Timeframe::Minute10,
            Timeframe::Minute15,
            Timeframe::Day,
        ] {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn rejects_unknown() {
        assert!("1hour".parse::<Timeframe>().is_err());
    }

    #[test]
    fn serde_uses_same_names() {
        let json = serde_json::to_string(&Timeframe::Minute15).unwrap();
        assert_eq!(json, "\"15minute\"");
    }
}
