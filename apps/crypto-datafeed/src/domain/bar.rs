//! Bars and resolutions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// One OHLC(V) data point.
///
/// `time` is the bar open time in milliseconds since the Unix epoch, which is
/// what the chart expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time (ms since epoch).
    pub time: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    /// A bar where open, high, low and close are all `price`.
    #[must_use]
    pub const fn flat(time: i64, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: None,
        }
    }

    /// Fold a price tick into a daily bar series.
    ///
    /// Returns the bar the tick belongs to:
    /// - no previous bar: a flat bar at the UTC day boundary of the tick;
    /// - tick at or past `last.time + DAY_MS`: a flat bar opening at that time;
    /// - otherwise `last` with high, low and close updated.
    #[must_use]
    pub fn apply_daily_tick(last: Option<&Self>, price: f64, tick_time_ms: i64) -> Self {
        let Some(last) = last else {
            return Self::flat(tick_time_ms - tick_time_ms.rem_euclid(DAY_MS), price);
        };

        let next_bar_time = last.time + DAY_MS;
        if tick_time_ms >= next_bar_time {
            return Self::flat(next_bar_time, price);
        }

        Self {
            high: last.high.max(price),
            low: last.low.min(price),
            close: price,
            ..*last
        }
    }
}

/// Requested bar granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// One day.
    Day,
    /// One week.
    Week,
    /// One month.
    Month,
}

impl Resolution {
    /// All resolutions advertised to the chart.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Day, Self::Week, Self::Month]
    }

    /// Chart resolution string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "1D",
            Self::Week => "1W",
            Self::Month => "1M",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsupported resolution string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported resolution: {0}")]
pub struct ResolutionParseError(pub String);

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" | "D" => Ok(Self::Day),
            "1W" | "W" => Ok(Self::Week),
            "1M" | "M" => Ok(Self::Month),
            other => Err(ResolutionParseError(other.to_string())),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const DAY_START: i64 = 1_700_006_400_000; // 2023-11-15T00:00:00Z

    #[test_case("1D", Resolution::Day)]
    #[test_case("D", Resolution::Day)]
    #[test_case("1W", Resolution::Week)]
    #[test_case("W", Resolution::Week)]
    #[test_case("1M", Resolution::Month)]
    #[test_case(" M ", Resolution::Month)]
    fn parse_resolution(input: &str, expected: Resolution) {
        assert_eq!(input.parse::<Resolution>().unwrap(), expected);
    }

    #[test_case("60")]
    #[test_case("1H")]
    #[test_case("")]
    fn parse_unsupported_resolution(input: &str) {
        assert!(input.parse::<Resolution>().is_err());
    }

    #[test]
    fn resolution_serializes_as_chart_string() {
        let json = serde_json::to_string(&Resolution::all()).unwrap();
        assert_eq!(json, r#"["1D","1W","1M"]"#);
        let parsed: Resolution = serde_json::from_str("\"1W\"").unwrap();
        assert_eq!(parsed, Resolution::Week);
    }

    #[test]
    fn bar_omits_missing_volume() {
        let json = serde_json::to_value(Bar::flat(1000, 1.5)).unwrap();
        assert!(json.get("volume").is_none());
        assert_eq!(json["time"], 1000);
        assert_eq!(json["close"], 1.5);
    }

    #[test]
    fn tick_inside_day_updates_bar() {
        let last = Bar {
            time: DAY_START,
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: Some(3.0),
        };

        let higher = Bar::apply_daily_tick(Some(&last), 120.0, DAY_START + 1_000);
        assert_eq!(higher.time, DAY_START);
        assert_eq!(higher.open, 100.0);
        assert_eq!(higher.high, 120.0);
        assert_eq!(higher.low, 90.0);
        assert_eq!(higher.close, 120.0);
        assert_eq!(higher.volume, Some(3.0));

        let lower = Bar::apply_daily_tick(Some(&higher), 80.0, DAY_START + 2_000);
        assert_eq!(lower.high, 120.0);
        assert_eq!(lower.low, 80.0);
        assert_eq!(lower.close, 80.0);
    }

    #[test]
    fn tick_past_day_starts_new_bar() {
        let last = Bar::flat(DAY_START, 100.0);

        let next = Bar::apply_daily_tick(Some(&last), 101.0, DAY_START + DAY_MS);
        assert_eq!(next, Bar::flat(DAY_START + DAY_MS, 101.0));

        // A gap of several days still opens the bar right after the last one.
        let gap = Bar::apply_daily_tick(Some(&last), 99.0, DAY_START + 3 * DAY_MS + 5);
        assert_eq!(gap.time, DAY_START + DAY_MS);
    }

    #[test]
    fn first_tick_without_seed_aligns_to_day() {
        let bar = Bar::apply_daily_tick(None, 42.0, DAY_START + 12_345_678);
        assert_eq!(bar, Bar::flat(DAY_START, 42.0));
    }
}
