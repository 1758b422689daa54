use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Placeholder shown for weather/wind steps the upstream document omitted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder shown for wave steps the upstream document omitted ("none").
pub const NO_WAVE_DATA: &str = "なし";

/// Top-level administrative grouping (a forecast "center").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// Office whose forecast can be fetched individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub code: String,
    pub name: String,
    pub parent_region_code: String,
}

/// A single forecast value: either what upstream sent, or padding.
///
/// Padding renders as a sentinel string, but stays distinguishable from an
/// upstream value that happens to spell the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastValue {
    Reported(String),
    Missing,
}

impl ForecastValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_reported(&self) -> Option<&str> {
        match self {
            Self::Reported(text) => Some(text),
            Self::Missing => None,
        }
    }

    /// Text for display/storage, substituting `sentinel` for padding.
    pub fn text_or<'a>(&'a self, sentinel: &'static str) -> Cow<'a, str> {
        match self {
            Self::Reported(text) => Cow::Borrowed(text),
            Self::Missing => Cow::Borrowed(sentinel),
        }
    }
}

impl From<String> for ForecastValue {
    fn from(text: String) -> Self {
        Self::Reported(text)
    }
}

impl From<&str> for ForecastValue {
    fn from(text: &str) -> Self {
        Self::Reported(text.to_string())
    }
}

/// One normalized (area, timestep) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub area_name: String,
    pub timestamp: String,
    pub weather: ForecastValue,
    pub wind: ForecastValue,
    pub wave: ForecastValue,
}

impl ForecastRecord {
    pub fn weather_text(&self) -> Cow<'_, str> {
        self.weather.text_or(NOT_AVAILABLE)
    }

    pub fn wind_text(&self) -> Cow<'_, str> {
        self.wind.text_or(NOT_AVAILABLE)
    }

    pub fn wave_text(&self) -> Cow<'_, str> {
        self.wave.text_or(NO_WAVE_DATA)
    }
}

/// All records for one forecast area, in timestep order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaForecast {
    pub area_name: String,
    pub records: Vec<ForecastRecord>,
}

impl AreaForecast {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Forecast document exactly as the server returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastDocument(pub serde_json::Value);

impl RawForecastDocument {
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Display for RawForecastDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(weather: ForecastValue, wave: ForecastValue) -> ForecastRecord {
        ForecastRecord {
            area_name: "Tokyo".to_string(),
            timestamp: "2024-01-01T00:00:00".to_string(),
            weather,
            wind: ForecastValue::Missing,
            wave,
        }
    }

    #[test]
    fn test_missing_values_render_field_sentinels() {
        let r = record(ForecastValue::Missing, ForecastValue::Missing);
        assert_eq!(r.weather_text(), "N/A");
        assert_eq!(r.wind_text(), "N/A");
        assert_eq!(r.wave_text(), "なし");
    }

    #[test]
    fn test_reported_sentinel_text_is_not_missing() {
        let r = record(ForecastValue::from("N/A"), ForecastValue::from("0.5m"));
        assert!(!r.weather.is_missing());
        assert_eq!(r.weather.as_reported(), Some("N/A"));
        assert_eq!(r.wave_text(), "0.5m");
    }
}
