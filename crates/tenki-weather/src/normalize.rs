//! Reshapes a raw forecast document into uniform per-area records.
//!
//! Upstream sends, per area, independent `weathers`, `winds` and `waves`
//! sequences that may be shorter than `timeDefines` (and `waves` may be
//! absent). `timeDefines` is authoritative: shorter sequences are padded with
//! [`ForecastValue::Missing`], longer ones are cut to its length.

use serde::Deserialize;
use std::iter::FusedIterator;

use tenki_core::ForecastError;

use crate::types::{AreaForecast, ForecastRecord, ForecastValue, RawForecastDocument};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    // Only the first series is read; later ones vary in shape.
    time_series: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeSeries {
    time_defines: Vec<String>,
    areas: Vec<RawArea>,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    area: RawAreaName,
    #[serde(default)]
    weathers: Vec<String>,
    #[serde(default)]
    winds: Vec<String>,
    waves: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawAreaName {
    name: String,
}

/// Structurally validated forecast, ready to be walked area by area.
#[derive(Debug)]
pub struct NormalizedForecast {
    time_defines: Vec<String>,
    areas: Vec<RawArea>,
}

/// Validate the document shape and prepare it for record iteration.
///
/// # Errors
/// `MalformedForecast` if the document is not a non-empty array whose first
/// report carries `timeSeries[0].timeDefines` and `timeSeries[0].areas`.
pub fn normalize(doc: &RawForecastDocument) -> Result<NormalizedForecast, ForecastError> {
    let first = doc
        .as_value()
        .as_array()
        .ok_or_else(|| ForecastError::malformed_forecast("document is not an array"))?
        .first()
        .ok_or_else(|| ForecastError::malformed_forecast("document contains no reports"))?;

    let report = RawReport::deserialize(first)
        .map_err(|e| ForecastError::malformed_forecast(e.to_string()))?;

    let first_series = report
        .time_series
        .into_iter()
        .next()
        .ok_or_else(|| ForecastError::malformed_forecast("report has no timeSeries"))?;
    let series = RawTimeSeries::deserialize(first_series)
        .map_err(|e| ForecastError::malformed_forecast(e.to_string()))?;

    tracing::debug!(
        areas = series.areas.len(),
        steps = series.time_defines.len(),
        "Normalizing forecast"
    );

    Ok(NormalizedForecast {
        time_defines: series.time_defines,
        areas: series.areas,
    })
}

impl NormalizedForecast {
    /// Number of timesteps every area is reshaped to.
    pub fn steps(&self) -> usize {
        self.time_defines.len()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// Per-area record iterators, in document order.
    pub fn areas(&self) -> impl ExactSizeIterator<Item = AreaRecords<'_>> {
        let time_defines = self.time_defines.as_slice();
        self.areas.iter().map(move |area| AreaRecords {
            area_name: &area.area.name,
            time_defines,
            weathers: &area.weathers,
            winds: &area.winds,
            waves: area.waves.as_deref(),
            pos: 0,
        })
    }

    pub fn into_area_forecasts(self) -> Vec<AreaForecast> {
        self.areas()
            .map(|records| AreaForecast {
                area_name: records.area_name().to_string(),
                records: records.collect(),
            })
            .collect()
    }
}

/// Lazy record sequence for one area; yields exactly one record per timestep.
#[derive(Debug)]
pub struct AreaRecords<'a> {
    area_name: &'a str,
    time_defines: &'a [String],
    weathers: &'a [String],
    winds: &'a [String],
    waves: Option<&'a [String]>,
    pos: usize,
}

impl<'a> AreaRecords<'a> {
    pub fn area_name(&self) -> &'a str {
        self.area_name
    }
}

fn value_at(seq: &[String], pos: usize) -> ForecastValue {
    seq.get(pos)
        .map(|text| ForecastValue::Reported(text.clone()))
        .unwrap_or(ForecastValue::Missing)
}

impl Iterator for AreaRecords<'_> {
    type Item = ForecastRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let timestamp = self.time_defines.get(self.pos)?;
        let pos = self.pos;
        self.pos += 1;

        Some(ForecastRecord {
            area_name: self.area_name.to_string(),
            timestamp: timestamp.clone(),
            weather: value_at(self.weathers, pos),
            wind: value_at(self.winds, pos),
            wave: self
                .waves
                .map(|waves| value_at(waves, pos))
                .unwrap_or(ForecastValue::Missing),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.time_defines.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AreaRecords<'_> {}

impl FusedIterator for AreaRecords<'_> {}
