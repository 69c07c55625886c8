//! Boundary types shared across the consensus and risk layers.
//!
//! Temperatures are normalized to Fahrenheit on ingest; every threshold in
//! the crate (guardrails, variance cutoffs, dew-point depression) is
//! specified in °F. Wind is mph, particulates are PM2.5 µg/m³, irradiance
//! is W/m².

use serde::{Deserialize, Serialize};

/// Unit a raw source reading arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// One named source's reading at one timestamp.
///
/// Absence is a first-class state: a source that is down contributes
/// `value: None` and is excluded from consensus without raising an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReading {
    pub source: String,
    pub value: Option<f64>,
    pub unit: TemperatureUnit,
}

impl SourceReading {
    pub fn fahrenheit(source: impl Into<String>, value: f64) -> Self {
        Self {
            source: source.into(),
            value: Some(value),
            unit: TemperatureUnit::Fahrenheit,
        }
    }

    pub fn celsius(source: impl Into<String>, value: f64) -> Self {
        Self {
            source: source.into(),
            value: Some(value),
            unit: TemperatureUnit::Celsius,
        }
    }

    /// A source that is down for this timestamp.
    pub fn absent(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value: None,
            unit: TemperatureUnit::Fahrenheit,
        }
    }

    /// The reading normalized to °F, if present.
    pub fn value_f(&self) -> Option<f64> {
        self.value.map(|v| match self.unit {
            TemperatureUnit::Fahrenheit => v,
            TemperatureUnit::Celsius => v * 9.0 / 5.0 + 32.0,
        })
    }
}

/// Already-fetched inputs for one hour of one calendar day.
///
/// Covariates arrive unit-normalized from the collaborators that did the
/// fetching; the narrative flag is matched against free-text forecasts
/// upstream and handed in as a boolean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyObservation {
    /// Local hour of day, 0–23.
    pub hour: u32,
    /// Per-source temperature readings for this hour.
    pub readings: Vec<SourceReading>,
    pub dewpoint_f: f64,
    pub wind_mph: f64,
    pub cloud_cover_percent: f64,
    pub pm25_ugm3: f64,
    /// Physics-model shortwave radiation for this hour, if the feed reported one.
    pub physics_radiation_wm2: Option<f64>,
    /// Whether the forecast narrative mentions fog.
    pub narrative_mentions_fog: bool,
}
