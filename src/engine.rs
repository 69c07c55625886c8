//! Day pipeline.
//!
//! Sequences the consensus engine, the hybrid solar model, and the risk
//! overlay over one calendar day of hourly observations, threading the
//! fog lock-in state hour to hour. This is the only layer that logs;
//! the pure components below it carry their diagnostics in their results.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::consensus::{ConsensusEngine, ConsensusResult, VarianceLevel};
use crate::domain::{HourlyObservation, SourceReading};
use crate::risk::{EnvironmentalState, HourConditions, HourlyAnnotation, RiskOverlay};
use crate::solar::HybridSolarModel;

/// The lock-in state machine is order-dependent, so a day's hours are
/// rejected up front unless they are valid and strictly ascending.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("hours must be strictly ascending within a day: {previous} followed by {current}")]
    OutOfOrder { previous: u32, current: u32 },
    #[error("hour {0} is out of range (0-23)")]
    HourOutOfRange(u32),
}

/// One annotated hour, owned by the caller once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyReport {
    pub hour: u32,
    pub consensus: ConsensusResult,
    pub annotation: HourlyAnnotation,
}

/// Consensus over per-source daily extremes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyExtremes {
    pub high: ConsensusResult,
    pub low: ConsensusResult,
}

pub struct DayPipeline {
    consensus: ConsensusEngine,
    solar: HybridSolarModel,
    overlay: RiskOverlay,
}

impl DayPipeline {
    /// Build the full pipeline from a validated configuration.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Ok(Self {
            consensus: ConsensusEngine::new(config.consensus)?,
            solar: HybridSolarModel::new(config.solar)?,
            overlay: RiskOverlay::new(config.fog, config.smoke, config.overlay)?,
        })
    }

    pub fn consensus(&self) -> &ConsensusEngine {
        &self.consensus
    }

    pub fn solar(&self) -> &HybridSolarModel {
        &self.solar
    }

    pub fn overlay(&self) -> &RiskOverlay {
        &self.overlay
    }

    /// Annotate one calendar day of observations.
    ///
    /// Hours must be strictly ascending; separate days are independent and
    /// may be processed in parallel by the caller.
    pub fn annotate_day(
        &self,
        day_of_year: u32,
        hours: &[HourlyObservation],
        designated_primary: &str,
    ) -> Result<Vec<HourlyReport>, PipelineError> {
        let mut previous: Option<u32> = None;
        for observation in hours {
            if observation.hour > 23 {
                return Err(PipelineError::HourOutOfRange(observation.hour));
            }
            if let Some(previous) = previous {
                if observation.hour <= previous {
                    return Err(PipelineError::OutOfOrder {
                        previous,
                        current: observation.hour,
                    });
                }
            }
            previous = Some(observation.hour);
        }

        let mut state = EnvironmentalState::default();
        let mut reports = Vec::with_capacity(hours.len());
        for observation in hours {
            let consensus = self
                .consensus
                .compute(&observation.readings, designated_primary);

            if consensus.value.is_none() {
                warn!(hour = observation.hour, "no source reported; emitting no-data verdict");
            } else if consensus.variance == VarianceLevel::Critical {
                warn!(
                    hour = observation.hour,
                    spread = consensus.spread,
                    "critical disagreement between sources"
                );
            }
            if consensus.diagnostics.veto.triggered {
                warn!(
                    hour = observation.hour,
                    primary = designated_primary,
                    deviation = consensus.diagnostics.veto.primary_deviation,
                    "primary source vetoed by peer median"
                );
            }

            let solar_raw = self.solar.irradiance(
                observation.physics_radiation_wm2,
                observation.cloud_cover_percent,
                observation.hour,
                day_of_year,
            );
            let conditions = HourConditions {
                hour: observation.hour,
                temp_f: consensus.value,
                dewpoint_f: observation.dewpoint_f,
                wind_mph: observation.wind_mph,
                pm25_ugm3: observation.pm25_ugm3,
                narrative_mentions_fog: observation.narrative_mentions_fog,
            };
            let (annotation, next_state) = self.overlay.evaluate_hour(&conditions, solar_raw, state);
            state = next_state;

            debug!(
                hour = observation.hour,
                value = ?consensus.value,
                risk = %annotation.risk,
                audit = %serde_json::to_string(&consensus.diagnostics).unwrap_or_default(),
                "hour annotated"
            );
            reports.push(HourlyReport {
                hour: observation.hour,
                consensus,
                annotation,
            });
        }
        Ok(reports)
    }

    /// Same as [`annotate_day`](Self::annotate_day), keyed by calendar date.
    pub fn annotate_date(
        &self,
        date: NaiveDate,
        hours: &[HourlyObservation],
        designated_primary: &str,
    ) -> Result<Vec<HourlyReport>, PipelineError> {
        self.annotate_day(date.ordinal(), hours, designated_primary)
    }

    /// Consensus over each source's reported daily high and low.
    pub fn daily_extremes(
        &self,
        highs: &[SourceReading],
        lows: &[SourceReading],
        designated_primary: &str,
    ) -> DailyExtremes {
        DailyExtremes {
            high: self.consensus.compute(highs, designated_primary),
            low: self.consensus.compute(lows, designated_primary),
        }
    }
}
