//! # skyfuse
//!
//! Multi-source weather consensus and fog/smoke-aware solar irradiance core
//! for a fixed geographic site.
//!
//! The crate fuses independently-sourced hourly readings (temperature, cloud
//! cover, dew point, wind, particulate concentration) into a single trusted
//! temperature per hour, a variance verdict, and a solar irradiance estimate
//! corrected for fog and smoke risk. Fetching, persistence, and report
//! rendering are collaborator concerns: this crate consumes already-parsed
//! numeric series and emits structured results.
//!
//! Entry points:
//! - [`ConsensusEngine`]: weighted robust consensus over named sources
//! - [`RiskOverlay`]: per-hour fog/smoke classification and dampening
//! - [`HybridSolarModel`]: physics/nowcast hybrid irradiance
//! - [`DayPipeline`]: sequences the three over one calendar day

pub mod config;
pub mod consensus;
pub mod domain;
pub mod engine;
pub mod risk;
pub mod solar;

pub use config::{Config, ConfigError};
pub use consensus::{ConsensusEngine, ConsensusResult, OutlierFlag, VarianceLevel};
pub use domain::{HourlyObservation, SourceReading, TemperatureUnit};
pub use engine::{DailyExtremes, DayPipeline, HourlyReport, PipelineError};
pub use risk::{EnvironmentalState, HourConditions, HourlyAnnotation, RiskLevel, RiskOverlay};
pub use solar::{HybridSolarModel, SolarGeometry};
