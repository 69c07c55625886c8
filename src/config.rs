//! Deployment configuration.
//!
//! Loaded once at startup from `config/default.toml` with a
//! `SKYFUSE__`-prefixed environment overlay, then validated. Every guardrail
//! threshold, window bound, and tier table is overridable without code
//! changes; validation fails fast with a descriptive error rather than
//! letting an inverted threshold produce nonsense results mid-run.

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Construction-time configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub consensus: ConsensusConfig,
    #[validate(nested)]
    pub fog: FogConfig,
    #[validate(nested)]
    pub smoke: SmokeConfig,
    #[validate(nested)]
    pub overlay: OverlayConfig,
    #[validate(nested)]
    pub solar: SolarConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SKYFUSE__").split("__"));
        let config: Self = figment
            .extract()
            .context("failed to load skyfuse configuration")?;
        config
            .validate()
            .context("invalid skyfuse configuration")?;
        Ok(config)
    }
}

/// Weighted consensus engine settings. All temperatures in °F.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_consensus"))]
pub struct ConsensusConfig {
    /// Static per-source base weights. Never mutated at evaluation time; the
    /// veto guardrail derives a transient working copy per call.
    #[validate(custom(function = "validate_weights"))]
    pub weights: BTreeMap<String, f64>,
    /// Weight assumed for a source missing from the table.
    #[validate(range(min = 0.0))]
    pub default_weight: f64,
    /// Primary deviation from the peer median beyond which the veto demotes
    /// the primary's effective weight to `veto_mid_floor`.
    #[validate(range(min = 0.0))]
    pub veto_moderate_f: f64,
    /// Deviation beyond which the primary is demoted to `veto_low_floor`.
    #[validate(range(min = 0.0))]
    pub veto_critical_f: f64,
    #[validate(range(min = 0.0))]
    pub veto_mid_floor: f64,
    #[validate(range(min = 0.0))]
    pub veto_low_floor: f64,
    /// Standard-deviation multiplier for flag-only outlier detection.
    pub outlier_stdev_k: f64,
    /// Spread below this is LOW variance.
    pub variance_low_f: f64,
    /// Spread at or above this is CRITICAL variance.
    pub variance_critical_f: f64,
    /// Scale constant for the agreement-to-confidence transform.
    pub confidence_scale_f: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("nowcast".to_string(), 5.0);
        weights.insert("nws".to_string(), 3.0);
        weights.insert("openweather".to_string(), 3.0);
        weights.insert("tomorrow".to_string(), 2.0);
        weights.insert("visualcrossing".to_string(), 1.0);
        Self {
            weights,
            default_weight: 1.0,
            veto_moderate_f: 6.0,
            veto_critical_f: 10.0,
            veto_mid_floor: 2.0,
            veto_low_floor: 0.5,
            outlier_stdev_k: 2.0,
            variance_low_f: 5.0,
            variance_critical_f: 10.0,
            confidence_scale_f: 2.0,
        }
    }
}

impl ConsensusConfig {
    /// Base weight for a source, falling back to `default_weight`.
    pub fn weight_for(&self, source: &str) -> f64 {
        self.weights
            .get(source)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Radiation fog model settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_fog"))]
pub struct FogConfig {
    /// Dew-point depression (°F) at which the depression factor reaches zero.
    pub dewpoint_depression_f: f64,
    /// Wind speed (mph) at which the stagnation factor reaches zero.
    pub wind_stagnation_mph: f64,
    /// Narrative fog keywords only boost a probability already above this
    /// empirically tuned cutoff.
    #[validate(range(min = 0.0, max = 1.0))]
    pub narrative_floor: f64,
    /// Fixed increment applied when the narrative reports fog.
    #[validate(range(min = 0.0, max = 1.0))]
    pub narrative_boost: f64,
    /// Ceiling for the boosted probability.
    #[validate(range(min = 0.0, max = 1.0))]
    pub narrative_cap: f64,
    /// Pre-dawn probability above which fog locks in for the day.
    #[validate(range(min = 0.0, max = 1.0))]
    pub lockin_threshold: f64,
    /// Pre-dawn window bounds, inclusive local hours.
    #[validate(range(max = 23))]
    pub predawn_start_hour: u32,
    #[validate(range(max = 23))]
    pub predawn_end_hour: u32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            dewpoint_depression_f: 5.0,
            wind_stagnation_mph: 10.0,
            narrative_floor: 0.3,
            narrative_boost: 0.3,
            narrative_cap: 0.99,
            lockin_threshold: 0.8,
            predawn_start_hour: 4,
            predawn_end_hour: 8,
        }
    }
}

/// One particulate attenuation tier: the first tier whose limit is not
/// exceeded supplies the factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeTier {
    pub limit_ugm3: f64,
    pub factor: f64,
}

/// Smoke attenuation tier table, scanned in ascending concentration order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_smoke"))]
pub struct SmokeConfig {
    pub tiers: Vec<SmokeTier>,
    /// Factor applied above every tier limit.
    pub fallback_factor: f64,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                SmokeTier { limit_ugm3: 25.0, factor: 1.0 },
                SmokeTier { limit_ugm3: 50.0, factor: 0.95 },
                SmokeTier { limit_ugm3: 100.0, factor: 0.85 },
                SmokeTier { limit_ugm3: 200.0, factor: 0.70 },
            ],
            fallback_factor: 0.50,
        }
    }
}

/// Risk classification and dampening settings for the per-hour overlay.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_overlay"))]
pub struct OverlayConfig {
    /// Sun-hours window bounds, inclusive local hours. Fog dampening only
    /// applies inside this window.
    #[validate(range(max = 23))]
    pub sun_start_hour: u32,
    #[validate(range(max = 23))]
    pub sun_end_hour: u32,
    /// Probability above which the hour is CRITICAL (active fog).
    #[validate(range(min = 0.0, max = 1.0))]
    pub fog_critical_threshold: f64,
    /// Probability above which an unlocked hour is MODERATE.
    #[validate(range(min = 0.0, max = 1.0))]
    pub fog_moderate_threshold: f64,
    /// Fraction of baseline irradiance retained under active fog.
    pub damp_critical: f64,
    /// Fraction retained under persistent stratus (locked-in fog).
    pub damp_locked: f64,
    /// Fraction retained at moderate fog risk.
    pub damp_moderate: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            sun_start_hour: 8,
            sun_end_hour: 13,
            fog_critical_threshold: 0.85,
            fog_moderate_threshold: 0.5,
            damp_critical: 0.15,
            damp_locked: 0.40,
            damp_moderate: 0.70,
        }
    }
}

/// Site geometry and hybrid irradiance settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_solar"))]
pub struct SolarConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude_deg: f64,
    /// Nominal clear-sky peak irradiance before seasonal scaling, W/m².
    pub nominal_peak_wm2: f64,
    /// Cloud cover above which the cloud sensor can veto the physics model.
    #[validate(range(min = 0.0, max = 100.0))]
    pub cloud_veto_cover_pct: f64,
    /// The veto only fires when the physics baseline still reports more than
    /// this (a timing mismatch, not genuine sun).
    #[validate(range(min = 0.0))]
    pub cloud_veto_min_wm2: f64,
    /// Fraction of baseline retained when the cloud veto fires.
    pub cloud_veto_factor: f64,
    /// Cloud cover below which the clear-sky boost applies.
    #[validate(range(min = 0.0, max = 100.0))]
    pub clear_boost_cover_pct: f64,
    /// Fraction of clear-sky max the baseline is raised to on clear days.
    pub clear_boost_factor: f64,
    /// Linear attenuation slope for the moderate-cloud blend.
    pub blend_slope: f64,
    /// Diffuse radiation floor as a fraction of baseline.
    pub diffuse_floor: f64,
    /// Linear cloud penalty used when the physics feed is absent.
    pub fallback_cloud_slope: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            // Sacramento, CA: tule fog in winter, wildfire smoke in summer.
            latitude_deg: 38.58,
            nominal_peak_wm2: 1000.0,
            cloud_veto_cover_pct: 80.0,
            cloud_veto_min_wm2: 200.0,
            cloud_veto_factor: 0.30,
            clear_boost_cover_pct: 10.0,
            clear_boost_factor: 0.90,
            blend_slope: 0.5,
            diffuse_floor: 0.30,
            fallback_cloud_slope: 0.75,
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_weights(weights: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    for (source, weight) in weights {
        if *weight < 0.0 || !weight.is_finite() {
            let mut error = invalid("negative_weight", "source weights must be finite and nonnegative");
            error.add_param("source".into(), source);
            return Err(error);
        }
    }
    Ok(())
}

fn validate_consensus(config: &ConsensusConfig) -> Result<(), ValidationError> {
    if config.veto_moderate_f >= config.veto_critical_f {
        return Err(invalid(
            "veto_thresholds",
            "moderate veto threshold must be below the critical threshold",
        ));
    }
    if config.veto_low_floor > config.veto_mid_floor {
        return Err(invalid(
            "veto_floors",
            "low veto floor must not exceed the mid floor",
        ));
    }
    if config.outlier_stdev_k <= 0.0 {
        return Err(invalid("outlier_k", "outlier stdev multiplier must be positive"));
    }
    if config.variance_low_f <= 0.0 || config.variance_low_f >= config.variance_critical_f {
        return Err(invalid(
            "variance_cutoffs",
            "variance cutoffs must satisfy 0 < low < critical",
        ));
    }
    if config.confidence_scale_f <= 0.0 {
        return Err(invalid("confidence_scale", "confidence scale must be positive"));
    }
    Ok(())
}

fn validate_fog(config: &FogConfig) -> Result<(), ValidationError> {
    if config.dewpoint_depression_f <= 0.0 {
        return Err(invalid(
            "dewpoint_depression",
            "dew-point depression threshold must be positive",
        ));
    }
    if config.wind_stagnation_mph <= 0.0 {
        return Err(invalid(
            "wind_stagnation",
            "wind stagnation threshold must be positive",
        ));
    }
    if config.predawn_start_hour > config.predawn_end_hour {
        return Err(invalid(
            "predawn_window",
            "pre-dawn window start must not be after its end",
        ));
    }
    Ok(())
}

fn validate_smoke(config: &SmokeConfig) -> Result<(), ValidationError> {
    let mut previous = f64::NEG_INFINITY;
    for tier in &config.tiers {
        if tier.limit_ugm3 <= previous {
            return Err(invalid(
                "smoke_tiers",
                "smoke tier limits must be strictly ascending",
            ));
        }
        if tier.factor <= 0.0 || tier.factor > 1.0 {
            return Err(invalid(
                "smoke_factor",
                "smoke factors must be in (0, 1]",
            ));
        }
        previous = tier.limit_ugm3;
    }
    if config.fallback_factor <= 0.0 || config.fallback_factor > 1.0 {
        return Err(invalid(
            "smoke_fallback",
            "smoke fallback factor must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_overlay(config: &OverlayConfig) -> Result<(), ValidationError> {
    if config.sun_start_hour > config.sun_end_hour {
        return Err(invalid(
            "sun_window",
            "sun-hours window start must not be after its end",
        ));
    }
    if config.fog_moderate_threshold >= config.fog_critical_threshold {
        return Err(invalid(
            "fog_thresholds",
            "moderate fog threshold must be below the critical threshold",
        ));
    }
    for damp in [config.damp_critical, config.damp_locked, config.damp_moderate] {
        if damp <= 0.0 || damp > 1.0 {
            return Err(invalid(
                "damp_factor",
                "dampening factors must be in (0, 1]",
            ));
        }
    }
    Ok(())
}

fn validate_solar(config: &SolarConfig) -> Result<(), ValidationError> {
    if config.nominal_peak_wm2 <= 0.0 {
        return Err(invalid("nominal_peak", "nominal peak irradiance must be positive"));
    }
    for factor in [
        config.cloud_veto_factor,
        config.clear_boost_factor,
        config.diffuse_floor,
    ] {
        if factor <= 0.0 || factor > 1.0 {
            return Err(invalid(
                "solar_factor",
                "solar scaling factors must be in (0, 1]",
            ));
        }
    }
    if config.blend_slope < 0.0 || config.blend_slope > 1.0 {
        return Err(invalid("blend_slope", "blend slope must be in [0, 1]"));
    }
    if config.fallback_cloud_slope < 0.0 || config.fallback_cloud_slope > 1.0 {
        return Err(invalid(
            "fallback_slope",
            "fallback cloud slope must be in [0, 1]",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_inverted_veto_thresholds_rejected() {
        let config = ConsensusConfig {
            veto_moderate_f: 10.0,
            veto_critical_f: 6.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = ConsensusConfig::default();
        config.weights.insert("bad".to_string(), -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_variance_cutoffs_rejected() {
        let config = ConsensusConfig {
            variance_low_f: 12.0,
            variance_critical_f: 10.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_ascending_smoke_tiers_rejected() {
        let config = SmokeConfig {
            tiers: vec![
                SmokeTier { limit_ugm3: 50.0, factor: 1.0 },
                SmokeTier { limit_ugm3: 25.0, factor: 0.9 },
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_sun_window_rejected() {
        let config = OverlayConfig {
            sun_start_hour: 14,
            sun_end_hour: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_latitude_out_of_range_rejected() {
        let config = SolarConfig {
            latitude_deg: 95.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_default_file() {
        let config = Config::load().unwrap();
        assert!((config.solar.latitude_deg - 38.58).abs() < 1e-9);
        assert_eq!(config.smoke.tiers.len(), 4);
    }
}
