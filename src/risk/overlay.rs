//! Per-hour environmental risk overlay.
//!
//! Combines the fog probability model, the day-scoped lock-in state
//! machine, and the smoke tier table into one evaluation per hour. The
//! overlay holds no hidden state: the caller threads [`EnvironmentalState`]
//! through consecutive hours explicitly, which is what makes the
//! ascending-order requirement visible in the signature.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{ConfigError, FogConfig, OverlayConfig, SmokeConfig};
use crate::risk::fog::FogModel;
use crate::risk::smoke::SmokeTable;

/// Day-scoped state carried across consecutive hourly evaluations.
///
/// Radiation fog that locks in before dawn is treated as persistent stratus
/// until the diurnal cycle resets it: the only transition out of the locked
/// state is the unconditional reset at local midnight. Hours within one day
/// must therefore be evaluated strictly in ascending order; separate days
/// are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalState {
    pub fog_locked_in: bool,
}

/// Per-hour risk classification, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// Covariates for one hour. The temperature is the consensus value; it is
/// absent when no source reported for the hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourConditions {
    pub hour: u32,
    pub temp_f: Option<f64>,
    pub dewpoint_f: f64,
    pub wind_mph: f64,
    pub pm25_ugm3: f64,
    pub narrative_mentions_fog: bool,
}

/// Output of the risk overlay for one hour. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyAnnotation {
    pub fog_probability: f64,
    pub risk: RiskLevel,
    pub solar_raw_wm2: f64,
    pub solar_adjusted_wm2: f64,
    /// Smoke attenuation applied to this hour (1.0 = none).
    pub smoke_factor: f64,
}

pub struct RiskOverlay {
    fog: FogModel,
    smoke: SmokeTable,
    config: OverlayConfig,
}

impl RiskOverlay {
    pub fn new(
        fog: FogConfig,
        smoke: SmokeConfig,
        overlay: OverlayConfig,
    ) -> Result<Self, ConfigError> {
        overlay.validate()?;
        Ok(Self {
            fog: FogModel::new(fog)?,
            smoke: SmokeTable::new(smoke)?,
            config: overlay,
        })
    }

    /// Evaluate one hour, returning the annotation and the state to thread
    /// into the next hour of the same day.
    pub fn evaluate_hour(
        &self,
        conditions: &HourConditions,
        solar_raw_wm2: f64,
        state: EnvironmentalState,
    ) -> (HourlyAnnotation, EnvironmentalState) {
        let mut state = state;
        if conditions.hour == 0 {
            state.fog_locked_in = false;
        }

        // No trusted temperature means no fog claim; the no-data consensus
        // verdict already marks the hour untrustworthy.
        let fog_probability = match conditions.temp_f {
            Some(temp_f) => self.fog.probability(
                temp_f,
                conditions.dewpoint_f,
                conditions.wind_mph,
                conditions.narrative_mentions_fog,
            ),
            None => 0.0,
        };

        if self.fog.in_predawn_window(conditions.hour)
            && fog_probability > self.fog.lockin_threshold()
        {
            state.fog_locked_in = true;
        }

        let smoke_factor = self.smoke.factor(conditions.pm25_ugm3);
        let smoke_adjusted = solar_raw_wm2 * smoke_factor;
        let mut adjusted = smoke_adjusted;

        let risk = if self.in_sun_hours(conditions.hour) {
            let (risk, dampening) = if fog_probability > self.config.fog_critical_threshold {
                (RiskLevel::Critical, Some(self.config.damp_critical))
            } else if state.fog_locked_in {
                (RiskLevel::High, Some(self.config.damp_locked))
            } else if fog_probability > self.config.fog_moderate_threshold {
                (RiskLevel::Moderate, Some(self.config.damp_moderate))
            } else {
                (RiskLevel::Low, None)
            };
            if let Some(factor) = dampening {
                // A weaker effect never re-raises a value a stronger one
                // already reduced.
                adjusted = adjusted.min(smoke_adjusted * factor);
            }
            risk
        } else {
            RiskLevel::Low
        };

        (
            HourlyAnnotation {
                fog_probability,
                risk,
                solar_raw_wm2,
                solar_adjusted_wm2: adjusted,
                smoke_factor,
            },
            state,
        )
    }

    fn in_sun_hours(&self, hour: u32) -> bool {
        (self.config.sun_start_hour..=self.config.sun_end_hour).contains(&hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> RiskOverlay {
        RiskOverlay::new(
            FogConfig::default(),
            SmokeConfig::default(),
            OverlayConfig::default(),
        )
        .unwrap()
    }

    fn foggy(hour: u32) -> HourConditions {
        // Saturated, near-still air: probability 0.9.
        HourConditions {
            hour,
            temp_f: Some(50.0),
            dewpoint_f: 50.0,
            wind_mph: 1.0,
            pm25_ugm3: 10.0,
            narrative_mentions_fog: false,
        }
    }

    fn clear(hour: u32) -> HourConditions {
        HourConditions {
            hour,
            temp_f: Some(70.0),
            dewpoint_f: 40.0,
            wind_mph: 8.0,
            pm25_ugm3: 10.0,
            narrative_mentions_fog: false,
        }
    }

    #[test]
    fn test_predawn_fog_locks_in() {
        let (_, state) = overlay().evaluate_hour(&foggy(5), 0.0, EnvironmentalState::default());
        assert!(state.fog_locked_in);
    }

    #[test]
    fn test_daytime_fog_does_not_lock() {
        // Same probability outside the pre-dawn window leaves state alone.
        let (_, state) = overlay().evaluate_hour(&foggy(11), 500.0, EnvironmentalState::default());
        assert!(!state.fog_locked_in);
    }

    #[test]
    fn test_lock_persists_through_clear_noon() {
        let locked = EnvironmentalState { fog_locked_in: true };
        let (annotation, state) = overlay().evaluate_hour(&clear(12), 500.0, locked);

        assert!(state.fog_locked_in);
        assert_eq!(annotation.risk, RiskLevel::High);
        assert!((annotation.solar_adjusted_wm2 - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_midnight_resets_lock() {
        let locked = EnvironmentalState { fog_locked_in: true };
        let (_, state) = overlay().evaluate_hour(&clear(0), 0.0, locked);
        assert!(!state.fog_locked_in);
    }

    #[test]
    fn test_active_fog_outranks_lock() {
        let locked = EnvironmentalState { fog_locked_in: true };
        let (annotation, _) = overlay().evaluate_hour(&foggy(10), 400.0, locked);

        assert_eq!(annotation.risk, RiskLevel::Critical);
        assert!((annotation.solar_adjusted_wm2 - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_moderate_fog_dampens_gently() {
        // 0.6 probability: MODERATE, 70% retained.
        let conditions = HourConditions {
            hour: 10,
            temp_f: Some(52.0),
            dewpoint_f: 50.0,
            wind_mph: 0.0,
            pm25_ugm3: 10.0,
            narrative_mentions_fog: false,
        };
        let (annotation, _) =
            overlay().evaluate_hour(&conditions, 400.0, EnvironmentalState::default());

        assert_eq!(annotation.risk, RiskLevel::Moderate);
        assert!((annotation.solar_adjusted_wm2 - 280.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_fog_dampening_outside_sun_hours() {
        let (annotation, _) =
            overlay().evaluate_hour(&foggy(15), 300.0, EnvironmentalState::default());

        assert_eq!(annotation.risk, RiskLevel::Low);
        assert_eq!(annotation.solar_adjusted_wm2, 300.0);
    }

    #[test]
    fn test_smoke_applies_at_all_hours() {
        let mut conditions = clear(15);
        conditions.pm25_ugm3 = 60.0;
        let (annotation, _) =
            overlay().evaluate_hour(&conditions, 300.0, EnvironmentalState::default());

        assert_eq!(annotation.smoke_factor, 0.85);
        assert!((annotation.solar_adjusted_wm2 - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoke_composes_before_fog() {
        // 400 × 0.85 smoke × 0.40 lock dampening.
        let mut conditions = clear(12);
        conditions.pm25_ugm3 = 60.0;
        let locked = EnvironmentalState { fog_locked_in: true };
        let (annotation, _) = overlay().evaluate_hour(&conditions, 400.0, locked);

        assert!((annotation.solar_adjusted_wm2 - 136.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_temperature_means_no_fog_claim() {
        let conditions = HourConditions {
            hour: 5,
            temp_f: None,
            dewpoint_f: 50.0,
            wind_mph: 0.0,
            pm25_ugm3: 10.0,
            narrative_mentions_fog: true,
        };
        let (annotation, state) =
            overlay().evaluate_hour(&conditions, 0.0, EnvironmentalState::default());

        assert_eq!(annotation.fog_probability, 0.0);
        assert!(!state.fog_locked_in);
    }

    #[test]
    fn test_full_day_lock_in_sequence() {
        // Hour 5 locks fog in; hour 12 is clear but still HIGH; hour 0 of
        // the next day starts unlocked.
        let overlay = overlay();
        let mut state = EnvironmentalState::default();

        for hour in 0..24 {
            let conditions = if hour == 5 { foggy(5) } else { clear(hour) };
            let (annotation, next) = overlay.evaluate_hour(&conditions, 500.0, state);
            state = next;

            if hour == 12 {
                assert_eq!(annotation.risk, RiskLevel::High);
                assert!((annotation.solar_adjusted_wm2 - 200.0).abs() < 1e-9);
            }
        }
        assert!(state.fog_locked_in);

        let (annotation, next) = overlay.evaluate_hour(&clear(0), 0.0, state);
        assert!(!next.fog_locked_in);
        assert_eq!(annotation.risk, RiskLevel::Low);
    }
}
