//! Radiation fog probability.
//!
//! Two clamped linear factors: how close the air is to saturation
//! (dew-point depression) and how still it is (wind stagnation). Their
//! product is the hourly fog probability. A narrative signal from the
//! forecast text can push the probability toward fog, never away from it.

use validator::Validate;

use crate::config::{ConfigError, FogConfig};

pub struct FogModel {
    config: FogConfig,
}

impl FogModel {
    pub fn new(config: FogConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Hourly fog probability, rounded to two decimals.
    ///
    /// The narrative boost only applies when the probability already exceeds
    /// the configured floor, and is capped below certainty.
    pub fn probability(
        &self,
        temp_f: f64,
        dewpoint_f: f64,
        wind_mph: f64,
        narrative_mentions_fog: bool,
    ) -> f64 {
        let c = &self.config;
        let depression_factor =
            (1.0 - (temp_f - dewpoint_f) / c.dewpoint_depression_f).clamp(0.0, 1.0);
        let stagnation_factor = (1.0 - wind_mph / c.wind_stagnation_mph).clamp(0.0, 1.0);
        let mut probability = round2(depression_factor * stagnation_factor);

        if narrative_mentions_fog && probability > c.narrative_floor {
            probability = (probability + c.narrative_boost).min(c.narrative_cap);
        }
        probability
    }

    /// Whether `hour` falls in the pre-dawn lock-in window (inclusive).
    pub fn in_predawn_window(&self, hour: u32) -> bool {
        (self.config.predawn_start_hour..=self.config.predawn_end_hour).contains(&hour)
    }

    /// Pre-dawn probability above which fog locks in for the day.
    pub fn lockin_threshold(&self) -> f64 {
        self.config.lockin_threshold
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FogModel {
        FogModel::new(FogConfig::default()).unwrap()
    }

    #[test]
    fn test_saturated_still_air_is_near_certain_fog() {
        // Temp at dew point, 1 mph wind: depression 1.0, stagnation 0.9.
        let p = model().probability(50.0, 50.0, 1.0, false);
        assert_eq!(p, 0.90);
    }

    #[test]
    fn test_dry_air_cannot_fog() {
        // 5 °F depression zeroes the first factor regardless of wind.
        let p = model().probability(55.0, 50.0, 0.0, false);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_wind_scours_fog_out() {
        let p = model().probability(50.0, 50.0, 10.0, false);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_supersaturation_clamps_to_one() {
        // Temp below dew point clamps the depression factor at 1.
        let p = model().probability(48.0, 50.0, 0.0, false);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_probability_rounded_to_two_decimals() {
        // 0.94 × 0.9 = 0.846 → 0.85
        let p = model().probability(50.3, 50.0, 1.0, false);
        assert_eq!(p, 0.85);
    }

    #[test]
    fn test_narrative_boosts_above_floor() {
        // 0.6 without the narrative, 0.9 with it.
        let without = model().probability(52.0, 50.0, 0.0, false);
        let with = model().probability(52.0, 50.0, 0.0, true);
        assert!((without - 0.60).abs() < 1e-9);
        assert!((with - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_narrative_ignored_below_floor() {
        // 0.5 × 0.5 = 0.25, under the 0.3 floor: the keyword alone is not
        // evidence enough.
        let p = model().probability(52.5, 50.0, 5.0, true);
        assert_eq!(p, 0.25);
    }

    #[test]
    fn test_narrative_boost_capped() {
        let p = model().probability(50.0, 50.0, 0.0, true);
        assert_eq!(p, 0.99);
    }

    #[test]
    fn test_predawn_window_inclusive() {
        let m = model();
        assert!(!m.in_predawn_window(3));
        assert!(m.in_predawn_window(4));
        assert!(m.in_predawn_window(8));
        assert!(!m.in_predawn_window(9));
    }
}
