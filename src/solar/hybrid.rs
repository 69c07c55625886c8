//! Physics/nowcast hybrid irradiance.
//!
//! The physics feed models radiation well on average but lags on timing;
//! the cloud-cover signal has the better short horizon. The hybrid trusts
//! the physics baseline when the two agree and lets the cloud signal veto
//! or boost it when they diverge.

use validator::Validate;

use crate::config::{ConfigError, SolarConfig};
use crate::solar::geometry::SolarGeometry;

pub struct HybridSolarModel {
    geometry: SolarGeometry,
    config: SolarConfig,
}

impl HybridSolarModel {
    pub fn new(config: SolarConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let geometry = SolarGeometry::new(config.latitude_deg, config.nominal_peak_wm2);
        Ok(Self { geometry, config })
    }

    pub fn geometry(&self) -> &SolarGeometry {
        &self.geometry
    }

    /// Timing-corrected irradiance estimate in W/m² for one hour.
    ///
    /// A sun below the horizon yields 0 regardless of the physics feed; a
    /// stale positive physics number at night is a timing artifact.
    pub fn irradiance(
        &self,
        physics_radiation_wm2: Option<f64>,
        cloud_cover_percent: f64,
        hour: u32,
        day_of_year: u32,
    ) -> f64 {
        let clear_sky_max = self.geometry.clear_sky_max(hour, day_of_year);
        if clear_sky_max <= 0.0 {
            return 0.0;
        }

        let cloud = cloud_cover_percent.clamp(0.0, 100.0);
        let baseline = match physics_radiation_wm2 {
            Some(radiation) if radiation > 0.0 => radiation,
            _ => clear_sky_max * (1.0 - self.config.fallback_cloud_slope * cloud / 100.0),
        };

        // Heavy cover while the physics model still reports sun: trust the
        // cloud signal's timing and clamp.
        if cloud > self.config.cloud_veto_cover_pct && baseline > self.config.cloud_veto_min_wm2 {
            return baseline * self.config.cloud_veto_factor;
        }
        // Physics models under-estimate genuinely clear days.
        if cloud < self.config.clear_boost_cover_pct {
            return baseline.max(self.config.clear_boost_factor * clear_sky_max);
        }
        // Moderate cover: linear blend, floored so diffuse radiation is
        // never fully eliminated.
        (baseline * (1.0 - self.config.blend_slope * cloud / 100.0))
            .max(baseline * self.config.diffuse_floor)
    }
}
