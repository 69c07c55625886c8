//! Particulate (smoke) attenuation.
//!
//! Wildfire smoke attenuates irradiance in discrete tiers of PM2.5
//! concentration. The table is scanned in ascending order and the first
//! tier whose limit is not exceeded supplies the factor; concentrations
//! above every tier fall back to the heaviest attenuation.

use validator::Validate;

use crate::config::{ConfigError, SmokeConfig};

pub struct SmokeTable {
    config: SmokeConfig,
}

impl SmokeTable {
    pub fn new(config: SmokeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Attenuation factor for a PM2.5 concentration, applied to every hour
    /// independently of fog.
    pub fn factor(&self, pm25_ugm3: f64) -> f64 {
        for tier in &self.config.tiers {
            if pm25_ugm3 <= tier.limit_ugm3 {
                return tier.factor;
            }
        }
        self.config.fallback_factor
    }
}
