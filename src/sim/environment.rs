//! Environment snapshot handed to sources and efficiency models each tick.

/// Environmental conditions at the settlement for one tick.
///
/// `irradiance` is the top-of-atmosphere flux on a horizontal surface; the
/// optical efficiency model applies atmospheric attenuation from `opacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSnapshot {
    /// Instantaneous solar irradiance (W/m²).
    pub irradiance: f64,
    /// Mean irradiance over the current sol (W/m²).
    pub mean_irradiance: f64,
    /// Cosine of the solar zenith angle (0 at night).
    pub cos_zenith: f64,
    /// Wind speed at the reference height (m/s).
    pub wind_speed: f64,
    /// Mean wind speed over the current sol (m/s).
    pub mean_wind_speed: f64,
    /// Atmospheric optical depth.
    pub opacity: f64,
    /// Areothermal potential at the site (percent).
    pub areothermal_potential: f64,
    /// Whether a dust storm is active.
    pub dust_storm: bool,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            irradiance: 0.0,
            mean_irradiance: 0.0,
            cos_zenith: 0.0,
            wind_speed: 0.0,
            mean_wind_speed: 0.0,
            opacity: 0.5,
            areothermal_potential: 0.0,
            dust_storm: false,
        }
    }
}

impl EnvironmentSnapshot {
    /// Clear midday conditions with the given irradiance.
    pub fn midday(irradiance: f64) -> Self {
        Self {
            irradiance,
            mean_irradiance: irradiance / std::f64::consts::PI,
            cos_zenith: 1.0,
            ..Self::default()
        }
    }

    /// Night with no wind.
    pub fn night() -> Self {
        Self::default()
    }

    /// Returns a copy with the given wind speed (instant and mean).
    pub fn with_wind(mut self, wind_speed: f64) -> Self {
        self.wind_speed = wind_speed;
        self.mean_wind_speed = wind_speed;
        self
    }

    /// Returns a copy with the given optical depth.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Returns a copy with the given areothermal potential.
    pub fn with_areothermal(mut self, potential: f64) -> Self {
        self.areothermal_potential = potential;
        self
    }

    /// Returns a copy flagged as a dust storm.
    pub fn with_dust_storm(mut self, active: bool) -> Self {
        self.dust_storm = active;
        self
    }
}
