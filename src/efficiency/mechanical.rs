use rand::rngs::StdRng;

use crate::sim::environment::EnvironmentSnapshot;

use super::{
    DEFAULT_MAX_SOILING, DEPOSITION_PER_SOL, EfficiencyModel, STORM_DEPOSITION_MULTIPLIER,
    sanitize_max_soiling, sanitize_sols,
};

/// Wind speed above which gusts lift dust off the panels (m/s).
pub const GUST_THRESHOLD: f64 = 12.0;
/// Self-cleaning decay per m/s above the gust threshold per sol.
pub const WIND_CLEANING_COEFFICIENT: f64 = 0.05;

/// Dust accumulation cleared by strong wind and by crews with brushes.
///
/// `efficiency = 1 - soiling`
#[derive(Debug, Clone)]
pub struct WindCleaning {
    soiling: f64,
    max_soiling: f64,
}

impl Default for WindCleaning {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOILING)
    }
}

impl WindCleaning {
    pub fn new(max_soiling: f64) -> Self {
        Self {
            soiling: 0.0,
            max_soiling: sanitize_max_soiling(max_soiling),
        }
    }

    pub fn soiling(&self) -> f64 {
        self.soiling
    }

    pub fn max_soiling(&self) -> f64 {
        self.max_soiling
    }

    /// Crew cleaning.
    ///
    /// Removes `clamp(brushing_millisols × throughput_per_millisol, 0, 1)` of
    /// the current soiling.
    ///
    /// # Returns
    ///
    /// Fraction of soiling removed
    pub fn manual_clean(&mut self, brushing_millisols: f64, throughput_per_millisol: f64) -> f64 {
        let fraction = brushing_millisols * throughput_per_millisol;
        if !fraction.is_finite() {
            return 0.0;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.soiling *= 1.0 - fraction;
        fraction
    }
}

impl EfficiencyModel for WindCleaning {
    fn efficiency(&self) -> f64 {
        let eff = 1.0 - self.soiling;
        if eff.is_finite() { eff.clamp(0.0, 1.0) } else { 1.0 }
    }

    fn advance(&mut self, env: &EnvironmentSnapshot, elapsed_sols: f64, _rng: &mut StdRng) {
        let Some(sols) = sanitize_sols(elapsed_sols) else {
            return;
        };

        let rate = if env.dust_storm {
            DEPOSITION_PER_SOL * STORM_DEPOSITION_MULTIPLIER
        } else {
            DEPOSITION_PER_SOL
        };
        self.soiling = (self.soiling + rate * sols).min(self.max_soiling);

        let wind = env.wind_speed;
        if wind.is_finite() && wind > GUST_THRESHOLD {
            let decay = (-WIND_CLEANING_COEFFICIENT * (wind - GUST_THRESHOLD) * sols).exp();
            self.soiling *= decay;
        }
    }
}
