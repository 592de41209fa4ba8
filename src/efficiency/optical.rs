use rand::{Rng, rngs::StdRng};

use crate::sim::environment::EnvironmentSnapshot;
use crate::sources::types::gaussian_noise;

use super::{
    DEFAULT_MAX_SOILING, DEPOSITION_PER_SOL, EfficiencyModel, STORM_DEPOSITION_MULTIPLIER,
    sanitize_max_soiling, sanitize_sols,
};

/// Probability per sol that wind or a dust devil cleans the panels.
pub const CLEANING_PROBABILITY_PER_SOL: f64 = 0.05;
/// Mean fraction of soiling removed by a cleaning event.
pub const CLEANING_REMOVAL_MEAN: f64 = 0.5;
/// Standard deviation of the removed fraction.
pub const CLEANING_REMOVAL_STD: f64 = 0.15;
/// Floor on the zenith cosine used for the path length.
const MIN_COS_ZENITH: f64 = 0.05;

/// Beer-Lambert atmospheric attenuation combined with panel soiling.
///
/// `efficiency = exp(-opacity / max(cos_zenith, 0.05)) × (1 - soiling)`
#[derive(Debug, Clone)]
pub struct OpticalSoiling {
    soiling: f64,
    max_soiling: f64,
    opacity: f64,
    cos_zenith: f64,
}

impl Default for OpticalSoiling {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOILING)
    }
}

impl OpticalSoiling {
    pub fn new(max_soiling: f64) -> Self {
        Self {
            soiling: 0.0,
            max_soiling: sanitize_max_soiling(max_soiling),
            opacity: 0.0,
            cos_zenith: 1.0,
        }
    }

    pub fn soiling(&self) -> f64 {
        self.soiling
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Removes `fraction` of the current soiling; returns the fraction applied.
    pub fn clean(&mut self, fraction: f64) -> f64 {
        if !fraction.is_finite() {
            return 0.0;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.soiling *= 1.0 - fraction;
        fraction
    }
}

impl EfficiencyModel for OpticalSoiling {
    fn efficiency(&self) -> f64 {
        let path = self.opacity / self.cos_zenith.max(MIN_COS_ZENITH);
        let eff = (-path).exp() * (1.0 - self.soiling);
        if eff.is_finite() { eff.clamp(0.0, 1.0) } else { 1.0 }
    }

    fn advance(&mut self, env: &EnvironmentSnapshot, elapsed_sols: f64, rng: &mut StdRng) {
        if env.opacity.is_finite() {
            self.opacity = env.opacity.max(0.0);
        }
        if env.cos_zenith.is_finite() {
            self.cos_zenith = env.cos_zenith.clamp(0.0, 1.0);
        }

        let Some(sols) = sanitize_sols(elapsed_sols) else {
            return;
        };

        let rate = if env.dust_storm {
            DEPOSITION_PER_SOL * STORM_DEPOSITION_MULTIPLIER
        } else {
            DEPOSITION_PER_SOL
        };
        self.soiling = (self.soiling + rate * sols).min(self.max_soiling);

        // No natural cleaning while a storm is depositing dust.
        if env.dust_storm {
            return;
        }
        let p = 1.0 - (1.0 - CLEANING_PROBABILITY_PER_SOL).powf(sols);
        if rng.random_bool(p.clamp(0.0, 1.0)) {
            let removed = (CLEANING_REMOVAL_MEAN + gaussian_noise(rng, CLEANING_REMOVAL_STD))
                .clamp(0.0, 1.0);
            self.clean(removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn clear_sky_overhead_sun() {
        let model = OpticalSoiling::default();
        assert_eq!(model.efficiency(), 1.0);
    }

    #[test]
    fn beer_lambert_attenuation() {
        let mut model = OpticalSoiling::default();
        let mut rng = StdRng::seed_from_u64(1);
        let env = EnvironmentSnapshot::midday(500.0).with_opacity(0.5);
        model.advance(&env, 0.0, &mut rng);
        assert!((model.efficiency() - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn low_sun_uses_floor() {
        let mut model = OpticalSoiling::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut env = EnvironmentSnapshot::midday(500.0).with_opacity(0.1);
        env.cos_zenith = 0.0;
        model.advance(&env, 0.0, &mut rng);
        assert!((model.efficiency() - (-2.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn storm_deposits_faster_and_never_cleans() {
        let mut calm = OpticalSoiling::default();
        let mut storm = OpticalSoiling::default();
        let mut rng = StdRng::seed_from_u64(3);
        let storm_env = EnvironmentSnapshot::night().with_opacity(0.0).with_dust_storm(true);
        storm.advance(&storm_env, 10.0, &mut rng);
        assert!((storm.soiling() - 0.1).abs() < 1e-12);

        // A calm sol either deposits 0.002 or cleans; both stay below the storm level.
        calm.advance(&EnvironmentSnapshot::night().with_opacity(0.0), 10.0, &mut rng);
        assert!(calm.soiling() <= 0.02 + 1e-12);
    }

    #[test]
    fn soiling_capped() {
        let mut model = OpticalSoiling::new(0.3);
        let mut rng = StdRng::seed_from_u64(9);
        let env = EnvironmentSnapshot::night().with_dust_storm(true);
        model.advance(&env, 1_000.0, &mut rng);
        assert_eq!(model.soiling(), 0.3);
    }

    #[test]
    fn adversarial_inputs_ignored() {
        let mut model = OpticalSoiling::default();
        let mut rng = StdRng::seed_from_u64(5);
        let env = EnvironmentSnapshot::midday(500.0).with_opacity(f64::NAN);
        model.advance(&env, f64::NAN, &mut rng);
        model.advance(&env, -5.0, &mut rng);
        model.advance(&env, f64::INFINITY, &mut rng);
        assert_eq!(model.soiling(), 0.0);
        assert_eq!(model.efficiency(), 1.0);

        let env = EnvironmentSnapshot::midday(500.0).with_opacity(f64::MAX);
        model.advance(&env, 0.0, &mut rng);
        let eff = model.efficiency();
        assert!((0.0..=1.0).contains(&eff));
    }
}
