//! Environment providers feeding the grid one snapshot per tick.

use rand::{SeedableRng, rngs::StdRng};

use crate::sim::clock::{ClockPulse, MILLISOLS_PER_SOL};
use crate::sim::environment::EnvironmentSnapshot;
use crate::sources::solar::REFERENCE_IRRADIANCE;
use crate::sources::types::gaussian_noise;

/// Supplies environmental conditions for each clock pulse.
pub trait WeatherProvider {
    fn sample(&mut self, pulse: &ClockPulse) -> EnvironmentSnapshot;
}

/// Returns the same snapshot every tick.
#[derive(Debug, Clone)]
pub struct FixedWeather {
    pub snapshot: EnvironmentSnapshot,
}

impl FixedWeather {
    pub fn new(snapshot: EnvironmentSnapshot) -> Self {
        Self { snapshot }
    }
}

impl WeatherProvider for FixedWeather {
    fn sample(&mut self, _pulse: &ClockPulse) -> EnvironmentSnapshot {
        self.snapshot.clone()
    }
}

/// Parameters of [`SyntheticWeather`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherParams {
    /// Top-of-atmosphere irradiance at local noon (W/m²).
    pub peak_irradiance: f64,
    /// Millisol of sunrise (inclusive).
    pub sunrise_millisol: f64,
    /// Millisol of sunset (exclusive).
    pub sunset_millisol: f64,
    /// Long-run mean wind speed (m/s).
    pub mean_wind_speed: f64,
    /// AR(1) persistence of the wind speed (0 = white noise, 1 = frozen).
    pub wind_alpha: f64,
    /// Standard deviation of the wind innovation (m/s).
    pub wind_noise_std: f64,
    /// Optical depth in clear weather.
    pub base_opacity: f64,
    /// Optical depth during a dust storm.
    pub storm_opacity: f64,
    /// Mean wind multiplier during a dust storm.
    pub storm_wind_factor: f64,
    /// First and last mission sol of a dust storm, inclusive.
    pub storm_sols: Option<(u32, u32)>,
    /// Areothermal potential at the site (percent).
    pub areothermal_potential: f64,
}

impl Default for WeatherParams {
    fn default() -> Self {
        Self {
            peak_irradiance: REFERENCE_IRRADIANCE,
            sunrise_millisol: 250.0,
            sunset_millisol: 750.0,
            mean_wind_speed: 6.0,
            wind_alpha: 0.9,
            wind_noise_std: 3.0,
            base_opacity: 0.5,
            storm_opacity: 3.0,
            storm_wind_factor: 2.0,
            storm_sols: None,
            areothermal_potential: 0.0,
        }
    }
}

/// Diurnal irradiance, correlated wind and scheduled dust storms.
///
/// Irradiance follows a half-sine between sunrise and sunset. Wind evolves as
/// ```text
/// w(t) = alpha * w(t-1) + (1 - alpha) * (mean + epsilon(t))
/// ```
/// clamped to `[0, 40]` m/s.
#[derive(Debug, Clone)]
pub struct SyntheticWeather {
    params: WeatherParams,
    wind: f64,
    rng: StdRng,
}

const MAX_WIND_SPEED: f64 = 40.0;

impl SyntheticWeather {
    /// Creates a generator seeded for reproducible runs.
    ///
    /// # Panics
    ///
    /// Panics if sunrise is not before sunset within one sol.
    pub fn new(params: WeatherParams, seed: u64) -> Self {
        assert!(
            params.sunrise_millisol >= 0.0
                && params.sunrise_millisol < params.sunset_millisol
                && params.sunset_millisol <= MILLISOLS_PER_SOL,
            "sunrise must be before sunset within one sol"
        );
        let wind = params.mean_wind_speed.max(0.0);
        Self {
            params,
            wind,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn params(&self) -> &WeatherParams {
        &self.params
    }

    /// Fraction of peak irradiance at a millisol of the sol.
    pub fn daylight_frac(&self, millisol: f64) -> f64 {
        let (rise, set) = (self.params.sunrise_millisol, self.params.sunset_millisol);
        if millisol < rise || millisol >= set {
            return 0.0;
        }
        let phase = (millisol - rise) / (set - rise);
        (std::f64::consts::PI * phase).sin().max(0.0)
    }

    /// Whether `sol` falls inside the storm window.
    pub fn storm_active(&self, sol: u32) -> bool {
        self.params
            .storm_sols
            .is_some_and(|(first, last)| sol >= first && sol <= last)
    }

    fn advance_wind(&mut self, storm: bool) -> f64 {
        let p = &self.params;
        let mean = if storm {
            p.mean_wind_speed * p.storm_wind_factor
        } else {
            p.mean_wind_speed
        };
        let alpha = p.wind_alpha.clamp(0.0, 1.0);
        let epsilon = gaussian_noise(&mut self.rng, p.wind_noise_std);
        self.wind = alpha * self.wind + (1.0 - alpha) * (mean + epsilon);
        self.wind = self.wind.clamp(0.0, MAX_WIND_SPEED);
        self.wind
    }
}

impl WeatherProvider for SyntheticWeather {
    fn sample(&mut self, pulse: &ClockPulse) -> EnvironmentSnapshot {
        let storm = self.storm_active(pulse.mission_sol());
        let wind = self.advance_wind(storm);
        let frac = self.daylight_frac(pulse.millisol_of_sol());
        let p = &self.params;

        // Mean of a half-sine over the daylight window, spread across the sol.
        let day_fraction = (p.sunset_millisol - p.sunrise_millisol) / MILLISOLS_PER_SOL;
        let mean_irradiance = p.peak_irradiance * day_fraction * 2.0 / std::f64::consts::PI;

        EnvironmentSnapshot {
            irradiance: p.peak_irradiance * frac,
            mean_irradiance,
            cos_zenith: frac,
            wind_speed: wind,
            mean_wind_speed: if storm {
                p.mean_wind_speed * p.storm_wind_factor
            } else {
                p.mean_wind_speed
            },
            opacity: if storm { p.storm_opacity } else { p.base_opacity },
            areothermal_potential: p.areothermal_potential,
            dust_storm: storm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_at(mission_millisols: f64) -> ClockPulse {
        ClockPulse::new(0, 10.0, mission_millisols)
    }

    #[test]
    fn dark_outside_daylight_window() {
        let mut weather = SyntheticWeather::new(WeatherParams::default(), 1);
        assert_eq!(weather.sample(&pulse_at(100.0)).irradiance, 0.0);
        assert_eq!(weather.sample(&pulse_at(800.0)).irradiance, 0.0);
    }

    #[test]
    fn noon_reaches_peak() {
        let mut weather = SyntheticWeather::new(WeatherParams::default(), 1);
        let env = weather.sample(&pulse_at(500.0));
        assert!((env.irradiance - REFERENCE_IRRADIANCE).abs() < 1e-9);
        assert!((env.cos_zenith - 1.0).abs() < 1e-12);
        assert!(env.mean_irradiance > 0.0 && env.mean_irradiance < env.irradiance);
    }

    #[test]
    fn storm_window_is_inclusive() {
        let params = WeatherParams {
            storm_sols: Some((2, 3)),
            ..WeatherParams::default()
        };
        let mut weather = SyntheticWeather::new(params, 1);
        assert!(!weather.sample(&pulse_at(500.0)).dust_storm);
        let env = weather.sample(&pulse_at(1_500.0));
        assert!(env.dust_storm);
        assert_eq!(env.opacity, 3.0);
        assert!(weather.sample(&pulse_at(2_999.0)).dust_storm);
        assert!(!weather.sample(&pulse_at(3_000.0)).dust_storm);
    }

    #[test]
    fn wind_stays_bounded_and_seeded() {
        let params = WeatherParams {
            wind_noise_std: 50.0,
            wind_alpha: 0.0,
            ..WeatherParams::default()
        };
        let mut a = SyntheticWeather::new(params.clone(), 42);
        let mut b = SyntheticWeather::new(params, 42);
        for i in 0..200 {
            let wa = a.sample(&pulse_at(i as f64 * 10.0)).wind_speed;
            let wb = b.sample(&pulse_at(i as f64 * 10.0)).wind_speed;
            assert!((0.0..=MAX_WIND_SPEED).contains(&wa));
            assert_eq!(wa, wb);
        }
    }

    #[test]
    fn fixed_weather_repeats() {
        let snapshot = EnvironmentSnapshot::midday(300.0).with_wind(8.0);
        let mut weather = FixedWeather::new(snapshot.clone());
        assert_eq!(weather.sample(&pulse_at(0.0)), snapshot);
        assert_eq!(weather.sample(&pulse_at(900.0)), snapshot);
    }
}
