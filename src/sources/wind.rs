use crate::sim::environment::EnvironmentSnapshot;

use super::types::{PowerSource, SourceKind, StructureContext, finite_or_zero};

/// Martian surface air density (kg/m³).
pub const AIR_DENSITY: f64 = 0.0156;
/// Rotor swept area per module (m²).
pub const SWEPT_AREA: f64 = 8.4345;
/// Power coefficient of the turbine design.
pub const POWER_COEFFICIENT: f64 = 3.8;
/// Effective wind speed above which output stops rising (m/s).
pub const SPEED_THRESHOLD: f64 = 20.0;
/// Default ratio of hub-height to reference-height wind speed.
pub const DEFAULT_HEIGHT_FACTOR: f64 = 1.2;
/// Rating at or above which a turbine farm uses the large module count (kW).
pub const LARGE_TURBINE_RATING_KW: f64 = 40.0;

/// A wind turbine farm.
#[derive(Debug, Clone)]
pub struct WindSource {
    max_power: f64,
    /// Number of turbine modules, fixed at construction from the rating.
    pub modules: u32,
    /// Hub-height wind speed multiplier.
    pub height_factor: f64,
}

impl WindSource {
    /// Creates a turbine farm; module count is 9 for large ratings and 4 otherwise.
    pub fn new(max_power: f64, height_factor: f64) -> Self {
        let max_power = finite_or_zero(max_power);
        let modules = if max_power >= LARGE_TURBINE_RATING_KW { 9 } else { 4 };
        let height_factor = if height_factor.is_finite() && height_factor > 0.0 {
            height_factor
        } else {
            DEFAULT_HEIGHT_FACTOR
        };
        Self {
            max_power,
            modules,
            height_factor,
        }
    }

    /// Output for a reference-height wind speed.
    fn output(&self, wind_speed: f64) -> f64 {
        if !wind_speed.is_finite() || wind_speed <= 0.0 {
            return 0.0;
        }
        let effective = (self.height_factor * wind_speed).min(SPEED_THRESHOLD);
        let kw = self.modules as f64
            * 0.5
            * AIR_DENSITY
            * SWEPT_AREA
            * POWER_COEFFICIENT
            * effective;
        finite_or_zero(kw).min(self.max_power)
    }
}

impl PowerSource for WindSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Wind
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        self.output(ctx.env.wind_speed)
    }

    fn projected_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.wind_speed)
    }

    fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.mean_wind_speed)
    }

    fn maintenance_time(&self) -> f64 {
        self.max_power * 0.25
    }

    fn measure_power(&self, percent: f64, env: &EnvironmentSnapshot) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        self.output(env.wind_speed) * percent.clamp(0.0, 100.0) / 100.0
    }
}
