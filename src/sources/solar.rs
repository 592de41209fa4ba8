use crate::sim::environment::EnvironmentSnapshot;

use super::types::{PowerSource, SourceKind, StructureContext, finite_or_zero};

/// Mean solar irradiance at Mars' distance (W/m²).
pub const REFERENCE_IRRADIANCE: f64 = 586.0;
/// Electric efficiency lost per sol by photovoltaic panels.
pub const PV_DEGRADATION_PER_SOL: f64 = 0.000_5;
/// Electric efficiency lost per sol by solar-thermal collectors.
pub const THERMAL_DEGRADATION_PER_SOL: f64 = 0.000_25;

/// A photovoltaic array or solar-thermal collector.
///
/// Output scales linearly with irradiance relative to [`REFERENCE_IRRADIANCE`]
/// and with the ratio of current to rated electric efficiency. Dust losses
/// are applied by the owning aggregator, not here.
#[derive(Debug, Clone)]
pub struct SolarSource {
    kind: SourceKind,
    max_power: f64,
    /// Rated electric efficiency when new (0..=1).
    pub rated_efficiency: f64,
    electric_efficiency: f64,
    degradation_per_sol: f64,
}

impl SolarSource {
    /// Creates a photovoltaic array.
    ///
    /// # Arguments
    ///
    /// * `max_power` - Rated output at reference irradiance (kW)
    /// * `rated_efficiency` - Electric efficiency when new (0..=1)
    pub fn photovoltaic(max_power: f64, rated_efficiency: f64) -> Self {
        Self::new(
            SourceKind::Photovoltaic,
            max_power,
            rated_efficiency,
            PV_DEGRADATION_PER_SOL,
        )
    }

    /// Creates a solar-thermal collector.
    pub fn thermal(max_power: f64, rated_efficiency: f64) -> Self {
        Self::new(
            SourceKind::SolarThermal,
            max_power,
            rated_efficiency,
            THERMAL_DEGRADATION_PER_SOL,
        )
    }

    fn new(kind: SourceKind, max_power: f64, rated_efficiency: f64, degradation: f64) -> Self {
        let rated_efficiency = if rated_efficiency.is_finite() && rated_efficiency > 0.0 {
            rated_efficiency.min(1.0)
        } else {
            1.0
        };
        Self {
            kind,
            max_power: finite_or_zero(max_power),
            rated_efficiency,
            electric_efficiency: rated_efficiency,
            degradation_per_sol: degradation,
        }
    }

    /// Current electric efficiency.
    pub fn electric_efficiency(&self) -> f64 {
        self.electric_efficiency
    }

    /// Ages the panels by `sols`.
    pub fn degrade(&mut self, sols: f64) {
        if !sols.is_finite() || sols <= 0.0 {
            return;
        }
        self.electric_efficiency *= (1.0 - self.degradation_per_sol).powf(sols);
    }

    /// Output for a given irradiance before dust losses.
    fn output(&self, irradiance: f64) -> f64 {
        if !irradiance.is_finite() || irradiance <= 0.0 {
            return 0.0;
        }
        let kw = irradiance / REFERENCE_IRRADIANCE
            * self.max_power
            * (self.electric_efficiency / self.rated_efficiency);
        finite_or_zero(kw).min(self.max_power)
    }
}

impl PowerSource for SolarSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        self.output(ctx.env.irradiance)
    }

    fn projected_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.irradiance)
    }

    fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.mean_irradiance)
    }

    fn maintenance_time(&self) -> f64 {
        match self.kind {
            SourceKind::SolarThermal => self.max_power * 0.15,
            _ => self.max_power * 0.1,
        }
    }

    fn measure_power(&self, percent: f64, env: &EnvironmentSnapshot) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        self.output(env.irradiance) * percent.clamp(0.0, 100.0) / 100.0
    }
}
