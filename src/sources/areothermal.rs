use crate::sim::environment::EnvironmentSnapshot;

use super::types::{PowerSource, SourceKind, StructureContext, finite_or_zero};

/// Geothermal plant drawing on the site's areothermal potential.
#[derive(Debug, Clone)]
pub struct AreothermalSource {
    max_power: f64,
}

impl AreothermalSource {
    pub fn new(max_power: f64) -> Self {
        Self {
            max_power: finite_or_zero(max_power),
        }
    }

    fn output(&self, potential: f64) -> f64 {
        if !potential.is_finite() {
            return 0.0;
        }
        self.max_power * potential.clamp(0.0, 100.0) / 100.0
    }
}

impl PowerSource for AreothermalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Areothermal
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        self.output(ctx.env.areothermal_potential)
    }

    fn projected_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.areothermal_potential)
    }

    fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.output(env.areothermal_potential)
    }

    fn maintenance_time(&self) -> f64 {
        self.max_power * 0.3
    }

    fn measure_power(&self, percent: f64, env: &EnvironmentSnapshot) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        self.output(env.areothermal_potential) * percent.clamp(0.0, 100.0) / 100.0
    }
}
