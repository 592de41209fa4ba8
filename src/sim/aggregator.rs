//! Per-structure collection of generation sources.

use rand::rngs::StdRng;
use tracing::debug;

use crate::efficiency::{DustModel, EfficiencyModel};
use crate::sources::fuel::LOW_OUTPUT_PERCENT;
use crate::sources::{GenerationSource, PowerSource, SourceKind, StructureContext, finite_or_zero};

use super::environment::EnvironmentSnapshot;
use super::types::PowerMode;

/// Ordered sources attached to one structure plus its dust model.
///
/// Sources are visited in insertion order. The dust model scales solar
/// variants only.
#[derive(Debug, Clone, Default)]
pub struct GenerationAggregator {
    sources: Vec<GenerationSource>,
    dust: Option<DustModel>,
    generated_power: f64,
}

impl GenerationAggregator {
    pub fn new(sources: Vec<GenerationSource>, dust: Option<DustModel>) -> Self {
        Self {
            sources,
            dust,
            generated_power: 0.0,
        }
    }

    pub fn sources(&self) -> &[GenerationSource] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut [GenerationSource] {
        &mut self.sources
    }

    pub fn dust_model(&self) -> Option<&DustModel> {
        self.dust.as_ref()
    }

    pub fn dust_model_mut(&mut self) -> Option<&mut DustModel> {
        self.dust.as_mut()
    }

    /// Output cached by the last `update` or `recompute` (kW).
    pub fn generated_power(&self) -> f64 {
        self.generated_power
    }

    fn dust_factor(&self, kind: SourceKind) -> f64 {
        match (&self.dust, kind.is_solar()) {
            (Some(model), true) => model.efficiency(),
            _ => 1.0,
        }
    }

    /// Reads every source for this tick and caches the sum.
    ///
    /// Combustion generators are brought into compliance with the
    /// structure's mode first: switched off in `NoPower`, held to low
    /// output in `LowPower`.
    pub fn update(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        let mut total = 0.0;
        for i in 0..self.sources.len() {
            if let Some(generator) = self.sources[i].as_fuel_mut() {
                match ctx.power_mode {
                    PowerMode::NoPower if generator.is_toggled_on() => {
                        generator.toggle_off();
                        debug!("generator switched off in unpowered structure");
                    }
                    PowerMode::LowPower if generator.operating_percent() > LOW_OUTPUT_PERCENT => {
                        generator.set_operating_percent(LOW_OUTPUT_PERCENT);
                    }
                    _ => {}
                }
            }
            let factor = self.dust_factor(self.sources[i].kind());
            let kw = self.sources[i].current_power(ctx) * factor;
            total += finite_or_zero(kw);
        }
        self.generated_power = total;
        total
    }

    /// Output the sources would give under `mode` from their present state (kW).
    ///
    /// Generators are counted as the next `update` would leave them: off in
    /// `NoPower`, at most low output in `LowPower`. Nothing is consumed.
    pub fn projected_power(&self, env: &EnvironmentSnapshot, mode: PowerMode) -> f64 {
        let mut total = 0.0;
        for source in &self.sources {
            let mut kw = source.projected_power(env) * self.dust_factor(source.kind());
            if source.kind() == SourceKind::Fuel {
                kw = match mode {
                    PowerMode::NoPower => 0.0,
                    PowerMode::LowPower => kw.min(source.measure_power(LOW_OUTPUT_PERCENT, env)),
                    PowerMode::FullPower => kw,
                };
            }
            total += finite_or_zero(kw);
        }
        total
    }

    /// Re-derives the cached output from current state without consuming anything.
    pub fn recompute(&mut self, env: &EnvironmentSnapshot, mode: PowerMode) -> f64 {
        self.generated_power = self.projected_power(env, mode);
        self.generated_power
    }

    /// Sol-averaged output with dust losses applied (kW).
    pub fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.sources
            .iter()
            .map(|s| finite_or_zero(s.average_power(env) * self.dust_factor(s.kind())))
            .sum()
    }

    /// Maintenance time of all sources (millisols).
    pub fn maintenance_time(&self) -> f64 {
        self.sources.iter().map(PowerSource::maintenance_time).sum()
    }

    /// Total methane burned by this structure's generators since construction (kg).
    pub fn fuel_burned(&self) -> f64 {
        self.sources
            .iter()
            .filter_map(GenerationSource::as_fuel)
            .map(|f| f.fuel_burned())
            .sum()
    }

    /// Advances dust accumulation and panel ageing.
    pub fn advance_environment(
        &mut self,
        env: &EnvironmentSnapshot,
        elapsed_sols: f64,
        rng: &mut StdRng,
    ) {
        if let Some(model) = self.dust.as_mut() {
            model.advance(env, elapsed_sols, rng);
        }
        for source in &mut self.sources {
            if let Some(panel) = source.as_solar_mut() {
                panel.degrade(elapsed_sols);
            }
        }
    }
}
