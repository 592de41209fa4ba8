//! Settlement structures: power consumers that may also generate or store.

use std::fmt;
use std::str::FromStr;

use crate::storage::StorageUnit;

use super::aggregator::GenerationAggregator;
use super::environment::EnvironmentSnapshot;
use super::types::PowerMode;

/// Functional category of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureCategory {
    Habitat,
    Laboratory,
    Greenhouse,
    Workshop,
    Storage,
    Power,
}

impl StructureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Habitat => "habitat",
            Self::Laboratory => "laboratory",
            Self::Greenhouse => "greenhouse",
            Self::Workshop => "workshop",
            Self::Storage => "storage",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for StructureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown structure category \"{0}\"")]
pub struct UnknownCategory(pub String);

impl FromStr for StructureCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "habitat" => Ok(Self::Habitat),
            "laboratory" | "lab" => Ok(Self::Laboratory),
            "greenhouse" => Ok(Self::Greenhouse),
            "workshop" => Ok(Self::Workshop),
            "storage" => Ok(Self::Storage),
            "power" => Ok(Self::Power),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A building on the settlement grid.
///
/// Demand depends on the current [`PowerMode`]: `full_power_kw`,
/// `low_power_kw` or nothing.
#[derive(Debug, Clone)]
pub struct Structure {
    name: String,
    category: StructureCategory,
    life_support: bool,
    power_mode: PowerMode,
    full_power_kw: f64,
    low_power_kw: f64,
    generation: Option<GenerationAggregator>,
    storage: Option<StorageUnit>,
}

impl Structure {
    /// Creates a structure running at full power with no generation or storage.
    ///
    /// Negative or non-finite loads are treated as zero; low-power demand
    /// is capped at the full-power demand.
    pub fn new(
        name: impl Into<String>,
        category: StructureCategory,
        full_power_kw: f64,
        low_power_kw: f64,
    ) -> Self {
        let full = if full_power_kw.is_finite() { full_power_kw.max(0.0) } else { 0.0 };
        let low = if low_power_kw.is_finite() { low_power_kw.clamp(0.0, full) } else { 0.0 };
        Self {
            name: name.into(),
            category,
            life_support: false,
            power_mode: PowerMode::FullPower,
            full_power_kw: full,
            low_power_kw: low,
            generation: None,
            storage: None,
        }
    }

    pub fn with_life_support(mut self, life_support: bool) -> Self {
        self.life_support = life_support;
        self
    }

    pub fn with_mode(mut self, mode: PowerMode) -> Self {
        self.power_mode = mode;
        self
    }

    pub fn with_generation(mut self, generation: GenerationAggregator) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_storage(mut self, storage: StorageUnit) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Unique name within the settlement.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> StructureCategory {
        self.category
    }

    /// Whether occupants depend on this structure for life support.
    pub fn life_support(&self) -> bool {
        self.life_support
    }

    /// Demand at full power (kW).
    pub fn full_power_kw(&self) -> f64 {
        self.full_power_kw
    }

    /// Demand at low power (kW).
    pub fn low_power_kw(&self) -> f64 {
        self.low_power_kw
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power_mode
    }

    /// Sets the mode; returns the previous mode when it changed.
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Option<PowerMode> {
        let previous = self.power_mode;
        self.power_mode = mode;
        (previous != mode).then_some(previous)
    }

    /// Demand in a given mode (kW).
    pub fn power_required(&self, mode: PowerMode) -> f64 {
        match mode {
            PowerMode::FullPower => self.full_power_kw,
            PowerMode::LowPower => self.low_power_kw,
            PowerMode::NoPower => 0.0,
        }
    }

    /// Demand in the current mode (kW).
    pub fn current_load(&self) -> f64 {
        self.power_required(self.power_mode)
    }

    /// Power plants without life support keep their mode; everything else may be raised or shed.
    pub fn is_mode_adjustable(&self) -> bool {
        self.life_support || self.category != StructureCategory::Power
    }

    /// Whether this structure's present generation exceeds its load in `mode`.
    pub fn generates_more_than_load(&self, env: &EnvironmentSnapshot, mode: PowerMode) -> bool {
        self.projected_generation(env, self.power_mode) > self.power_required(mode)
    }

    /// Output the structure's sources would give in `mode` right now (kW).
    ///
    /// Reflects generators started or stopped earlier in the tick, unlike
    /// [`Structure::generated_power`].
    pub fn projected_generation(&self, env: &EnvironmentSnapshot, mode: PowerMode) -> f64 {
        self.generation
            .as_ref()
            .map_or(0.0, |g| g.projected_power(env, mode))
    }

    /// Cached generation (kW), 0 without an aggregator.
    pub fn generated_power(&self) -> f64 {
        self.generation
            .as_ref()
            .map_or(0.0, GenerationAggregator::generated_power)
    }

    pub fn generation(&self) -> Option<&GenerationAggregator> {
        self.generation.as_ref()
    }

    pub fn generation_mut(&mut self) -> Option<&mut GenerationAggregator> {
        self.generation.as_mut()
    }

    /// Name and aggregator borrowed together, for per-source event reporting.
    pub fn named_generation_mut(&mut self) -> (&str, Option<&mut GenerationAggregator>) {
        (&self.name, self.generation.as_mut())
    }

    pub fn storage(&self) -> Option<&StorageUnit> {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> Option<&mut StorageUnit> {
        self.storage.as_mut()
    }

    /// Maintenance time of owned sources (millisols).
    pub fn maintenance_time(&self) -> f64 {
        self.generation
            .as_ref()
            .map_or(0.0, GenerationAggregator::maintenance_time)
    }

    /// Brushes the panels clean; returns the soiling fraction removed.
    ///
    /// Structures without a dust model have nothing to clean and return 0.
    pub fn manual_clean(&mut self, brushing_millisols: f64, throughput_per_millisol: f64) -> f64 {
        self.generation
            .as_mut()
            .and_then(GenerationAggregator::dust_model_mut)
            .map_or(0.0, |dust| dust.manual_clean(brushing_millisols, throughput_per_millisol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efficiency::DustModel;
    use crate::sim::resources::ResourceStore;
    use crate::sources::fuel::LOW_OUTPUT_PERCENT;
    use crate::sources::{FuelPowerSource, ReactorSource, SolarSource};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn power_required_per_mode() {
        let lab = Structure::new("lab", StructureCategory::Laboratory, 20.0, 5.0);
        assert_eq!(lab.power_required(PowerMode::FullPower), 20.0);
        assert_eq!(lab.power_required(PowerMode::LowPower), 5.0);
        assert_eq!(lab.power_required(PowerMode::NoPower), 0.0);
        assert_eq!(lab.current_load(), 20.0);
        assert_eq!(lab.name(), "lab");
        assert_eq!(lab.category(), StructureCategory::Laboratory);
        assert!(!lab.life_support());
    }

    #[test]
    fn loads_are_sanitized() {
        let s = Structure::new("x", StructureCategory::Workshop, f64::NAN, 4.0);
        assert_eq!(s.full_power_kw(), 0.0);
        assert_eq!(s.low_power_kw(), 0.0);
        let s = Structure::new("y", StructureCategory::Workshop, 10.0, 40.0);
        assert_eq!(s.low_power_kw(), 10.0);
    }

    #[test]
    fn power_plants_without_life_support_are_fixed() {
        let plant = Structure::new("plant", StructureCategory::Power, 2.0, 1.0);
        assert!(!plant.is_mode_adjustable());
        assert!(plant.clone().with_life_support(true).is_mode_adjustable());
        assert!(Structure::new("hab", StructureCategory::Habitat, 2.0, 1.0).is_mode_adjustable());
    }

    #[test]
    fn set_power_mode_reports_change() {
        let mut s = Structure::new("hab", StructureCategory::Habitat, 10.0, 3.0);
        assert_eq!(s.set_power_mode(PowerMode::LowPower), Some(PowerMode::FullPower));
        assert_eq!(s.set_power_mode(PowerMode::LowPower), None);
    }

    #[test]
    fn generation_compared_with_load() {
        let agg = GenerationAggregator::new(
            vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()],
            None,
        );
        let env = EnvironmentSnapshot::night();
        let s = Structure::new("plant", StructureCategory::Power, 40.0, 10.0).with_generation(agg);
        assert!(!s.generates_more_than_load(&env, PowerMode::FullPower));
        assert!(s.generates_more_than_load(&env, PowerMode::LowPower));
        assert_eq!(s.maintenance_time(), 60.0);
    }

    #[test]
    fn projected_generation_sees_generator_started_mid_tick() {
        let mut agg = GenerationAggregator::new(
            vec![FuelPowerSource::new(20.0, 0.5, false).into()],
            None,
        );
        let mut store = ResourceStore::new(100.0, 400.0);
        if let Some(generator) = agg.sources_mut()[0].as_fuel_mut() {
            generator.ramp_up(LOW_OUTPUT_PERCENT, 10.0, &mut store);
        }
        let env = EnvironmentSnapshot::night();
        let lab = Structure::new("lab", StructureCategory::Laboratory, 20.0, 10.0).with_generation(agg);

        // Nothing cached yet, but the running generator is visible.
        assert_eq!(lab.generated_power(), 0.0);
        assert_eq!(lab.projected_generation(&env, PowerMode::FullPower), 10.0);
        assert_eq!(lab.projected_generation(&env, PowerMode::NoPower), 0.0);
        assert!(lab.generates_more_than_load(&env, PowerMode::NoPower));
    }

    #[test]
    fn manual_clean_reaches_dust_model() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut agg = GenerationAggregator::new(
            vec![SolarSource::photovoltaic(10.0, 0.3).into()],
            Some(DustModel::mechanical()),
        );
        agg.advance_environment(&EnvironmentSnapshot::night(), 50.0, &mut rng);
        let mut farm = Structure::new("farm", StructureCategory::Power, 0.0, 0.0).with_generation(agg);
        let removed = farm.manual_clean(10.0, 0.05);
        assert!(removed > 0.0);
        assert_eq!(
            Structure::new("lab", StructureCategory::Laboratory, 5.0, 1.0).manual_clean(10.0, 0.05),
            0.0
        );
    }

    #[test]
    fn category_parses() {
        assert_eq!("Lab".parse::<StructureCategory>(), Ok(StructureCategory::Laboratory));
        assert!("castle".parse::<StructureCategory>().is_err());
    }
}
