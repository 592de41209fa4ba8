//! Settlement power grid and its staged balancing pass.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, trace};

use crate::sources::fuel::{FULL_OUTPUT_PERCENT, LOW_OUTPUT_PERCENT};
use crate::sources::reactor::{LOAD_CAPACITY_STEP, MAX_LOAD_CAPACITY, MIN_LOAD_CAPACITY};
use crate::sources::{PowerSource, StructureContext};
use crate::storage::StorageUnit;

use super::clock::{ClockPulse, HOURS_PER_MILLISOL, MILLISOLS_PER_SOL};
use super::environment::EnvironmentSnapshot;
use super::event::PowerEvent;
use super::resources::ResourceStore;
use super::structure::Structure;
use super::types::{BalanceBranch, BalanceStage, PowerMode, SimConfig, TickReport};

/// Chance per tick that reactors are stepped down before the unconditional step.
pub const RANDOM_STEP_DOWN_PROBABILITY: f64 = 0.1;
/// Fraction of drawn battery energy that reaches the bus.
pub const BATTERY_DELIVERY_EFFICIENCY: f64 = 0.98;

/// Totals below this are treated as zero.
const EPSILON: f64 = 1e-9;
/// Changes smaller than this do not produce events.
const EVENT_THRESHOLD: f64 = 1e-3;
const MIN_SYSTEM_EFFICIENCY: f64 = 1e-6;

const EXCESS_STAGES: [BalanceStage; 9] = [
    BalanceStage::RaiseLifeSupportToLow,
    BalanceStage::RaiseLifeSupportToFull,
    BalanceStage::ShutDownGenerators,
    BalanceStage::RaiseOthersToLow,
    BalanceStage::RaiseOthersToFull,
    BalanceStage::StoreSurplus,
    BalanceStage::RandomReactorStepDown,
    BalanceStage::ReactorStepDown,
    BalanceStage::StoreRemainingSurplus,
];

const DEFICIT_STAGES: [BalanceStage; 9] = [
    BalanceStage::ReactorStepUp,
    BalanceStage::DrawStorage,
    BalanceStage::StartGeneratorsLow,
    BalanceStage::ReactorStepUp,
    BalanceStage::ShedOthersToLow,
    BalanceStage::StartGeneratorsFull,
    BalanceStage::ReactorStepUp,
    BalanceStage::ShedOthersToNone,
    BalanceStage::ShedLifeSupportToLow,
];

/// Working state for one balancing pass.
struct TickLedger<'a> {
    env: &'a EnvironmentSnapshot,
    elapsed_millisols: f64,
    hours: f64,
    stages: Vec<BalanceStage>,
    shed: usize,
    raised: usize,
}

/// The settlement grid: owns every structure, its sources and storage, and
/// the bulk fuel store.
///
/// Each call to [`PowerGrid::time_passing`] reads generation, compares it
/// with margined demand and runs the excess or deficit stages in a fixed
/// order until the imbalance is absorbed.
pub struct PowerGrid {
    structures: Vec<Structure>,
    store: ResourceStore,
    rng: StdRng,
    power_mode: PowerMode,
    rolling_factor: f64,
    degradation_rate_per_sol: f64,
    system_efficiency: f64,
    total_generated: f64,
    total_required: f64,
    total_stored: f64,
    total_storage_capacity: f64,
    sufficient_power: bool,
    power_value: f64,
    events: Vec<PowerEvent>,
}

impl PowerGrid {
    /// Creates a grid from the run configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the seed, rolling factor and degradation rate
    /// * `structures` - Buildings in insertion order
    /// * `store` - Settlement methane/oxygen inventory
    pub fn new(config: &SimConfig, structures: Vec<Structure>, store: ResourceStore) -> Self {
        let mut grid = Self {
            structures,
            store,
            rng: StdRng::seed_from_u64(config.seed),
            power_mode: PowerMode::FullPower,
            rolling_factor: config.rolling_factor,
            degradation_rate_per_sol: config.degradation_rate_per_sol,
            system_efficiency: 1.0,
            total_generated: 0.0,
            total_required: 0.0,
            total_stored: 0.0,
            total_storage_capacity: 0.0,
            sufficient_power: true,
            power_value: 0.0,
            events: Vec::new(),
        };
        grid.total_required = grid.required_power();
        grid.total_stored = grid.stored_energy();
        grid.total_storage_capacity = grid.storage_capacity();
        grid
    }

    /// Runs one balancing pass for `pulse` under `env`.
    pub fn time_passing(&mut self, pulse: &ClockPulse, env: &EnvironmentSnapshot) -> TickReport {
        let elapsed = if pulse.elapsed_millisols.is_finite() {
            pulse.elapsed_millisols.max(0.0)
        } else {
            0.0
        };
        let fuel_before = self.fuel_burned();

        // Dust and panel ageing happen before this tick's output is read.
        let sols = elapsed / MILLISOLS_PER_SOL;
        for structure in &mut self.structures {
            if let Some(generation) = structure.generation_mut() {
                generation.advance_environment(env, sols, &mut self.rng);
            }
        }

        let mut generated = 0.0;
        for structure in &mut self.structures {
            let mode = structure.power_mode();
            if let Some(generation) = structure.generation_mut() {
                let mut ctx = StructureContext {
                    env,
                    store: &mut self.store,
                    elapsed_millisols: elapsed,
                    power_mode: mode,
                };
                generated += generation.update(&mut ctx);
            }
        }

        let required = self.required_power();
        let margined = required * self.rolling_factor;
        let diff = margined - generated;
        self.degrade_efficiency(elapsed);

        let mut ledger = TickLedger {
            env,
            elapsed_millisols: elapsed,
            hours: elapsed * HOURS_PER_MILLISOL,
            stages: Vec::new(),
            shed: 0,
            raised: 0,
        };

        let (branch, residual) = if diff <= 0.0 {
            self.run_stages(&EXCESS_STAGES, -diff, &mut ledger);
            (BalanceBranch::Excess, diff)
        } else {
            let remaining = self.run_stages(&DEFICIT_STAGES, diff, &mut ledger);
            (BalanceBranch::Deficit, remaining)
        };

        self.finish_tick(env, residual);
        let methane_burned_kg = (self.fuel_burned() - fuel_before).max(0.0);

        trace!(
            tick = pulse.tick,
            generated_kw = self.total_generated,
            required_kw = self.total_required,
            stored_kwh = self.total_stored,
            residual_kw = residual,
            "tick balanced"
        );

        TickReport {
            tick: pulse.tick,
            mission_sol: pulse.mission_sol(),
            millisol: pulse.millisol_of_sol(),
            generated_kw: self.total_generated,
            required_kw: self.total_required,
            margined_kw: margined,
            stored_kwh: self.total_stored,
            capacity_kwh: self.total_storage_capacity,
            system_efficiency: self.system_efficiency,
            sufficient_power: self.sufficient_power,
            power_value: self.power_value,
            branch,
            stages: ledger.stages,
            residual_kw: residual,
            structures_shed: ledger.shed,
            structures_raised: ledger.raised,
            methane_burned_kg,
        }
    }

    /// Runs `stages` in order until `remaining` is absorbed; returns what is left.
    fn run_stages(
        &mut self,
        stages: &[BalanceStage],
        mut remaining: f64,
        ledger: &mut TickLedger<'_>,
    ) -> f64 {
        for &stage in stages {
            if remaining <= EPSILON {
                break;
            }
            ledger.stages.push(stage);
            let covered = self.run_stage(stage, remaining, ledger);
            debug!(stage = stage.as_str(), covered_kw = covered, "balance stage");
            remaining -= covered;
        }
        remaining
    }

    fn run_stage(&mut self, stage: BalanceStage, amount: f64, ledger: &mut TickLedger<'_>) -> f64 {
        use BalanceStage::*;
        match stage {
            RaiseLifeSupportToLow => self.raise_structures(true, PowerMode::NoPower, amount, ledger),
            RaiseLifeSupportToFull => {
                self.raise_structures(true, PowerMode::LowPower, amount, ledger)
            }
            ShutDownGenerators => self.shut_down_generators(amount, ledger),
            RaiseOthersToLow => self.raise_structures(false, PowerMode::NoPower, amount, ledger),
            RaiseOthersToFull => self.raise_structures(false, PowerMode::LowPower, amount, ledger),
            StoreSurplus | StoreRemainingSurplus => self.store_surplus(amount, ledger),
            RandomReactorStepDown => {
                if self.rng.random_bool(RANDOM_STEP_DOWN_PROBABILITY) {
                    self.step_reactors_down(amount, ledger)
                } else {
                    0.0
                }
            }
            ReactorStepDown => self.step_reactors_down(amount, ledger),
            ReactorStepUp => self.step_reactors_up(amount, ledger),
            DrawStorage => self.draw_storage(amount, ledger),
            StartGeneratorsLow => self.ramp_generators(LOW_OUTPUT_PERCENT, amount, ledger),
            StartGeneratorsFull => self.ramp_generators(FULL_OUTPUT_PERCENT, amount, ledger),
            ShedOthersToLow => self.shed_structures(false, PowerMode::FullPower, amount, ledger),
            ShedOthersToNone => self.shed_structures(false, PowerMode::LowPower, amount, ledger),
            ShedLifeSupportToLow => {
                self.shed_structures(true, PowerMode::FullPower, amount, ledger)
            }
        }
    }

    /// Raises structures out of `from` while the surplus stays positive.
    ///
    /// The first structure whose raise would not fit ends the stage.
    fn raise_structures(
        &mut self,
        life_support: bool,
        from: PowerMode,
        excess: f64,
        ledger: &mut TickLedger<'_>,
    ) -> f64 {
        let Some(to) = from.raised() else {
            return 0.0;
        };
        let mut used = 0.0;
        for structure in &mut self.structures {
            if structure.life_support() != life_support
                || !structure.is_mode_adjustable()
                || structure.power_mode() != from
            {
                continue;
            }
            let delta = structure.power_required(to) - structure.power_required(from);
            if excess - used - delta <= 0.0 {
                break;
            }
            structure.set_power_mode(to);
            used += delta;
            ledger.raised += 1;
            self.events.push(PowerEvent::StructureModeChanged {
                structure: structure.name().to_string(),
                from,
                to,
            });
        }
        used
    }

    /// Sheds structures out of `from` until the saving covers `needed`.
    ///
    /// A structure's saving is its load reduction less any generation the
    /// lower mode takes away; structures that save nothing are skipped. The
    /// structure that would complete the cover is left alone when its own
    /// generation exceeds its reduced load.
    fn shed_structures(
        &mut self,
        life_support: bool,
        from: PowerMode,
        needed: f64,
        ledger: &mut TickLedger<'_>,
    ) -> f64 {
        let Some(to) = from.lowered() else {
            return 0.0;
        };
        let mut saved = 0.0;
        for structure in &mut self.structures {
            if structure.life_support() != life_support
                || !structure.is_mode_adjustable()
                || structure.power_mode() != from
            {
                continue;
            }
            let lost_generation = structure.projected_generation(ledger.env, from)
                - structure.projected_generation(ledger.env, to);
            let delta = structure.power_required(from)
                - structure.power_required(to)
                - lost_generation.max(0.0);
            if delta <= EPSILON {
                continue;
            }
            let covers = needed - saved - delta <= 0.0;
            if covers && structure.generates_more_than_load(ledger.env, to) {
                break;
            }
            structure.set_power_mode(to);
            saved += delta;
            ledger.shed += 1;
            self.events.push(PowerEvent::StructureModeChanged {
                structure: structure.name().to_string(),
                from,
                to,
            });
            if covers {
                break;
            }
        }
        saved
    }

    /// Switches off running generators whose output the surplus can spare.
    fn shut_down_generators(&mut self, excess: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let mut used = 0.0;
        for structure in &mut self.structures {
            let (name, Some(generation)) = structure.named_generation_mut() else {
                continue;
            };
            for source in generation.sources_mut() {
                let Some(generator) = source.as_fuel_mut() else {
                    continue;
                };
                if !generator.is_toggled_on() {
                    continue;
                }
                let output = generator.projected_power(ledger.env);
                if output > excess - used {
                    continue;
                }
                generator.toggle_off();
                used += output;
                self.events.push(PowerEvent::GeneratorToggled {
                    structure: name.to_string(),
                    on: false,
                });
            }
        }
        used
    }

    /// Starts or raises generators to `percent`, burning fuel for the added output.
    ///
    /// Generators in unpowered structures stay off; low-power structures
    /// only run theirs at low output.
    fn ramp_generators(&mut self, percent: f64, needed: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let mut gained = 0.0;
        for structure in &mut self.structures {
            let ceiling = match structure.power_mode() {
                PowerMode::NoPower => continue,
                PowerMode::LowPower => LOW_OUTPUT_PERCENT,
                PowerMode::FullPower => FULL_OUTPUT_PERCENT,
            };
            let target = percent.min(ceiling);
            let (name, Some(generation)) = structure.named_generation_mut() else {
                continue;
            };
            for source in generation.sources_mut() {
                if needed - gained <= 0.0 {
                    return gained;
                }
                let Some(generator) = source.as_fuel_mut() else {
                    continue;
                };
                if generator.is_starved() {
                    continue;
                }
                let was_on = generator.is_toggled_on();
                let kw = generator.ramp_up(target, ledger.elapsed_millisols, &mut self.store);
                if kw <= 0.0 {
                    continue;
                }
                gained += kw;
                if !was_on {
                    self.events.push(PowerEvent::GeneratorToggled {
                        structure: name.to_string(),
                        on: true,
                    });
                }
            }
        }
        gained
    }

    /// Steps every reactor up one increment until the gain covers `needed`.
    fn step_reactors_up(&mut self, needed: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let mut gained = 0.0;
        for structure in &mut self.structures {
            let (name, Some(generation)) = structure.named_generation_mut() else {
                continue;
            };
            for source in generation.sources_mut() {
                if needed - gained <= 0.0 {
                    return gained;
                }
                let Some(reactor) = source.as_adjustable_mut() else {
                    continue;
                };
                if reactor.load_capacity() >= MAX_LOAD_CAPACITY {
                    continue;
                }
                let before = reactor.projected_power(ledger.env);
                reactor.increase_load_capacity();
                gained += reactor.projected_power(ledger.env) - before;
                self.events.push(PowerEvent::LoadCapacityChanged {
                    structure: name.to_string(),
                    percent: reactor.load_capacity(),
                });
            }
        }
        gained
    }

    /// Steps reactors down one increment where the reduction fits the surplus.
    fn step_reactors_down(&mut self, excess: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let mut shed = 0.0;
        for structure in &mut self.structures {
            let (name, Some(generation)) = structure.named_generation_mut() else {
                continue;
            };
            for source in generation.sources_mut() {
                if excess - shed <= EPSILON {
                    return shed;
                }
                let Some(reactor) = source.as_adjustable_mut() else {
                    continue;
                };
                let load = reactor.load_capacity();
                if load <= MIN_LOAD_CAPACITY {
                    continue;
                }
                let next = (load - LOAD_CAPACITY_STEP).max(MIN_LOAD_CAPACITY);
                let reduction =
                    reactor.measure_power(load, ledger.env) - reactor.measure_power(next, ledger.env);
                if reduction > excess - shed {
                    continue;
                }
                reactor.decrease_load_capacity();
                shed += reduction;
                self.events.push(PowerEvent::LoadCapacityChanged {
                    structure: name.to_string(),
                    percent: reactor.load_capacity(),
                });
            }
        }
        shed
    }

    /// Charges storage units in order with the surplus; returns the kW absorbed.
    fn store_surplus(&mut self, excess: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let hours = ledger.hours;
        if hours <= 0.0 {
            return 0.0;
        }
        let energy = excess * hours * self.system_efficiency;
        let mut accepted = 0.0;
        for unit in self.structures.iter_mut().filter_map(Structure::storage_mut) {
            if energy - accepted <= EPSILON {
                break;
            }
            if unit.is_nearly_full() {
                continue;
            }
            accepted += unit.charge(energy - accepted, hours);
        }
        accepted / (hours * self.system_efficiency)
    }

    /// Discharges storage units in order; returns the kW delivered to the bus.
    fn draw_storage(&mut self, needed: f64, ledger: &mut TickLedger<'_>) -> f64 {
        let hours = ledger.hours;
        if hours <= 0.0 {
            return 0.0;
        }
        let energy = needed * hours / BATTERY_DELIVERY_EFFICIENCY;
        let mut delivered = 0.0;
        for unit in self.structures.iter_mut().filter_map(Structure::storage_mut) {
            if energy - delivered <= EPSILON {
                break;
            }
            delivered += unit.discharge(energy - delivered, hours);
        }
        delivered * BATTERY_DELIVERY_EFFICIENCY / hours
    }

    fn degrade_efficiency(&mut self, elapsed_millisols: f64) {
        let loss = self.degradation_rate_per_sol * elapsed_millisols / MILLISOLS_PER_SOL;
        if loss.is_finite() && loss > 0.0 {
            self.system_efficiency =
                (self.system_efficiency * (1.0 - loss)).clamp(MIN_SYSTEM_EFFICIENCY, 1.0);
        }
    }

    /// Recomputes totals from structure state and queues change events.
    fn finish_tick(&mut self, env: &EnvironmentSnapshot, residual: f64) {
        let mut generated = 0.0;
        for structure in &mut self.structures {
            let mode = structure.power_mode();
            if let Some(generation) = structure.generation_mut() {
                generated += generation.recompute(env, mode);
            }
        }
        let required = self.required_power();
        let stored = self.stored_energy();
        let capacity = self.storage_capacity();
        let value = required / (generated + stored / 2.0 + 1.0);

        if changed(self.total_generated, generated) {
            self.events.push(PowerEvent::GeneratedPowerChanged { kw: generated });
        }
        if changed(self.total_required, required) {
            self.events.push(PowerEvent::RequiredPowerChanged { kw: required });
        }
        if changed(self.total_stored, stored) {
            self.events.push(PowerEvent::StoredEnergyChanged { kwh: stored });
        }
        if changed(self.total_storage_capacity, capacity) {
            self.events.push(PowerEvent::StorageCapacityChanged { kwh: capacity });
        }
        if changed(self.power_value, value) {
            self.events.push(PowerEvent::PowerValueChanged { value });
        }

        let sufficient = residual <= EPSILON;
        if !sufficient && self.sufficient_power {
            self.events.push(PowerEvent::Brownout {
                shortfall_kw: residual,
            });
        } else if sufficient && !self.sufficient_power {
            self.events.push(PowerEvent::PowerRestored);
        }

        self.total_generated = generated;
        self.total_required = required;
        self.total_stored = stored;
        self.total_storage_capacity = capacity;
        self.power_value = value;
        self.sufficient_power = sufficient;
    }

    /// Applies a grid-wide mode to every mode-adjustable structure.
    pub fn set_power_mode(&mut self, mode: PowerMode) {
        self.power_mode = mode;
        for structure in &mut self.structures {
            if !structure.is_mode_adjustable() {
                continue;
            }
            if let Some(from) = structure.set_power_mode(mode) {
                self.events.push(PowerEvent::StructureModeChanged {
                    structure: structure.name().to_string(),
                    from,
                    to: mode,
                });
            }
        }
        debug!(%mode, "grid power mode set");
        self.events.push(PowerEvent::GridModeChanged { mode });
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power_mode
    }

    /// Appends a structure; it is visited after all existing ones.
    pub fn add_structure(&mut self, structure: Structure) {
        self.structures.push(structure);
    }

    /// Removes the first structure with `name`, keeping the order of the rest.
    pub fn remove_structure(&mut self, name: &str) -> Option<Structure> {
        let index = self.structures.iter().position(|s| s.name() == name)?;
        Some(self.structures.remove(index))
    }

    pub fn structure(&self, name: &str) -> Option<&Structure> {
        self.structures.iter().find(|s| s.name() == name)
    }

    pub fn structure_mut(&mut self, name: &str) -> Option<&mut Structure> {
        self.structures.iter_mut().find(|s| s.name() == name)
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.store
    }

    pub fn resources_mut(&mut self) -> &mut ResourceStore {
        &mut self.store
    }

    /// Takes all queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<PowerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Maintenance time of every source on the grid (millisols).
    pub fn maintenance_time(&self) -> f64 {
        self.structures.iter().map(Structure::maintenance_time).sum()
    }

    /// Total methane burned since construction (kg).
    pub fn fuel_burned(&self) -> f64 {
        self.structures
            .iter()
            .filter_map(Structure::generation)
            .map(|g| g.fuel_burned())
            .sum()
    }

    pub fn generated_power(&self) -> f64 {
        self.total_generated
    }

    pub fn required_power_total(&self) -> f64 {
        self.total_required
    }

    pub fn stored_energy_total(&self) -> f64 {
        self.total_stored
    }

    pub fn storage_capacity_total(&self) -> f64 {
        self.total_storage_capacity
    }

    pub fn system_efficiency(&self) -> f64 {
        self.system_efficiency
    }

    pub fn sufficient_power(&self) -> bool {
        self.sufficient_power
    }

    pub fn power_value(&self) -> f64 {
        self.power_value
    }

    fn required_power(&self) -> f64 {
        self.structures.iter().map(Structure::full_power_kw).sum()
    }

    fn stored_energy(&self) -> f64 {
        self.structures
            .iter()
            .filter_map(Structure::storage)
            .map(|u| u.stored_kwh())
            .sum()
    }

    fn storage_capacity(&self) -> f64 {
        self.structures
            .iter()
            .filter_map(Structure::storage)
            .map(StorageUnit::capacity_kwh)
            .sum()
    }
}

fn changed(old: f64, new: f64) -> bool {
    (old - new).abs() > EVENT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::aggregator::GenerationAggregator;
    use crate::sim::structure::StructureCategory;
    use crate::sources::{FuelPowerSource, ReactorSource, WindSource};
    use crate::storage::StorageUnit;

    fn cfg() -> SimConfig {
        SimConfig::new(1, 10.0, 7)
    }

    fn pulse() -> ClockPulse {
        ClockPulse::new(0, 10.0, 0.0)
    }

    fn plant(name: &str, sources: Vec<crate::sources::GenerationSource>) -> Structure {
        Structure::new(name, StructureCategory::Power, 0.0, 0.0)
            .with_generation(GenerationAggregator::new(sources, None))
    }

    #[test]
    fn excess_raises_life_support_first() {
        // 60 kW against 30 kW × 1.1: 27 kW to spend.
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(2, 100.0, 0.3, 100.0).into()]),
            Structure::new("lab", StructureCategory::Laboratory, 10.0, 4.0)
                .with_mode(PowerMode::NoPower),
            Structure::new("hab", StructureCategory::Habitat, 20.0, 8.0)
                .with_life_support(true)
                .with_mode(PowerMode::NoPower),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());

        assert_eq!(report.branch, BalanceBranch::Excess);
        assert_eq!(report.stages[0], BalanceStage::RaiseLifeSupportToLow);
        // hab: +8, +12; lab: +4 fits, +6 does not.
        assert_eq!(grid.structure("hab").map(Structure::power_mode), Some(PowerMode::FullPower));
        assert_eq!(grid.structure("lab").map(Structure::power_mode), Some(PowerMode::LowPower));
        assert_eq!(report.structures_raised, 3);
        assert!(report.sufficient_power);
    }

    #[test]
    fn raise_stops_at_first_structure_that_does_not_fit() {
        // 300 kW against 210 kW × 1.1: 69 kW to spend.
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(10, 100.0, 0.3, 100.0).into()]),
            Structure::new("lab A", StructureCategory::Laboratory, 100.0, 60.0)
                .with_mode(PowerMode::NoPower),
            Structure::new("lab B", StructureCategory::Laboratory, 100.0, 60.0)
                .with_mode(PowerMode::NoPower),
            Structure::new("lab C", StructureCategory::Laboratory, 10.0, 1.0)
                .with_mode(PowerMode::NoPower),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        let mode = |n: &str| grid.structure(n).map(Structure::power_mode);
        assert_eq!(mode("lab A"), Some(PowerMode::LowPower));
        assert_eq!(mode("lab B"), Some(PowerMode::NoPower));
        assert_eq!(mode("lab C"), Some(PowerMode::NoPower));
    }

    #[test]
    fn deficit_reactor_steps_cover_gap() {
        // 60 kWe against 60 kW × 1.1 = 66 kW: two +3 kW steps close the gap.
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(2, 100.0, 0.3, 100.0).into()]),
            Structure::new("hab", StructureCategory::Habitat, 60.0, 20.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        assert_eq!(report.branch, BalanceBranch::Deficit);
        assert_eq!(
            report.stages,
            vec![
                BalanceStage::ReactorStepUp,
                BalanceStage::DrawStorage,
                BalanceStage::StartGeneratorsLow,
                BalanceStage::ReactorStepUp,
            ]
        );
        assert!(report.sufficient_power);
        assert!((report.generated_kw - 66.0).abs() < 1e-9);
        assert_eq!(report.structures_shed, 0);
    }

    #[test]
    fn deficit_starts_generator_and_burns_fuel() {
        let structures = vec![
            plant("gen", vec![FuelPowerSource::new(20.0, 0.5, false).into()]),
            Structure::new("hab", StructureCategory::Habitat, 5.0, 2.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::new(100.0, 400.0));
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        assert!(report.sufficient_power);
        assert!(report.stages.contains(&BalanceStage::StartGeneratorsLow));
        assert!((report.methane_burned_kg - 0.32).abs() < 1e-9);
        assert!((report.generated_kw - 10.0).abs() < 1e-9);
        let events = grid.drain_events();
        assert!(events.contains(&PowerEvent::GeneratorToggled {
            structure: "gen".into(),
            on: true
        }));
        assert!(grid.drain_events().is_empty());
    }

    #[test]
    fn shed_leaves_self_sufficient_structure_alone() {
        let turbine_farm = Structure::new("farm", StructureCategory::Workshop, 30.0, 5.0)
            .with_generation(GenerationAggregator::new(vec![WindSource::new(30.0, 1.2).into()], None));
        let structures = vec![turbine_farm];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night().with_wind(25.0));
        // 20 kW of wind against 33 kW margined: shedding the farm would cover it, but it out-produces its low load.
        assert_eq!(report.branch, BalanceBranch::Deficit);
        assert_eq!(grid.structure("farm").map(Structure::power_mode), Some(PowerMode::FullPower));
        assert!(!report.sufficient_power);
    }

    fn reactor_load(grid: &PowerGrid, name: &str) -> Option<f64> {
        grid.structure(name)
            .and_then(Structure::generation)
            .and_then(|g| g.sources()[0].as_adjustable())
            .map(|r| r.load_capacity())
    }

    fn generator_on(grid: &PowerGrid, name: &str) -> Option<bool> {
        grid.structure(name)
            .and_then(Structure::generation)
            .and_then(|g| g.sources()[0].as_fuel())
            .map(FuelPowerSource::is_toggled_on)
    }

    #[test]
    fn shedding_a_generator_host_does_not_count_its_output() {
        // 10 kWe against 50 kW × 1.1. The lab's generator starts at low output
        // and its load is shed to low; dropping it to no power would stop the
        // generator too, so that step saves nothing and the deficit remains.
        let lab = Structure::new("lab", StructureCategory::Laboratory, 20.0, 10.0).with_generation(
            GenerationAggregator::new(vec![FuelPowerSource::new(20.0, 0.5, false).into()], None),
        );
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(1, 100.0, 0.1, 100.0).into()]),
            lab,
            Structure::new("hab", StructureCategory::Habitat, 30.0, 14.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::new(100.0, 400.0));
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());

        assert_eq!(report.stages.len(), DEFICIT_STAGES.len());
        assert_eq!(grid.structure("lab").map(Structure::power_mode), Some(PowerMode::LowPower));
        assert_eq!(grid.structure("hab").map(Structure::power_mode), Some(PowerMode::LowPower));
        assert_eq!(generator_on(&grid, "lab"), Some(true));
        assert!((report.generated_kw - 21.0).abs() < 1e-9);
        assert!((report.residual_kw - 8.0).abs() < 1e-9);
        assert!(!report.sufficient_power);
    }

    #[test]
    fn deficit_runs_generators_to_full_output() {
        // Low output covers 10 of 16.5 kW; full output closes the gap.
        let structures = vec![
            plant("gen", vec![FuelPowerSource::new(20.0, 0.5, false).into()]),
            Structure::new("hab", StructureCategory::Habitat, 15.0, 14.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::new(100.0, 400.0));
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());

        assert_eq!(report.stages.last(), Some(&BalanceStage::StartGeneratorsFull));
        assert_eq!(report.stages.len(), 6);
        assert!(report.sufficient_power);
        assert!((report.generated_kw - 20.0).abs() < 1e-9);
        assert!((report.methane_burned_kg - 0.64).abs() < 1e-9);
        assert_eq!(grid.structure("hab").map(Structure::power_mode), Some(PowerMode::FullPower));
    }

    #[test]
    fn generator_shut_down_only_when_output_fits() {
        // 100 kW against 40 kW × 1.1: 56 kW spare. The 60 kW generator does
        // not fit; the 10 kW one does.
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()]),
            plant("big gen", vec![FuelPowerSource::new(60.0, 0.5, true).into()]),
            plant("small gen", vec![FuelPowerSource::new(10.0, 0.5, true).into()]),
            Structure::new("hab", StructureCategory::Habitat, 40.0, 10.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::new(100.0, 400.0));
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());

        assert_eq!(report.branch, BalanceBranch::Excess);
        assert!(report.stages.contains(&BalanceStage::ShutDownGenerators));
        assert_eq!(generator_on(&grid, "big gen"), Some(true));
        assert_eq!(generator_on(&grid, "small gen"), Some(false));

        let events = grid.drain_events();
        assert!(events.contains(&PowerEvent::GeneratorToggled {
            structure: "small gen".into(),
            on: false
        }));
        assert!(!events.contains(&PowerEvent::GeneratorToggled {
            structure: "big gen".into(),
            on: false
        }));
        assert!(report.sufficient_power);
    }

    #[test]
    fn reactor_step_down_only_when_reduction_fits() {
        // 330 kWe against 290 kW × 1.1 = 319 kW: 11 kW spare. A step on the
        // large reactor sheds 15 kW and is skipped; the small one sheds 1.5 kW.
        let structures = vec![
            plant("large", vec![ReactorSource::fission(10, 100.0, 0.3, 100.0).into()]),
            plant("small", vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()]),
            Structure::new("hab", StructureCategory::Habitat, 290.0, 100.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());

        assert_eq!(report.branch, BalanceBranch::Excess);
        assert!(report.stages.contains(&BalanceStage::RandomReactorStepDown));
        assert!(report.stages.contains(&BalanceStage::ReactorStepDown));
        assert_eq!(reactor_load(&grid, "large"), Some(100.0));
        let small = reactor_load(&grid, "small").unwrap_or(100.0);
        assert!(small == 95.0 || small == 90.0, "small reactor at {small}%");
        assert!((report.generated_kw - (300.0 + 0.3 * small)).abs() < 1e-9);
        assert!(grid.drain_events().iter().all(|e| !matches!(
            e,
            PowerEvent::LoadCapacityChanged { structure, .. } if structure == "large"
        )));
    }

    #[test]
    fn remaining_surplus_reaches_storage_stage_when_nothing_absorbs_it() {
        // Wind is not adjustable and the only battery is within 1% of full.
        let structures = vec![
            plant("turbines", vec![WindSource::new(30.0, 1.2).into()]),
            Structure::new("bank", StructureCategory::Storage, 0.0, 0.0)
                .with_storage(StorageUnit::new(100.0, 99.5, 10.0, 10.0)),
            Structure::new("hab", StructureCategory::Habitat, 5.0, 2.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night().with_wind(25.0));

        assert_eq!(report.stages.len(), EXCESS_STAGES.len());
        assert_eq!(report.stages.last(), Some(&BalanceStage::StoreRemainingSurplus));
        assert_eq!(report.stored_kwh, 99.5);
        assert!(report.residual_kw < 0.0);
        assert!(report.sufficient_power);
    }

    #[test]
    fn brownout_and_restore_events() {
        let structures = vec![
            Structure::new("hab", StructureCategory::Habitat, 10.0, 5.0).with_life_support(true),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        assert!(!report.sufficient_power);
        assert_eq!(grid.structure("hab").map(Structure::power_mode), Some(PowerMode::LowPower));
        assert!(grid
            .drain_events()
            .iter()
            .any(|e| matches!(e, PowerEvent::Brownout { .. })));

        grid.add_structure(plant("reactor", vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()]));
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        assert!(report.sufficient_power);
        assert!(grid.drain_events().contains(&PowerEvent::PowerRestored));
    }

    #[test]
    fn surplus_goes_to_storage_in_order() {
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()]),
            Structure::new("bank A", StructureCategory::Storage, 0.0, 0.0)
                .with_storage(StorageUnit::new(100.0, 100.0, 50.0, 50.0)),
            Structure::new("bank B", StructureCategory::Storage, 0.0, 0.0)
                .with_storage(StorageUnit::new(100.0, 0.0, 50.0, 50.0)),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        let report = grid.time_passing(&pulse(), &EnvironmentSnapshot::night());
        assert!(report.stages.contains(&BalanceStage::StoreSurplus));
        let stored_b = grid.structure("bank B").and_then(Structure::storage).map(StorageUnit::stored_kwh);
        assert!(stored_b.is_some_and(|kwh| kwh > 0.0));
        assert!(report.stored_kwh > 100.0);
    }

    #[test]
    fn system_efficiency_decays() {
        let mut grid = PowerGrid::new(&cfg(), Vec::new(), ResourceStore::default());
        grid.time_passing(&ClockPulse::new(0, 1000.0, 0.0), &EnvironmentSnapshot::night());
        assert!((grid.system_efficiency() - (1.0 - 0.0004)).abs() < 1e-12);
    }

    #[test]
    fn set_power_mode_skips_power_plants() {
        let structures = vec![
            plant("reactor", vec![ReactorSource::fission(1, 100.0, 0.3, 100.0).into()]),
            Structure::new("lab", StructureCategory::Laboratory, 10.0, 4.0),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        grid.set_power_mode(PowerMode::LowPower);
        assert_eq!(grid.power_mode(), PowerMode::LowPower);
        assert_eq!(grid.structure("lab").map(Structure::power_mode), Some(PowerMode::LowPower));
        assert_eq!(grid.structure("reactor").map(Structure::power_mode), Some(PowerMode::FullPower));
        let events = grid.drain_events();
        assert_eq!(events.last(), Some(&PowerEvent::GridModeChanged { mode: PowerMode::LowPower }));
    }

    #[test]
    fn remove_structure_by_name() {
        let structures = vec![
            Structure::new("a", StructureCategory::Habitat, 1.0, 1.0),
            Structure::new("b", StructureCategory::Habitat, 2.0, 1.0),
        ];
        let mut grid = PowerGrid::new(&cfg(), structures, ResourceStore::default());
        assert!(grid.remove_structure("a").is_some());
        assert!(grid.remove_structure("a").is_none());
        assert_eq!(grid.structures().len(), 1);
        assert!((grid.maintenance_time()).abs() < 1e-12);
    }

    #[test]
    fn grid_can_move_across_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<PowerGrid>();
    }
}
