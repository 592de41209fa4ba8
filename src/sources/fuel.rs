use tracing::{debug, warn};

use crate::sim::environment::EnvironmentSnapshot;
use crate::sim::resources::ResourceStore;

use super::types::{PowerSource, SourceKind, StructureContext};

/// Grams of methane per millisol per kW at 100% thermal efficiency.
pub const CONSUMPTION_RATE: f64 = 1.6;
/// Oxidizer mass burned per unit of fuel mass.
pub const OXIDIZER_RATIO: f64 = 4.0;
/// Applied toggle work needed to flip the generator (millisols).
pub const TOGGLE_WORK_THRESHOLD: f64 = 2.0;
/// Operating percent used when a generator runs at low output.
pub const LOW_OUTPUT_PERCENT: f64 = 50.0;
/// Operating percent used when a generator runs at full output.
pub const FULL_OUTPUT_PERCENT: f64 = 100.0;

/// Local fuel tank size per kW of rating (kg).
const TANK_KG_PER_KW: f64 = 0.25;
/// Maintenance millisols per kW of rating.
const MAINTENANCE_PER_KW: f64 = 0.5;

/// A methane/oxygen combustion generator with local reserve tanks.
///
/// Output is zero unless toggled on. Each read burns fuel from the local
/// tanks, topping them off from the settlement store when they run low.
/// A generator that cannot be fed reports zero for that tick.
#[derive(Debug, Clone)]
pub struct FuelPowerSource {
    max_power: f64,
    /// Thermal efficiency of the combustion cycle (0..=1).
    pub thermal_efficiency: f64,
    toggled_on: bool,
    toggle_work: f64,
    operating_percent: f64,
    reserved_fuel: f64,
    reserved_oxidizer: f64,
    tank_capacity: f64,
    starved: bool,
    fuel_burned: f64,
}

impl FuelPowerSource {
    /// Creates a combustion generator.
    ///
    /// # Arguments
    ///
    /// * `max_power` - Rated output (kW)
    /// * `thermal_efficiency` - Combustion efficiency, clamped to `(0, 1]`
    /// * `toggled_on` - Whether the generator starts running at full output
    pub fn new(max_power: f64, thermal_efficiency: f64, toggled_on: bool) -> Self {
        let max_power = if max_power.is_finite() { max_power.max(0.0) } else { 0.0 };
        let thermal_efficiency = if thermal_efficiency.is_finite() && thermal_efficiency > 0.0 {
            thermal_efficiency.min(1.0)
        } else {
            1.0
        };
        Self {
            max_power,
            thermal_efficiency,
            toggled_on,
            toggle_work: 0.0,
            operating_percent: FULL_OUTPUT_PERCENT,
            reserved_fuel: 0.0,
            reserved_oxidizer: 0.0,
            tank_capacity: max_power * TANK_KG_PER_KW,
            starved: false,
            fuel_burned: 0.0,
        }
    }

    pub fn is_toggled_on(&self) -> bool {
        self.toggled_on
    }

    /// Turns the generator on immediately.
    pub fn toggle_on(&mut self) {
        self.toggled_on = true;
        self.toggle_work = 0.0;
    }

    /// Turns the generator off immediately.
    pub fn toggle_off(&mut self) {
        self.toggled_on = false;
        self.toggle_work = 0.0;
        self.starved = false;
    }

    /// Applies maintenance toggle work.
    ///
    /// The state flips once accumulated work reaches the threshold; the
    /// accumulator then restarts from zero.
    ///
    /// # Returns
    ///
    /// `true` if the generator changed state.
    pub fn add_toggle_work(&mut self, millisols: f64) -> bool {
        if !millisols.is_finite() || millisols <= 0.0 {
            return false;
        }
        self.toggle_work += millisols;
        if self.toggle_work + 1e-9 >= TOGGLE_WORK_THRESHOLD {
            self.toggled_on = !self.toggled_on;
            self.toggle_work = 0.0;
            self.starved = false;
            debug!(on = self.toggled_on, "generator toggled by maintenance work");
            true
        } else {
            false
        }
    }

    /// Accumulated toggle work below the threshold (millisols).
    pub fn toggle_work(&self) -> f64 {
        self.toggle_work
    }

    /// Operating point while on (percent of rating).
    pub fn operating_percent(&self) -> f64 {
        self.operating_percent
    }

    /// Sets the operating point, clamped to `[0, 100]`.
    pub fn set_operating_percent(&mut self, percent: f64) {
        if percent.is_finite() {
            self.operating_percent = percent.clamp(0.0, FULL_OUTPUT_PERCENT);
        }
    }

    pub fn reserved_fuel(&self) -> f64 {
        self.reserved_fuel
    }

    pub fn reserved_oxidizer(&self) -> f64 {
        self.reserved_oxidizer
    }

    /// Fuel tank size (kg); the oxidizer tank holds four times as much.
    pub fn tank_capacity(&self) -> f64 {
        self.tank_capacity
    }

    /// Whether the last read found no fuel.
    pub fn is_starved(&self) -> bool {
        self.starved
    }

    /// Total methane burned since construction (kg).
    pub fn fuel_burned(&self) -> f64 {
        self.fuel_burned
    }

    /// Fuel mass needed to run at `percent` for `elapsed_millisols`.
    pub fn fuel_demand(&self, percent: f64, elapsed_millisols: f64) -> f64 {
        if !elapsed_millisols.is_finite() || elapsed_millisols <= 0.0 {
            return 0.0;
        }
        self.max_power * percent.clamp(0.0, FULL_OUTPUT_PERCENT) / 100.0 * CONSUMPTION_RATE
            / 1000.0
            / self.thermal_efficiency
            * elapsed_millisols
    }

    /// Raises the operating point to `percent` during a tick, burning fuel
    /// for the added output only. A stopped generator ramps up from zero.
    ///
    /// # Returns
    ///
    /// Output added (kW), or 0 if the added fuel could not be supplied.
    pub fn ramp_up(
        &mut self,
        percent: f64,
        elapsed_millisols: f64,
        store: &mut ResourceStore,
    ) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        let target = percent.clamp(0.0, FULL_OUTPUT_PERCENT);
        let from = if self.toggled_on { self.operating_percent } else { 0.0 };
        let delta = target - from;
        if delta <= 0.0 || !self.consume(delta, elapsed_millisols, store) {
            return 0.0;
        }
        self.toggled_on = true;
        self.toggle_work = 0.0;
        self.starved = false;
        self.operating_percent = target;
        self.max_power * delta / 100.0
    }

    /// Tops the local tanks off from the store, keeping the 1:4 ratio.
    fn refill(&mut self, store: &mut ResourceStore) {
        let fuel_gap = (self.tank_capacity - self.reserved_fuel).max(0.0);
        let ox_gap = (self.tank_capacity * OXIDIZER_RATIO - self.reserved_oxidizer).max(0.0);
        let wanted = fuel_gap.min(ox_gap / OXIDIZER_RATIO);
        let (fuel, oxidizer) = store.withdraw_paired(wanted, OXIDIZER_RATIO);
        self.reserved_fuel += fuel;
        self.reserved_oxidizer += oxidizer;
    }

    /// Burns fuel for one tick at `percent`. Returns `false` when unfed.
    fn consume(&mut self, percent: f64, elapsed_millisols: f64, store: &mut ResourceStore) -> bool {
        let fuel = self.fuel_demand(percent, elapsed_millisols);
        let oxidizer = fuel * OXIDIZER_RATIO;

        if self.reserved_fuel < fuel || self.reserved_oxidizer < oxidizer {
            self.refill(store);
            // A tick larger than the tank can still run off tank plus store.
            if self.reserved_fuel < fuel || self.reserved_oxidizer < oxidizer {
                let (extra_fuel, extra_ox) =
                    store.withdraw_paired(fuel - self.reserved_fuel, OXIDIZER_RATIO);
                self.reserved_fuel += extra_fuel;
                self.reserved_oxidizer += extra_ox;
            }
            if self.reserved_fuel + 1e-12 < fuel || self.reserved_oxidizer + 1e-12 < oxidizer {
                return false;
            }
        }

        self.reserved_fuel = (self.reserved_fuel - fuel).max(0.0);
        self.reserved_oxidizer = (self.reserved_oxidizer - oxidizer).max(0.0);
        self.fuel_burned += fuel;
        true
    }
}

impl PowerSource for FuelPowerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Fuel
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        if !self.toggled_on {
            self.starved = false;
            return 0.0;
        }
        let percent = self.operating_percent;
        if self.consume(percent, ctx.elapsed_millisols, ctx.store) {
            self.starved = false;
            self.max_power * percent / 100.0
        } else {
            if !self.starved {
                warn!(
                    rating_kw = self.max_power,
                    "combustion generator out of methane/oxygen"
                );
            }
            self.starved = true;
            0.0
        }
    }

    fn projected_power(&self, _env: &EnvironmentSnapshot) -> f64 {
        if self.toggled_on && !self.starved {
            self.max_power * self.operating_percent / 100.0
        } else {
            0.0
        }
    }

    fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        self.projected_power(env)
    }

    fn maintenance_time(&self) -> f64 {
        self.max_power * MAINTENANCE_PER_KW
    }

    fn measure_power(&self, percent: f64, _env: &EnvironmentSnapshot) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        self.max_power * percent.clamp(0.0, FULL_OUTPUT_PERCENT) / 100.0
    }
}
