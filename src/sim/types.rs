//! Core simulation types: configuration, power modes, and tick records.

use std::fmt;
use std::str::FromStr;

use super::clock::MILLISOLS_PER_SOL;

/// Safety margin applied to demand before comparing it with supply.
pub const ROLLING_FACTOR: f64 = 1.1;

/// Fractional loss of overall grid efficiency per sol.
pub const DEGRADATION_RATE_PER_SOL: f64 = 0.0004;

/// Centralized simulation configuration.
///
/// # Examples
///
/// ```
/// use colony_grid::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2, 50.0, 42);
/// assert_eq!(cfg.ticks_per_sol(), 20);
/// assert_eq!(cfg.total_ticks(), 40);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of sols to simulate.
    pub sols: usize,
    /// Duration of one tick in millisols.
    pub millisols_per_tick: f64,
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Demand safety margin.
    pub rolling_factor: f64,
    /// System efficiency degradation per sol.
    pub degradation_rate_per_sol: f64,
}

impl SimConfig {
    /// Creates a new simulation configuration with the default margin and degradation.
    ///
    /// # Panics
    ///
    /// Panics if `sols` is zero or `millisols_per_tick` does not divide a sol
    /// (see [`tick_divides_sol`]).
    pub fn new(sols: usize, millisols_per_tick: f64, seed: u64) -> Self {
        assert!(sols > 0, "sols must be > 0");
        assert!(
            tick_divides_sol(millisols_per_tick),
            "millisols_per_tick must divide 1000 evenly"
        );
        Self {
            sols,
            millisols_per_tick,
            seed,
            rolling_factor: ROLLING_FACTOR,
            degradation_rate_per_sol: DEGRADATION_RATE_PER_SOL,
        }
    }

    /// Ticks in one sol.
    pub fn ticks_per_sol(&self) -> usize {
        (MILLISOLS_PER_SOL / self.millisols_per_tick).round() as usize
    }

    /// Total number of ticks across all sols.
    pub fn total_ticks(&self) -> usize {
        self.ticks_per_sol() * self.sols
    }
}

/// Whether a whole number of ticks of this length makes up one sol, so sol
/// boundaries always fall on a tick.
pub fn tick_divides_sol(millisols_per_tick: f64) -> bool {
    if !(millisols_per_tick.is_finite()
        && millisols_per_tick > 0.0
        && millisols_per_tick <= MILLISOLS_PER_SOL)
    {
        return false;
    }
    let ticks = MILLISOLS_PER_SOL / millisols_per_tick;
    (ticks - ticks.round()).abs() < 1e-9
}

/// Per-structure demand tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PowerMode {
    NoPower,
    LowPower,
    FullPower,
}

impl PowerMode {
    /// Returns the next mode up, if any.
    pub fn raised(self) -> Option<Self> {
        match self {
            Self::NoPower => Some(Self::LowPower),
            Self::LowPower => Some(Self::FullPower),
            Self::FullPower => None,
        }
    }

    /// Returns the next mode down, if any.
    pub fn lowered(self) -> Option<Self> {
        match self {
            Self::FullPower => Some(Self::LowPower),
            Self::LowPower => Some(Self::NoPower),
            Self::NoPower => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPower => "no_power",
            Self::LowPower => "low_power",
            Self::FullPower => "full_power",
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized power mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown power mode \"{0}\", expected full_power, low_power or no_power")]
pub struct UnknownPowerMode(pub String);

impl FromStr for PowerMode {
    type Err = UnknownPowerMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full_power" | "full" => Ok(Self::FullPower),
            "low_power" | "low" => Ok(Self::LowPower),
            "no_power" | "none" | "off" => Ok(Self::NoPower),
            _ => Err(UnknownPowerMode(s.to_string())),
        }
    }
}

/// Which side of the balance a tick ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceBranch {
    Excess,
    Deficit,
}

impl BalanceBranch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excess => "excess",
            Self::Deficit => "deficit",
        }
    }
}

/// One stage of the balancing algorithm, in the order stages may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStage {
    RaiseLifeSupportToLow,
    RaiseLifeSupportToFull,
    ShutDownGenerators,
    RaiseOthersToLow,
    RaiseOthersToFull,
    StoreSurplus,
    RandomReactorStepDown,
    ReactorStepDown,
    StoreRemainingSurplus,
    ReactorStepUp,
    DrawStorage,
    StartGeneratorsLow,
    ShedOthersToLow,
    StartGeneratorsFull,
    ShedOthersToNone,
    ShedLifeSupportToLow,
}

impl BalanceStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RaiseLifeSupportToLow => "raise_life_support_low",
            Self::RaiseLifeSupportToFull => "raise_life_support_full",
            Self::ShutDownGenerators => "shut_down_generators",
            Self::RaiseOthersToLow => "raise_others_low",
            Self::RaiseOthersToFull => "raise_others_full",
            Self::StoreSurplus => "store_surplus",
            Self::RandomReactorStepDown => "random_reactor_step_down",
            Self::ReactorStepDown => "reactor_step_down",
            Self::StoreRemainingSurplus => "store_remaining_surplus",
            Self::ReactorStepUp => "reactor_step_up",
            Self::DrawStorage => "draw_storage",
            Self::StartGeneratorsLow => "start_generators_low",
            Self::ShedOthersToLow => "shed_others_low",
            Self::StartGeneratorsFull => "start_generators_full",
            Self::ShedOthersToNone => "shed_others_none",
            Self::ShedLifeSupportToLow => "shed_life_support_low",
        }
    }
}

impl fmt::Display for BalanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete record of one grid tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Tick index.
    pub tick: usize,
    /// Mission sol (from 1).
    pub mission_sol: u32,
    /// Millisol within the sol at the start of the tick.
    pub millisol: f64,
    /// Generation after balancing (kW).
    pub generated_kw: f64,
    /// Full-power demand of all structures (kW).
    pub required_kw: f64,
    /// Demand including the rolling safety margin (kW).
    pub margined_kw: f64,
    /// Energy held in storage after balancing (kWh).
    pub stored_kwh: f64,
    /// Total storage capacity (kWh).
    pub capacity_kwh: f64,
    /// Long-run system efficiency after this tick.
    pub system_efficiency: f64,
    /// Whether the settlement met its margined demand.
    pub sufficient_power: bool,
    /// Scarcity price of power.
    pub power_value: f64,
    /// Branch taken by the balancing pass.
    pub branch: BalanceBranch,
    /// Stages that ran, in order.
    pub stages: Vec<BalanceStage>,
    /// Shortfall left after all stages (kW, <= 0 when covered).
    pub residual_kw: f64,
    /// Structures moved down a power mode.
    pub structures_shed: usize,
    /// Structures moved up a power mode.
    pub structures_raised: usize,
    /// Methane burned by combustion generators this tick (kg).
    pub methane_burned_kg: f64,
}

impl TickReport {
    /// State of charge across all storage, or 0 when there is none.
    pub fn state_of_charge(&self) -> f64 {
        if self.capacity_kwh > 0.0 {
            self.stored_kwh / self.capacity_kwh
        } else {
            0.0
        }
    }

    /// Stage names joined by `|`.
    pub fn stage_list(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} (sol {:>3} @ {:>6.1}) | gen={:>8.2} kW  req={:>8.2} kW  \
             margin={:>8.2} kW | store={:>8.2} kWh ({:.1}%) | {} resid={:>7.2} \
             ok={} eff={:.4}",
            self.tick,
            self.mission_sol,
            self.millisol,
            self.generated_kw,
            self.required_kw,
            self.margined_kw,
            self.stored_kwh,
            self.state_of_charge() * 100.0,
            self.branch.as_str(),
            self.residual_kw,
            self.sufficient_power,
            self.system_efficiency,
        )
    }
}
