//! Common types and traits for generation sources.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, rngs::StdRng};

use crate::sim::environment::EnvironmentSnapshot;
use crate::sim::resources::ResourceStore;
use crate::sim::types::PowerMode;

/// Variant tag of a generation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Fission,
    Thermionic,
    Fuel,
    Photovoltaic,
    SolarThermal,
    Wind,
    Areothermal,
}

impl SourceKind {
    /// Returns `true` for sources whose output is scaled by a dust efficiency model.
    pub fn is_solar(self) -> bool {
        matches!(self, Self::Photovoltaic | Self::SolarThermal)
    }

    /// Returns `true` for sources with an adjustable load capacity.
    pub fn is_adjustable(self) -> bool {
        matches!(self, Self::Fission | Self::Thermionic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fission => "fission",
            Self::Thermionic => "thermionic",
            Self::Fuel => "fuel",
            Self::Photovoltaic => "solar",
            Self::SolarThermal => "solar_thermal",
            Self::Wind => "wind",
            Self::Areothermal => "areothermal",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a source tag that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown generation source kind \"{0}\"")]
pub struct UnknownSourceKind(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fission" => Ok(Self::Fission),
            "thermionic" => Ok(Self::Thermionic),
            "fuel" | "methane" => Ok(Self::Fuel),
            "solar" | "photovoltaic" => Ok(Self::Photovoltaic),
            "solar_thermal" => Ok(Self::SolarThermal),
            "wind" => Ok(Self::Wind),
            "areothermal" => Ok(Self::Areothermal),
            _ => Err(UnknownSourceKind(s.to_string())),
        }
    }
}

/// Per-structure context for the stateful power read.
pub struct StructureContext<'a> {
    /// Conditions at the structure.
    pub env: &'a EnvironmentSnapshot,
    /// Settlement bulk store that combustion sources refill from.
    pub store: &'a mut ResourceStore,
    /// Time covered by this read (millisols).
    pub elapsed_millisols: f64,
    /// Power mode of the owning structure.
    pub power_mode: PowerMode,
}

/// Trait implemented by every generation source variant.
///
/// All returned powers are in kW and never NaN or infinite.
pub trait PowerSource {
    /// Variant tag.
    fn kind(&self) -> SourceKind;

    /// Design rating (kW).
    fn max_power(&self) -> f64;

    /// Highest output the source may ever report (kW).
    fn overload_ceiling(&self) -> f64 {
        self.max_power()
    }

    /// Power produced over this tick; may consume resources.
    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64;

    /// Side-effect-free estimate of what `current_power` would report now.
    fn projected_power(&self, env: &EnvironmentSnapshot) -> f64;

    /// Power averaged over a sol.
    fn average_power(&self, env: &EnvironmentSnapshot) -> f64;

    /// Maintenance time this source needs (millisols).
    fn maintenance_time(&self) -> f64;

    /// Power the source would produce at `percent` of its capacity.
    fn measure_power(&self, percent: f64, env: &EnvironmentSnapshot) -> f64;
}

/// Secondary capability for sources whose load capacity can be stepped.
pub trait AdjustablePowerSource: PowerSource {
    /// Current load capacity (percent).
    fn load_capacity(&self) -> f64;

    /// Raises the load capacity by one step.
    fn increase_load_capacity(&mut self);

    /// Lowers the load capacity by one step.
    fn decrease_load_capacity(&mut self);
}

/// Coerces NaN and infinite power values to zero and clamps negatives.
pub fn finite_or_zero(kw: f64) -> f64 {
    if kw.is_finite() { kw.max(0.0) } else { 0.0 }
}

/// Generates Gaussian noise using the Box-Muller transform.
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and the given standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 || !std_dev.is_finite() {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
