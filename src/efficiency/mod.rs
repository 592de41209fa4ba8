//! Environmental efficiency models applied to solar generation.

pub mod mechanical;
pub mod optical;

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;

use crate::sim::environment::EnvironmentSnapshot;

pub use mechanical::WindCleaning;
pub use optical::OpticalSoiling;

/// Dust deposited on panels per sol in clear weather (fraction).
pub const DEPOSITION_PER_SOL: f64 = 0.002;
/// Deposition multiplier while a dust storm is active.
pub const STORM_DEPOSITION_MULTIPLIER: f64 = 5.0;
/// Default upper bound on accumulated soiling.
pub const DEFAULT_MAX_SOILING: f64 = 0.9;

/// A model that scales solar output by environmental losses.
pub trait EfficiencyModel {
    /// Current efficiency in `[0, 1]`, never NaN.
    fn efficiency(&self) -> f64;

    /// Advances the model state by `elapsed_sols` under `env`.
    fn advance(&mut self, env: &EnvironmentSnapshot, elapsed_sols: f64, rng: &mut StdRng);
}

/// Clamps a soiling cap to `[0, 1]`, falling back to the default for non-finite input.
pub(crate) fn sanitize_max_soiling(max_soiling: f64) -> f64 {
    if max_soiling.is_finite() {
        max_soiling.clamp(0.0, 1.0)
    } else {
        DEFAULT_MAX_SOILING
    }
}

/// Returns the elapsed time when it is usable, `None` for negative or non-finite input.
pub(crate) fn sanitize_sols(elapsed_sols: f64) -> Option<f64> {
    (elapsed_sols.is_finite() && elapsed_sols >= 0.0).then_some(elapsed_sols)
}

/// The dust model attached to one aggregator.
#[derive(Debug, Clone)]
pub enum DustModel {
    Optical(OpticalSoiling),
    Mechanical(WindCleaning),
}

impl DustModel {
    pub fn optical() -> Self {
        Self::Optical(OpticalSoiling::default())
    }

    pub fn mechanical() -> Self {
        Self::Mechanical(WindCleaning::default())
    }

    /// Current panel soiling (fraction).
    pub fn soiling(&self) -> f64 {
        match self {
            Self::Optical(m) => m.soiling(),
            Self::Mechanical(m) => m.soiling(),
        }
    }

    /// Crew cleaning, see [`WindCleaning::manual_clean`]. Returns the fraction removed.
    pub fn manual_clean(&mut self, brushing_millisols: f64, throughput_per_millisol: f64) -> f64 {
        match self {
            Self::Optical(m) => m.clean(brushing_millisols * throughput_per_millisol),
            Self::Mechanical(m) => m.manual_clean(brushing_millisols, throughput_per_millisol),
        }
    }
}

impl EfficiencyModel for DustModel {
    fn efficiency(&self) -> f64 {
        match self {
            Self::Optical(m) => m.efficiency(),
            Self::Mechanical(m) => m.efficiency(),
        }
    }

    fn advance(&mut self, env: &EnvironmentSnapshot, elapsed_sols: f64, rng: &mut StdRng) {
        match self {
            Self::Optical(m) => m.advance(env, elapsed_sols, rng),
            Self::Mechanical(m) => m.advance(env, elapsed_sols, rng),
        }
    }
}

/// Configured dust model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DustModelKind {
    Optical,
    Mechanical,
    None,
}

impl DustModelKind {
    pub fn build(self) -> Option<DustModel> {
        match self {
            Self::Optical => Some(DustModel::optical()),
            Self::Mechanical => Some(DustModel::mechanical()),
            Self::None => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optical => "optical",
            Self::Mechanical => "mechanical",
            Self::None => "none",
        }
    }
}

impl fmt::Display for DustModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dust model \"{0}\" (expected optical, mechanical or none)")]
pub struct UnknownDustModel(pub String);

impl FromStr for DustModelKind {
    type Err = UnknownDustModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optical" => Ok(Self::Optical),
            "mechanical" => Ok(Self::Mechanical),
            "none" | "" => Ok(Self::None),
            _ => Err(UnknownDustModel(s.to_string())),
        }
    }
}
