//! Change notifications emitted by the grid.

use std::fmt;

use tracing::{debug, info, warn};

use super::types::PowerMode;

/// A fire-and-forget notification about grid state.
///
/// The grid queues events as they happen; hosts collect them with
/// [`PowerGrid::drain_events`](super::grid::PowerGrid::drain_events).
#[derive(Debug, Clone, PartialEq)]
pub enum PowerEvent {
    GeneratedPowerChanged { kw: f64 },
    StoredEnergyChanged { kwh: f64 },
    StorageCapacityChanged { kwh: f64 },
    RequiredPowerChanged { kw: f64 },
    PowerValueChanged { value: f64 },
    StructureModeChanged {
        structure: String,
        from: PowerMode,
        to: PowerMode,
    },
    GridModeChanged { mode: PowerMode },
    GeneratorToggled { structure: String, on: bool },
    LoadCapacityChanged { structure: String, percent: f64 },
    /// Margined demand could not be covered this tick.
    Brownout { shortfall_kw: f64 },
    PowerRestored,
}

impl PowerEvent {
    /// Writes the event to the tracing subscriber at a level matching its severity.
    pub fn log(&self) {
        match self {
            Self::Brownout { shortfall_kw } => {
                warn!(shortfall_kw = *shortfall_kw, "settlement brownout");
            }
            Self::PowerRestored => info!("settlement power restored"),
            Self::StructureModeChanged { .. }
            | Self::GridModeChanged { .. }
            | Self::GeneratorToggled { .. } => info!("{self}"),
            _ => debug!("{self}"),
        }
    }
}

impl fmt::Display for PowerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneratedPowerChanged { kw } => write!(f, "generated power now {kw:.2} kW"),
            Self::StoredEnergyChanged { kwh } => write!(f, "stored energy now {kwh:.2} kWh"),
            Self::StorageCapacityChanged { kwh } => {
                write!(f, "storage capacity now {kwh:.2} kWh")
            }
            Self::RequiredPowerChanged { kw } => write!(f, "required power now {kw:.2} kW"),
            Self::PowerValueChanged { value } => write!(f, "power value now {value:.4}"),
            Self::StructureModeChanged {
                structure,
                from,
                to,
            } => write!(f, "{structure}: {from} -> {to}"),
            Self::GridModeChanged { mode } => write!(f, "grid mode set to {mode}"),
            Self::GeneratorToggled { structure, on } => {
                let state = if *on { "on" } else { "off" };
                write!(f, "{structure}: generator switched {state}")
            }
            Self::LoadCapacityChanged { structure, percent } => {
                write!(f, "{structure}: reactor load capacity {percent:.0}%")
            }
            Self::Brownout { shortfall_kw } => write!(f, "brownout, short {shortfall_kw:.2} kW"),
            Self::PowerRestored => f.write_str("power restored"),
        }
    }
}
