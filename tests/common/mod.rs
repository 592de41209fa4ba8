//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use colony_grid::sim::aggregator::GenerationAggregator;
use colony_grid::sim::clock::ClockPulse;
use colony_grid::sim::grid::PowerGrid;
use colony_grid::sim::resources::ResourceStore;
use colony_grid::sim::structure::{Structure, StructureCategory};
use colony_grid::sim::types::SimConfig;
use colony_grid::sources::ReactorSource;
use colony_grid::storage::StorageUnit;

/// One sol in ticks of 100 millisols, seed 42.
pub fn default_config() -> SimConfig {
    SimConfig::new(1, 100.0, 42)
}

/// Pulse for tick `tick` of [`default_config`].
pub fn pulse(tick: usize) -> ClockPulse {
    ClockPulse::new(tick, 100.0, tick as f64 * 100.0)
}

/// Power plant with a single fission module: `thermal_kw * conversion` kWe at 100% load.
pub fn reactor_plant(name: &str, thermal_kw: f64, conversion: f64) -> Structure {
    Structure::new(name, StructureCategory::Power, 0.0, 0.0).with_generation(
        GenerationAggregator::new(
            vec![ReactorSource::fission(1, thermal_kw, conversion, 100.0).into()],
            None,
        ),
    )
}

/// Habitat with life support.
pub fn habitat(name: &str, full_kw: f64, low_kw: f64) -> Structure {
    Structure::new(name, StructureCategory::Habitat, full_kw, low_kw).with_life_support(true)
}

/// Laboratory without life support.
pub fn lab(name: &str, full_kw: f64, low_kw: f64) -> Structure {
    Structure::new(name, StructureCategory::Laboratory, full_kw, low_kw)
}

/// Lossless battery bank drawing no power itself.
pub fn battery_bank(name: &str, capacity_kwh: f64, stored_kwh: f64, rate_kw: f64) -> Structure {
    Structure::new(name, StructureCategory::Storage, 0.0, 0.0)
        .with_storage(StorageUnit::new(capacity_kwh, stored_kwh, rate_kw, rate_kw))
}

/// Grid over `structures` with an empty fuel store.
pub fn grid(structures: Vec<Structure>) -> PowerGrid {
    PowerGrid::new(&default_config(), structures, ResourceStore::default())
}
