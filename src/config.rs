//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::efficiency::{DustModelKind, UnknownDustModel};
use crate::sim::aggregator::GenerationAggregator;
use crate::sim::engine::Engine;
use crate::sim::grid::PowerGrid;
use crate::sim::resources::ResourceStore;
use crate::sim::structure::{Structure, StructureCategory, UnknownCategory};
use crate::sim::types::{PowerMode, SimConfig, UnknownPowerMode, tick_divides_sol};
use crate::sources::reactor::{MAX_LOAD_CAPACITY, MIN_LOAD_CAPACITY};
use crate::sources::{
    AreothermalSource, FuelPowerSource, GenerationSource, ReactorSource, SolarSource, SourceKind,
    UnknownSourceKind, WindSource,
};
use crate::storage::StorageUnit;
use crate::weather::{SyntheticWeather, WeatherParams};

/// Seed offset for the weather RNG to avoid correlation with the grid RNG.
const WEATHER_SEED_OFFSET: u64 = 57;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`]
/// for the built-in settlement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and grid-wide parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Synthetic weather parameters.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Initial settlement inventory.
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Buildings on the grid, in balancing order.
    #[serde(default)]
    pub structures: Vec<StructureConfig>,
}

/// Simulation timing and grid-wide parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of sols to simulate (must be > 0).
    pub sols: usize,
    /// Duration of one tick in millisols, in `(0, 1000]`.
    pub millisols_per_tick: f64,
    /// Master random seed.
    pub seed: u64,
    /// Safety margin applied to demand (>= 1).
    pub rolling_factor: f64,
    /// System efficiency loss per sol, in `[0, 1)`.
    pub degradation_rate_per_sol: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sols: 3,
            millisols_per_tick: 10.0,
            seed: 42,
            rolling_factor: crate::sim::types::ROLLING_FACTOR,
            degradation_rate_per_sol: crate::sim::types::DEGRADATION_RATE_PER_SOL,
        }
    }
}

/// Synthetic weather parameters. See [`WeatherParams`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Irradiance at local noon (W/m²).
    pub peak_irradiance: f64,
    /// Sunrise millisol (inclusive).
    pub sunrise_millisol: f64,
    /// Sunset millisol (exclusive).
    pub sunset_millisol: f64,
    /// Long-run mean wind speed (m/s).
    pub mean_wind_speed: f64,
    /// AR(1) wind correlation coefficient (0.0-1.0).
    pub wind_alpha: f64,
    /// Wind innovation noise standard deviation (m/s).
    pub wind_noise_std: f64,
    /// Clear-sky optical depth.
    pub base_opacity: f64,
    /// Optical depth during a dust storm.
    pub storm_opacity: f64,
    /// Mean wind multiplier during a dust storm.
    pub storm_wind_factor: f64,
    /// First storm sol (inclusive); set together with `storm_end_sol`.
    pub storm_start_sol: Option<u32>,
    /// Last storm sol (inclusive).
    pub storm_end_sol: Option<u32>,
    /// Areothermal potential (percent, 0-100).
    pub areothermal_potential: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        let p = WeatherParams::default();
        Self {
            peak_irradiance: p.peak_irradiance,
            sunrise_millisol: p.sunrise_millisol,
            sunset_millisol: p.sunset_millisol,
            mean_wind_speed: p.mean_wind_speed,
            wind_alpha: p.wind_alpha,
            wind_noise_std: p.wind_noise_std,
            base_opacity: p.base_opacity,
            storm_opacity: p.storm_opacity,
            storm_wind_factor: p.storm_wind_factor,
            storm_start_sol: None,
            storm_end_sol: None,
            areothermal_potential: p.areothermal_potential,
        }
    }
}

impl WeatherConfig {
    pub fn params(&self) -> WeatherParams {
        WeatherParams {
            peak_irradiance: self.peak_irradiance,
            sunrise_millisol: self.sunrise_millisol,
            sunset_millisol: self.sunset_millisol,
            mean_wind_speed: self.mean_wind_speed,
            wind_alpha: self.wind_alpha,
            wind_noise_std: self.wind_noise_std,
            base_opacity: self.base_opacity,
            storm_opacity: self.storm_opacity,
            storm_wind_factor: self.storm_wind_factor,
            storm_sols: self.storm_start_sol.zip(self.storm_end_sol),
            areothermal_potential: self.areothermal_potential,
        }
    }
}

/// Initial settlement inventory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Methane (kg).
    pub methane_kg: f64,
    /// Oxygen (kg).
    pub oxygen_kg: f64,
}

/// One building on the grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructureConfig {
    /// Unique structure name.
    pub name: String,
    /// Category: habitat, laboratory, greenhouse, workshop, storage or power.
    pub category: String,
    pub life_support: bool,
    /// Demand at full power (kW).
    pub full_power_kw: f64,
    /// Demand at low power (kW, <= full).
    pub low_power_kw: f64,
    /// Initial mode: `"full_power"`, `"low_power"` or `"no_power"`.
    pub mode: String,
    /// Dust model for solar sources: `"optical"`, `"mechanical"` or `"none"`.
    pub dust_model: String,
    pub sources: Vec<SourceConfig>,
    pub storage: Option<StorageConfig>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: "habitat".to_string(),
            life_support: false,
            full_power_kw: 0.0,
            low_power_kw: 0.0,
            mode: "full_power".to_string(),
            dust_model: "none".to_string(),
            sources: Vec::new(),
            storage: None,
        }
    }
}

/// One generation source owned by a structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Kind: fission, thermionic, fuel, solar, solar_thermal, wind or areothermal.
    pub kind: String,
    /// Rated output (kW); thermal rating per module for reactors.
    pub capacity_kw: f64,
    /// Reactor modules.
    pub modules: u32,
    /// Reactor thermal-to-electric efficiency (0.0-1.0).
    pub conversion_efficiency: f64,
    /// Initial reactor load capacity (percent, 5-110).
    pub load_capacity: f64,
    /// Whether a combustion generator starts running.
    pub toggled_on: bool,
    /// Combustion efficiency (0.0-1.0).
    pub thermal_efficiency: f64,
    /// Rated collector efficiency for solar sources (0.0-1.0).
    pub rated_efficiency: f64,
    /// Wind turbine height factor.
    pub height_factor: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "fission".to_string(),
            capacity_kw: 100.0,
            modules: 1,
            conversion_efficiency: 0.3,
            load_capacity: 100.0,
            toggled_on: false,
            thermal_efficiency: 0.9,
            rated_efficiency: 0.25,
            height_factor: crate::sources::wind::DEFAULT_HEIGHT_FACTOR,
        }
    }
}

/// Storage owned by a structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial stored energy (kWh).
    pub initial_kwh: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0-1.0).
    pub charge_efficiency: f64,
    /// Discharge efficiency (0.0-1.0).
    pub discharge_efficiency: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 100.0,
            initial_kwh: 0.0,
            max_charge_kw: 25.0,
            max_discharge_kw: 25.0,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"structures[2].full_power_kw"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure turning a scenario into a running settlement.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    UnknownSourceKind(#[from] UnknownSourceKind),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error(transparent)]
    UnknownDustModel(#[from] UnknownDustModel),
    #[error(transparent)]
    UnknownPowerMode(#[from] UnknownPowerMode),
    #[error("invalid scenario: {0}")]
    Invalid(#[from] ConfigError),
}

/// Named enumerations of a structure, parsed once.
struct ParsedStructure {
    category: StructureCategory,
    mode: PowerMode,
    dust: DustModelKind,
    kinds: Vec<SourceKind>,
}

impl StructureConfig {
    fn new(name: &str, category: &str, full_power_kw: f64, low_power_kw: f64) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            full_power_kw,
            low_power_kw,
            ..Self::default()
        }
    }

    fn parse(&self) -> Result<ParsedStructure, BuildError> {
        Ok(ParsedStructure {
            category: self.category.parse()?,
            mode: self.mode.parse()?,
            dust: self.dust_model.parse()?,
            kinds: self
                .sources
                .iter()
                .map(|s| s.kind.parse())
                .collect::<Result<_, _>>()?,
        })
    }

    /// Builds the structure; assumes the configuration has been validated.
    fn build(&self) -> Result<Structure, BuildError> {
        let parsed = self.parse()?;
        let mut structure = Structure::new(
            self.name.clone(),
            parsed.category,
            self.full_power_kw,
            self.low_power_kw,
        )
        .with_life_support(self.life_support)
        .with_mode(parsed.mode);

        if !self.sources.is_empty() {
            let sources = self
                .sources
                .iter()
                .zip(parsed.kinds)
                .map(|(cfg, kind)| cfg.build(kind))
                .collect();
            structure = structure.with_generation(GenerationAggregator::new(sources, parsed.dust.build()));
        }
        if let Some(s) = &self.storage {
            structure = structure.with_storage(
                StorageUnit::new(s.capacity_kwh, s.initial_kwh, s.max_charge_kw, s.max_discharge_kw)
                    .with_efficiencies(s.charge_efficiency, s.discharge_efficiency),
            );
        }
        Ok(structure)
    }
}

impl SourceConfig {
    fn of_kind(kind: &str, capacity_kw: f64) -> Self {
        Self {
            kind: kind.to_string(),
            capacity_kw,
            ..Self::default()
        }
    }

    fn build(&self, kind: SourceKind) -> GenerationSource {
        match kind {
            SourceKind::Fission => ReactorSource::fission(
                self.modules,
                self.capacity_kw,
                self.conversion_efficiency,
                self.load_capacity,
            )
            .into(),
            SourceKind::Thermionic => ReactorSource::thermionic(
                self.modules,
                self.capacity_kw,
                self.conversion_efficiency,
                self.load_capacity,
            )
            .into(),
            SourceKind::Fuel => {
                FuelPowerSource::new(self.capacity_kw, self.thermal_efficiency, self.toggled_on)
                    .into()
            }
            SourceKind::Photovoltaic => {
                SolarSource::photovoltaic(self.capacity_kw, self.rated_efficiency).into()
            }
            SourceKind::SolarThermal => {
                SolarSource::thermal(self.capacity_kw, self.rated_efficiency).into()
            }
            SourceKind::Wind => WindSource::new(self.capacity_kw, self.height_factor).into(),
            SourceKind::Areothermal => AreothermalSource::new(self.capacity_kw).into(),
        }
    }
}

fn in_unit_interval(x: f64) -> bool {
    x.is_finite() && x > 0.0 && x <= 1.0
}

fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

impl ScenarioConfig {
    /// Returns the baseline settlement: a fission plant, a dusty solar farm,
    /// a battery bank and four consumers.
    pub fn baseline() -> Self {
        let reactor = SourceConfig {
            modules: 2,
            ..SourceConfig::of_kind("fission", 100.0)
        };
        Self {
            simulation: SimulationConfig::default(),
            weather: WeatherConfig::default(),
            resources: ResourcesConfig::default(),
            structures: vec![
                StructureConfig {
                    sources: vec![reactor],
                    ..StructureConfig::new("Reactor Plant", "power", 2.0, 1.0)
                },
                StructureConfig {
                    dust_model: "optical".to_string(),
                    sources: vec![SourceConfig::of_kind("solar", 40.0)],
                    ..StructureConfig::new("Solar Farm", "power", 1.0, 0.5)
                },
                StructureConfig {
                    life_support: true,
                    ..StructureConfig::new("Habitat Alpha", "habitat", 25.0, 10.0)
                },
                StructureConfig {
                    life_support: true,
                    ..StructureConfig::new("Greenhouse", "greenhouse", 15.0, 6.0)
                },
                StructureConfig::new("Research Lab", "laboratory", 12.0, 4.0),
                StructureConfig::new("Workshop", "workshop", 8.0, 2.0),
                StructureConfig {
                    storage: Some(StorageConfig {
                        capacity_kwh: 200.0,
                        initial_kwh: 100.0,
                        max_charge_kw: 50.0,
                        max_discharge_kw: 50.0,
                        ..StorageConfig::default()
                    }),
                    ..StructureConfig::new("Battery Bank", "storage", 0.5, 0.5)
                },
            ],
        }
    }

    /// Returns the dust-storm preset: solar-heavy settlement hit by a
    /// storm on sols 2 to 4.
    pub fn dust_storm() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.sols = 5;
        cfg.weather.storm_start_sol = Some(2);
        cfg.weather.storm_end_sol = Some(4);
        cfg.weather.mean_wind_speed = 10.0;
        if let Some(plant) = cfg.structures.first_mut() {
            plant.sources = vec![SourceConfig::of_kind("fission", 100.0)];
        }
        if let Some(farm) = cfg.structures.get_mut(1) {
            farm.sources.push(SourceConfig::of_kind("solar", 40.0));
            farm.sources.push(SourceConfig::of_kind("wind", 20.0));
        }
        cfg
    }

    /// Returns the fuel-backup preset: a single reactor module backed by a
    /// methane generator and a stocked fuel depot.
    pub fn fuel_backup() -> Self {
        let mut cfg = Self::baseline();
        cfg.resources = ResourcesConfig {
            methane_kg: 400.0,
            oxygen_kg: 1_600.0,
        };
        if let Some(plant) = cfg.structures.first_mut() {
            plant.sources = vec![SourceConfig::of_kind("fission", 150.0)];
        }
        cfg.structures.push(StructureConfig {
            sources: vec![SourceConfig::of_kind("fuel", 30.0)],
            ..StructureConfig::new("Methane Generator", "power", 0.5, 0.2)
        });
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "dust_storm", "fuel_backup"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "dust_storm" => Ok(Self::dust_storm()),
            "fuel_backup" => Ok(Self::fuel_backup()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        self.validate_simulation(&mut errors);
        self.validate_weather(&mut errors);

        let r = &self.resources;
        if !non_negative(r.methane_kg) {
            errors.push(ConfigError::new("resources.methane_kg", "must be >= 0"));
        }
        if !non_negative(r.oxygen_kg) {
            errors.push(ConfigError::new("resources.oxygen_kg", "must be >= 0"));
        }

        let mut names = HashSet::new();
        for (i, s) in self.structures.iter().enumerate() {
            let path = format!("structures[{i}]");
            if s.name.trim().is_empty() {
                errors.push(ConfigError::new(format!("{path}.name"), "must not be empty"));
            } else if !names.insert(s.name.as_str()) {
                errors.push(ConfigError::new(
                    format!("{path}.name"),
                    format!("duplicate structure name \"{}\"", s.name),
                ));
            }
            validate_structure(s, &path, &mut errors);
        }

        errors
    }

    fn validate_simulation(&self, errors: &mut Vec<ConfigError>) {
        let s = &self.simulation;
        if s.sols == 0 {
            errors.push(ConfigError::new("simulation.sols", "must be > 0"));
        }
        if !tick_divides_sol(s.millisols_per_tick) {
            errors.push(ConfigError::new(
                "simulation.millisols_per_tick",
                "must be in (0, 1000] and divide 1000 evenly",
            ));
        }
        if !(s.rolling_factor.is_finite() && s.rolling_factor >= 1.0) {
            errors.push(ConfigError::new("simulation.rolling_factor", "must be >= 1.0"));
        }
        if !(non_negative(s.degradation_rate_per_sol) && s.degradation_rate_per_sol < 1.0) {
            errors.push(ConfigError::new(
                "simulation.degradation_rate_per_sol",
                "must be in [0.0, 1.0)",
            ));
        }
    }

    fn validate_weather(&self, errors: &mut Vec<ConfigError>) {
        let w = &self.weather;
        if !non_negative(w.peak_irradiance) {
            errors.push(ConfigError::new("weather.peak_irradiance", "must be >= 0"));
        }
        if !(w.sunrise_millisol >= 0.0 && w.sunrise_millisol < w.sunset_millisol) {
            errors.push(ConfigError::new(
                "weather.sunrise_millisol",
                "must be >= 0 and < weather.sunset_millisol",
            ));
        }
        if w.sunset_millisol.is_nan() || w.sunset_millisol > 1000.0 {
            errors.push(ConfigError::new("weather.sunset_millisol", "must be <= 1000"));
        }
        if !(0.0..=1.0).contains(&w.wind_alpha) {
            errors.push(ConfigError::new("weather.wind_alpha", "must be in [0.0, 1.0]"));
        }
        if !non_negative(w.mean_wind_speed) {
            errors.push(ConfigError::new("weather.mean_wind_speed", "must be >= 0"));
        }
        if !non_negative(w.wind_noise_std) {
            errors.push(ConfigError::new("weather.wind_noise_std", "must be >= 0"));
        }
        if !(w.storm_wind_factor.is_finite() && w.storm_wind_factor > 0.0) {
            errors.push(ConfigError::new("weather.storm_wind_factor", "must be > 0"));
        }
        if !non_negative(w.base_opacity) || !non_negative(w.storm_opacity) {
            errors.push(ConfigError::new("weather.base_opacity", "opacities must be >= 0"));
        }
        match (w.storm_start_sol, w.storm_end_sol) {
            (Some(start), Some(end)) if start > end => {
                errors.push(ConfigError::new(
                    "weather.storm_start_sol",
                    "must be <= weather.storm_end_sol",
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                errors.push(ConfigError::new(
                    "weather.storm_start_sol",
                    "storm_start_sol and storm_end_sol must be set together",
                ));
            }
            _ => {}
        }
        if !(0.0..=100.0).contains(&w.areothermal_potential) {
            errors.push(ConfigError::new(
                "weather.areothermal_potential",
                "must be in [0, 100]",
            ));
        }
    }

    /// Simulation parameters for the engine and grid.
    ///
    /// # Panics
    ///
    /// Panics if the simulation section is invalid; call [`validate`](Self::validate) first.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        let mut cfg = SimConfig::new(s.sols, s.millisols_per_tick, s.seed);
        cfg.rolling_factor = s.rolling_factor;
        cfg.degradation_rate_per_sol = s.degradation_rate_per_sol;
        cfg
    }

    /// Builds the settlement grid.
    ///
    /// # Errors
    ///
    /// Returns a typed error for unrecognized names, or
    /// [`BuildError::Invalid`] carrying the first validation failure.
    pub fn build_grid(&self) -> Result<PowerGrid, BuildError> {
        for s in &self.structures {
            s.parse()?;
        }
        if let Some(err) = self.validate().into_iter().next() {
            return Err(err.into());
        }
        let structures = self
            .structures
            .iter()
            .map(StructureConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        let store = ResourceStore::new(self.resources.methane_kg, self.resources.oxygen_kg);
        Ok(PowerGrid::new(&self.sim_config(), structures, store))
    }

    /// Builds the grid and a seeded synthetic weather provider into an engine.
    ///
    /// # Errors
    ///
    /// See [`build_grid`](Self::build_grid).
    pub fn build_engine(&self) -> Result<Engine<SyntheticWeather>, BuildError> {
        let grid = self.build_grid()?;
        let weather = SyntheticWeather::new(
            self.weather.params(),
            self.simulation.seed.wrapping_add(WEATHER_SEED_OFFSET),
        );
        Ok(Engine::new(self.sim_config(), grid, weather))
    }
}

fn validate_structure(s: &StructureConfig, path: &str, errors: &mut Vec<ConfigError>) {
    if let Err(e) = s.category.parse::<StructureCategory>() {
        errors.push(ConfigError::new(format!("{path}.category"), e.to_string()));
    }
    if let Err(e) = s.mode.parse::<PowerMode>() {
        errors.push(ConfigError::new(format!("{path}.mode"), e.to_string()));
    }
    if let Err(e) = s.dust_model.parse::<DustModelKind>() {
        errors.push(ConfigError::new(format!("{path}.dust_model"), e.to_string()));
    }
    if !non_negative(s.full_power_kw) {
        errors.push(ConfigError::new(format!("{path}.full_power_kw"), "must be >= 0"));
    }
    if !(non_negative(s.low_power_kw) && s.low_power_kw <= s.full_power_kw) {
        errors.push(ConfigError::new(
            format!("{path}.low_power_kw"),
            "must be >= 0 and <= full_power_kw",
        ));
    }

    for (j, src) in s.sources.iter().enumerate() {
        let path = format!("{path}.sources[{j}]");
        let kind = match src.kind.parse::<SourceKind>() {
            Ok(kind) => kind,
            Err(e) => {
                errors.push(ConfigError::new(format!("{path}.kind"), e.to_string()));
                continue;
            }
        };
        if !(src.capacity_kw.is_finite() && src.capacity_kw > 0.0) {
            errors.push(ConfigError::new(format!("{path}.capacity_kw"), "must be > 0"));
        }
        match kind {
            SourceKind::Fission | SourceKind::Thermionic => {
                if src.modules == 0 {
                    errors.push(ConfigError::new(format!("{path}.modules"), "must be > 0"));
                }
                if !in_unit_interval(src.conversion_efficiency) {
                    errors.push(ConfigError::new(
                        format!("{path}.conversion_efficiency"),
                        "must be in (0.0, 1.0]",
                    ));
                }
                if !(MIN_LOAD_CAPACITY..=MAX_LOAD_CAPACITY).contains(&src.load_capacity) {
                    errors.push(ConfigError::new(
                        format!("{path}.load_capacity"),
                        format!("must be in [{MIN_LOAD_CAPACITY}, {MAX_LOAD_CAPACITY}]"),
                    ));
                }
            }
            SourceKind::Fuel if !in_unit_interval(src.thermal_efficiency) => {
                errors.push(ConfigError::new(
                    format!("{path}.thermal_efficiency"),
                    "must be in (0.0, 1.0]",
                ));
            }
            SourceKind::Photovoltaic | SourceKind::SolarThermal
                if !in_unit_interval(src.rated_efficiency) =>
            {
                errors.push(ConfigError::new(
                    format!("{path}.rated_efficiency"),
                    "must be in (0.0, 1.0]",
                ));
            }
            SourceKind::Wind if !(src.height_factor.is_finite() && src.height_factor > 0.0) => {
                errors.push(ConfigError::new(format!("{path}.height_factor"), "must be > 0"));
            }
            _ => {}
        }
    }

    if let Some(st) = &s.storage {
        let path = format!("{path}.storage");
        if !(st.capacity_kwh.is_finite() && st.capacity_kwh > 0.0) {
            errors.push(ConfigError::new(format!("{path}.capacity_kwh"), "must be > 0"));
        }
        if !(non_negative(st.initial_kwh) && st.initial_kwh <= st.capacity_kwh) {
            errors.push(ConfigError::new(
                format!("{path}.initial_kwh"),
                "must be in [0, capacity_kwh]",
            ));
        }
        if !non_negative(st.max_charge_kw) || !non_negative(st.max_discharge_kw) {
            errors.push(ConfigError::new(
                format!("{path}.max_charge_kw"),
                "charge and discharge limits must be >= 0",
            ));
        }
        if !in_unit_interval(st.charge_efficiency) || !in_unit_interval(st.discharge_efficiency) {
            errors.push(ConfigError::new(
                format!("{path}.charge_efficiency"),
                "efficiencies must be in (0.0, 1.0]",
            ));
        }
    }
}
