//! Generation sources and the enum that dispatches over them.

pub mod areothermal;
pub mod fuel;
pub mod reactor;
pub mod solar;
pub mod types;
pub mod wind;

pub use areothermal::AreothermalSource;
pub use fuel::FuelPowerSource;
pub use reactor::ReactorSource;
pub use solar::SolarSource;
pub use types::{
    AdjustablePowerSource, PowerSource, SourceKind, StructureContext, UnknownSourceKind,
    finite_or_zero,
};
pub use wind::WindSource;

use crate::sim::environment::EnvironmentSnapshot;

/// Closed set of generation sources a structure may own.
#[derive(Debug, Clone)]
pub enum GenerationSource {
    Reactor(ReactorSource),
    Fuel(FuelPowerSource),
    Solar(SolarSource),
    Wind(WindSource),
    Areothermal(AreothermalSource),
}

macro_rules! delegate {
    ($self:expr, $src:ident => $body:expr) => {
        match $self {
            GenerationSource::Reactor($src) => $body,
            GenerationSource::Fuel($src) => $body,
            GenerationSource::Solar($src) => $body,
            GenerationSource::Wind($src) => $body,
            GenerationSource::Areothermal($src) => $body,
        }
    };
}

impl GenerationSource {
    /// Adjustable capability, if this source has one.
    pub fn as_adjustable(&self) -> Option<&dyn AdjustablePowerSource> {
        match self {
            Self::Reactor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_adjustable_mut(&mut self) -> Option<&mut dyn AdjustablePowerSource> {
        match self {
            Self::Reactor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_fuel(&self) -> Option<&FuelPowerSource> {
        match self {
            Self::Fuel(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_fuel_mut(&mut self) -> Option<&mut FuelPowerSource> {
        match self {
            Self::Fuel(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_solar_mut(&mut self) -> Option<&mut SolarSource> {
        match self {
            Self::Solar(s) => Some(s),
            _ => None,
        }
    }
}

impl PowerSource for GenerationSource {
    fn kind(&self) -> SourceKind {
        delegate!(self, s => s.kind())
    }

    fn max_power(&self) -> f64 {
        delegate!(self, s => s.max_power())
    }

    fn overload_ceiling(&self) -> f64 {
        delegate!(self, s => s.overload_ceiling())
    }

    fn current_power(&mut self, ctx: &mut StructureContext<'_>) -> f64 {
        finite_or_zero(delegate!(self, s => s.current_power(ctx)))
    }

    fn projected_power(&self, env: &EnvironmentSnapshot) -> f64 {
        finite_or_zero(delegate!(self, s => s.projected_power(env)))
    }

    fn average_power(&self, env: &EnvironmentSnapshot) -> f64 {
        finite_or_zero(delegate!(self, s => s.average_power(env)))
    }

    fn maintenance_time(&self) -> f64 {
        finite_or_zero(delegate!(self, s => s.maintenance_time()))
    }

    fn measure_power(&self, percent: f64, env: &EnvironmentSnapshot) -> f64 {
        finite_or_zero(delegate!(self, s => s.measure_power(percent, env)))
    }
}

impl From<ReactorSource> for GenerationSource {
    fn from(source: ReactorSource) -> Self {
        Self::Reactor(source)
    }
}

impl From<FuelPowerSource> for GenerationSource {
    fn from(source: FuelPowerSource) -> Self {
        Self::Fuel(source)
    }
}

impl From<SolarSource> for GenerationSource {
    fn from(source: SolarSource) -> Self {
        Self::Solar(source)
    }
}

impl From<WindSource> for GenerationSource {
    fn from(source: WindSource) -> Self {
        Self::Wind(source)
    }
}

impl From<AreothermalSource> for GenerationSource {
    fn from(source: AreothermalSource) -> Self {
        Self::Areothermal(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reactors_are_adjustable() {
        let mut reactor: GenerationSource = ReactorSource::fission(1, 100.0, 0.3, 100.0).into();
        let mut wind: GenerationSource = WindSource::new(20.0, 1.2).into();
        assert!(reactor.as_adjustable_mut().is_some());
        assert!(wind.as_adjustable_mut().is_none());
        assert_eq!(reactor.kind().is_adjustable(), reactor.as_adjustable().is_some());
    }

    #[test]
    fn delegation_matches_inner_source() {
        let inner = SolarSource::photovoltaic(30.0, 0.3);
        let env = EnvironmentSnapshot::midday(293.0);
        let expected = inner.projected_power(&env);
        let source: GenerationSource = inner.into();
        assert_eq!(source.kind(), SourceKind::Photovoltaic);
        assert_eq!(source.projected_power(&env), expected);
        assert_eq!(source.maintenance_time(), 3.0);
    }

    #[test]
    fn fuel_accessor() {
        let mut source: GenerationSource = FuelPowerSource::new(10.0, 0.5, false).into();
        if let Some(generator) = source.as_fuel_mut() {
            generator.toggle_on();
        }
        assert!(source.as_fuel().is_some_and(FuelPowerSource::is_toggled_on));
    }
}
