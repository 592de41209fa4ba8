use crate::sim::environment::EnvironmentSnapshot;

use super::types::{AdjustablePowerSource, PowerSource, SourceKind, StructureContext};

/// Lowest allowed load capacity (percent).
pub const MIN_LOAD_CAPACITY: f64 = 5.0;
/// Highest allowed load capacity, including overload (percent).
pub const MAX_LOAD_CAPACITY: f64 = 110.0;
/// Load capacity change per adjustment (percent).
pub const LOAD_CAPACITY_STEP: f64 = 5.0;

/// Maintenance millisols per kWe produced.
const MAINTENANCE_PER_KW: f64 = 2.0;

/// A fission or thermionic reactor with an adjustable load capacity.
///
/// Electrical output is
/// `modules × design_thermal_kw × load_capacity / 100 × conversion_efficiency`,
/// recomputed whenever the load capacity changes.
#[derive(Debug, Clone)]
pub struct ReactorSource {
    kind: SourceKind,
    modules: u32,
    design_thermal_kw: f64,
    conversion_efficiency: f64,
    load_capacity: f64,
    power_electrical: f64,
    maintenance_time: f64,
}

impl ReactorSource {
    /// Creates a fission reactor.
    ///
    /// # Arguments
    ///
    /// * `modules` - Number of reactor modules
    /// * `design_thermal_kw` - Thermal rating per module (kW)
    /// * `conversion_efficiency` - Thermal-to-electric efficiency (0..=1)
    /// * `load_capacity` - Initial load capacity in percent, clamped to `[5, 110]`
    pub fn fission(
        modules: u32,
        design_thermal_kw: f64,
        conversion_efficiency: f64,
        load_capacity: f64,
    ) -> Self {
        Self::new(
            SourceKind::Fission,
            modules,
            design_thermal_kw,
            conversion_efficiency,
            load_capacity,
        )
    }

    /// Creates a thermionic nuclear generator.
    pub fn thermionic(
        modules: u32,
        design_thermal_kw: f64,
        conversion_efficiency: f64,
        load_capacity: f64,
    ) -> Self {
        Self::new(
            SourceKind::Thermionic,
            modules,
            design_thermal_kw,
            conversion_efficiency,
            load_capacity,
        )
    }

    fn new(
        kind: SourceKind,
        modules: u32,
        design_thermal_kw: f64,
        conversion_efficiency: f64,
        load_capacity: f64,
    ) -> Self {
        let mut reactor = Self {
            kind,
            modules,
            design_thermal_kw: finite_non_negative(design_thermal_kw),
            conversion_efficiency: finite_non_negative(conversion_efficiency).min(1.0),
            load_capacity: clamp_load(load_capacity),
            power_electrical: 0.0,
            maintenance_time: 0.0,
        };
        reactor.recompute();
        reactor
    }

    /// Electrical output at the given load capacity (percent).
    fn electrical_at(&self, percent: f64) -> f64 {
        self.modules as f64 * self.design_thermal_kw * percent / 100.0 * self.conversion_efficiency
    }

    fn recompute(&mut self) {
        self.power_electrical = self.electrical_at(self.load_capacity);
        self.maintenance_time = self.power_electrical * MAINTENANCE_PER_KW;
    }

    /// Number of reactor modules.
    pub fn modules(&self) -> u32 {
        self.modules
    }

    /// Thermal rating of one module (kW).
    pub fn design_thermal_kw(&self) -> f64 {
        self.design_thermal_kw
    }

    /// Thermal-to-electric conversion efficiency (0..=1).
    pub fn conversion_efficiency(&self) -> f64 {
        self.conversion_efficiency
    }

    /// Current electrical output (kWe).
    pub fn power_electrical(&self) -> f64 {
        self.power_electrical
    }

    /// Sets the load capacity directly, clamped to `[5, 110]`.
    pub fn set_load_capacity(&mut self, percent: f64) {
        self.load_capacity = clamp_load(percent);
        self.recompute();
    }
}

impl PowerSource for ReactorSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn max_power(&self) -> f64 {
        self.electrical_at(100.0)
    }

    fn overload_ceiling(&self) -> f64 {
        self.electrical_at(MAX_LOAD_CAPACITY)
    }

    fn current_power(&mut self, _ctx: &mut StructureContext<'_>) -> f64 {
        self.power_electrical
    }

    fn projected_power(&self, _env: &EnvironmentSnapshot) -> f64 {
        self.power_electrical
    }

    fn average_power(&self, _env: &EnvironmentSnapshot) -> f64 {
        self.power_electrical
    }

    fn maintenance_time(&self) -> f64 {
        self.maintenance_time
    }

    fn measure_power(&self, percent: f64, _env: &EnvironmentSnapshot) -> f64 {
        if !percent.is_finite() {
            return 0.0;
        }
        self.electrical_at(percent.clamp(0.0, MAX_LOAD_CAPACITY))
    }
}

impl AdjustablePowerSource for ReactorSource {
    fn load_capacity(&self) -> f64 {
        self.load_capacity
    }

    fn increase_load_capacity(&mut self) {
        self.set_load_capacity(self.load_capacity + LOAD_CAPACITY_STEP);
    }

    fn decrease_load_capacity(&mut self) {
        self.set_load_capacity(self.load_capacity - LOAD_CAPACITY_STEP);
    }
}

fn clamp_load(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(MIN_LOAD_CAPACITY, MAX_LOAD_CAPACITY)
    } else {
        100.0
    }
}

fn finite_non_negative(x: f64) -> f64 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvironmentSnapshot {
        EnvironmentSnapshot::default()
    }

    #[test]
    fn test_fission_output_and_single_step() {
        let mut reactor = ReactorSource::fission(2, 100.0, 0.30, 100.0);
        assert!((reactor.power_electrical() - 60.0).abs() < 1e-9);
        assert!((reactor.maintenance_time() - 120.0).abs() < 1e-9);

        reactor.increase_load_capacity();
        assert_eq!(reactor.load_capacity(), 105.0);
        assert!((reactor.power_electrical() - 63.0).abs() < 1e-9);
        assert!((reactor.maintenance_time() - 126.0).abs() < 1e-9);
    }

    #[test]
    fn test_increase_then_decrease_restores() {
        let mut reactor = ReactorSource::thermionic(1, 50.0, 0.1, 60.0);
        let before = reactor.power_electrical();
        reactor.increase_load_capacity();
        reactor.decrease_load_capacity();
        assert_eq!(reactor.load_capacity(), 60.0);
        assert!((reactor.power_electrical() - before).abs() < 1e-12);

        reactor.decrease_load_capacity();
        reactor.increase_load_capacity();
        assert_eq!(reactor.load_capacity(), 60.0);
    }

    #[test]
    fn test_clamped_at_boundaries() {
        let mut reactor = ReactorSource::fission(1, 100.0, 0.3, 110.0);
        reactor.increase_load_capacity();
        assert_eq!(reactor.load_capacity(), 110.0);

        reactor.set_load_capacity(5.0);
        reactor.decrease_load_capacity();
        assert_eq!(reactor.load_capacity(), 5.0);
    }

    #[test]
    fn test_constructor_clamps_load() {
        assert_eq!(
            ReactorSource::fission(1, 10.0, 0.3, 500.0).load_capacity(),
            110.0
        );
        assert_eq!(ReactorSource::fission(1, 10.0, 0.3, 0.0).load_capacity(), 5.0);
        assert_eq!(
            ReactorSource::fission(1, 10.0, 0.3, f64::NAN).load_capacity(),
            100.0
        );
    }

    #[test]
    fn test_overload_ceiling() {
        let reactor = ReactorSource::fission(2, 100.0, 0.3, 110.0);
        assert!((reactor.max_power() - 60.0).abs() < 1e-9);
        assert!((reactor.overload_ceiling() - 66.0).abs() < 1e-9);
        assert!(reactor.projected_power(&env()) <= reactor.overload_ceiling() + 1e-9);
    }

    #[test]
    fn test_measure_power_is_pure() {
        let reactor = ReactorSource::fission(2, 100.0, 0.3, 50.0);
        assert!((reactor.measure_power(100.0, &env()) - 60.0).abs() < 1e-9);
        assert!((reactor.measure_power(500.0, &env()) - 66.0).abs() < 1e-9);
        assert_eq!(reactor.measure_power(f64::NAN, &env()), 0.0);
        assert_eq!(reactor.load_capacity(), 50.0);
    }

    #[test]
    fn test_design_values_are_sanitized_and_read_only() {
        let reactor = ReactorSource::thermionic(3, -20.0, 1.5, 100.0);
        assert_eq!(reactor.modules(), 3);
        assert_eq!(reactor.design_thermal_kw(), 0.0);
        assert_eq!(reactor.conversion_efficiency(), 1.0);
        assert_eq!(reactor.power_electrical(), 0.0);

        let reactor = ReactorSource::fission(2, 100.0, 0.3, 100.0);
        let expected = reactor.modules() as f64
            * reactor.design_thermal_kw()
            * reactor.load_capacity()
            / 100.0
            * reactor.conversion_efficiency();
        assert!((reactor.power_electrical() - expected).abs() < 1e-9);
    }
}
