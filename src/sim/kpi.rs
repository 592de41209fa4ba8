//! Post-hoc KPI computation from tick reports.

use std::fmt;

use super::types::TickReport;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `&[TickReport]` so the reported metrics always
/// agree with the per-tick telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Number of ticks in the run.
    pub ticks: usize,
    /// Ticks that ended with margined demand uncovered.
    pub brownout_ticks: usize,
    /// Brownout ticks as a percentage of all ticks.
    pub brownout_pct: f64,
    /// Largest residual shortfall seen (kW, 0 if none).
    pub peak_shortfall_kw: f64,
    /// Mean generation after balancing (kW).
    pub mean_generated_kw: f64,
    /// Lowest storage state of charge (fraction; 0 without storage).
    pub min_state_of_charge: f64,
    /// Methane burned by combustion generators (kg).
    pub methane_burned_kg: f64,
    /// Structure mode reductions across the run.
    pub structures_shed: usize,
    /// System efficiency at the end of the run.
    pub final_system_efficiency: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete report vector.
    pub fn from_reports(reports: &[TickReport]) -> Self {
        let Some(last) = reports.last() else {
            return Self {
                ticks: 0,
                brownout_ticks: 0,
                brownout_pct: 0.0,
                peak_shortfall_kw: 0.0,
                mean_generated_kw: 0.0,
                min_state_of_charge: 0.0,
                methane_burned_kg: 0.0,
                structures_shed: 0,
                final_system_efficiency: 1.0,
            };
        };

        let n = reports.len() as f64;
        let mut brownouts = 0_usize;
        let mut peak_shortfall = 0.0_f64;
        let mut gen_sum = 0.0;
        let mut min_soc = f64::INFINITY;
        let mut methane = 0.0;
        let mut shed = 0_usize;

        for r in reports {
            if !r.sufficient_power {
                brownouts += 1;
            }
            peak_shortfall = peak_shortfall.max(r.residual_kw);
            gen_sum += r.generated_kw;
            if r.capacity_kwh > 0.0 {
                min_soc = min_soc.min(r.state_of_charge());
            }
            methane += r.methane_burned_kg;
            shed += r.structures_shed;
        }

        Self {
            ticks: reports.len(),
            brownout_ticks: brownouts,
            brownout_pct: 100.0 * brownouts as f64 / n,
            peak_shortfall_kw: peak_shortfall,
            mean_generated_kw: gen_sum / n,
            min_state_of_charge: if min_soc.is_finite() { min_soc } else { 0.0 },
            methane_burned_kg: methane,
            structures_shed: shed,
            final_system_efficiency: last.system_efficiency,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Brownout ticks:        {} of {} ({:.1}%)",
            self.brownout_ticks, self.ticks, self.brownout_pct
        )?;
        writeln!(f, "Peak shortfall:        {:.2} kW", self.peak_shortfall_kw)?;
        writeln!(f, "Mean generation:       {:.2} kW", self.mean_generated_kw)?;
        writeln!(
            f,
            "Minimum storage SoC:   {:.1}%",
            self.min_state_of_charge * 100.0
        )?;
        writeln!(f, "Methane burned:        {:.3} kg", self.methane_burned_kg)?;
        writeln!(f, "Structures shed:       {}", self.structures_shed)?;
        write!(
            f,
            "System efficiency:     {:.4}",
            self.final_system_efficiency
        )
    }
}
