//! CSV export for tick reports.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::TickReport;

/// Column header for CSV telemetry export.
pub const HEADER: &str = "tick,mission_sol,millisol,generated_kw,required_kw,margined_kw,\
                          stored_kwh,capacity_kwh,system_efficiency,sufficient_power,\
                          power_value,branch,stages,residual_kw,structures_shed,\
                          structures_raised,methane_burned_kg";

/// Exports tick reports to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(reports, io::BufWriter::new(file))
}

/// Writes tick reports as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in reports {
        wtr.write_record(&[
            r.tick.to_string(),
            r.mission_sol.to_string(),
            format!("{:.1}", r.millisol),
            format!("{:.4}", r.generated_kw),
            format!("{:.4}", r.required_kw),
            format!("{:.4}", r.margined_kw),
            format!("{:.4}", r.stored_kwh),
            format!("{:.4}", r.capacity_kwh),
            format!("{:.6}", r.system_efficiency),
            r.sufficient_power.to_string(),
            format!("{:.6}", r.power_value),
            r.branch.as_str().to_string(),
            r.stage_list(),
            format!("{:.4}", r.residual_kw),
            r.structures_shed.to_string(),
            r.structures_raised.to_string(),
            format!("{:.6}", r.methane_burned_kg),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
