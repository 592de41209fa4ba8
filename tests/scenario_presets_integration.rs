use std::path::Path;
use std::process::Command;

use colony_grid::config::ScenarioConfig;
use colony_grid::io::export::write_csv;
use colony_grid::sim::kpi::KpiReport;
use colony_grid::sim::types::TickReport;

fn run_preset(name: &str) -> Vec<TickReport> {
    let cfg = ScenarioConfig::from_preset(name).expect("preset should exist");
    let mut engine = cfg.build_engine().expect("preset should build");
    engine.run()
}

#[test]
fn every_preset_runs_to_completion() {
    for name in ScenarioConfig::PRESETS {
        let cfg = ScenarioConfig::from_preset(name).expect("preset should exist");
        let expected = cfg.sim_config().total_ticks();
        let reports = run_preset(name);
        assert_eq!(reports.len(), expected, "preset {name}");

        let kpi = KpiReport::from_reports(&reports);
        assert!(kpi.mean_generated_kw.is_finite() && kpi.mean_generated_kw > 0.0);
        assert!(kpi.final_system_efficiency > 0.0 && kpi.final_system_efficiency < 1.0);
        assert!((0.0..=1.0).contains(&kpi.min_state_of_charge));
    }
}

#[test]
fn only_fuel_backup_burns_methane() {
    let baseline = KpiReport::from_reports(&run_preset("baseline"));
    let backup = KpiReport::from_reports(&run_preset("fuel_backup"));
    assert_eq!(baseline.methane_burned_kg, 0.0);
    assert!(
        backup.methane_burned_kg > 0.0,
        "expected the generator to run: {backup}"
    );
}

#[test]
fn dust_storm_preset_dims_daytime_generation() {
    let cfg = ScenarioConfig::dust_storm();
    let ticks_per_sol = cfg.sim_config().ticks_per_sol();
    let reports = run_preset("dust_storm");

    let noon_generation = |sol: usize| reports[(sol - 1) * ticks_per_sol + ticks_per_sol / 2].generated_kw;
    let clear = noon_generation(1);
    let storm = noon_generation(3);
    assert!(
        storm < clear,
        "storm noon {storm:.2} kW should be below clear noon {clear:.2} kW"
    );
}

#[test]
fn same_seed_gives_identical_telemetry() {
    let mut a = Vec::new();
    let mut b = Vec::new();
    write_csv(&run_preset("dust_storm"), &mut a).expect("csv write");
    write_csv(&run_preset("dust_storm"), &mut b).expect("csv write");
    assert_eq!(a, b);
}

#[test]
fn scenario_file_loads_and_builds() {
    let cfg = ScenarioConfig::from_toml_file(Path::new("scenarios/outpost.toml"))
        .expect("scenario should parse");
    assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    let mut engine = cfg.build_engine().expect("scenario should build");
    assert_eq!(engine.run().len(), 100);
}

#[test]
fn cli_prints_kpi_report() {
    let output = Command::new(env!("CARGO_BIN_EXE_colony-grid"))
        .args(["--preset", "baseline", "--sols", "1", "--quiet"])
        .output()
        .expect("colony-grid process should run");

    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("--- KPI Report ---"));
    assert!(stdout.contains("Brownout ticks:"));
}

#[test]
fn cli_rejects_unknown_preset() {
    let output = Command::new(env!("CARGO_BIN_EXE_colony-grid"))
        .args(["--preset", "atlantis"])
        .output()
        .expect("colony-grid process should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}
