//! Settlement grid simulator entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use colony_grid::config::ScenarioConfig;
use colony_grid::io::export::export_csv;
use colony_grid::sim::kpi::KpiReport;
use colony_grid::telemetry::init_tracing;
use tracing::info;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    sols_override: Option<usize>,
    telemetry_out: Option<String>,
    log_json: bool,
    quiet: bool,
}

fn print_help() {
    eprintln!("colony-grid: Mars settlement power grid simulator");
    eprintln!();
    eprintln!("Usage: colony-grid [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --sols <usize>           Override number of sols");
    eprintln!("  --telemetry-out <path>   Export tick reports to CSV");
    eprintln!("  --log-json               Emit logs as JSON");
    eprintln!("  --quiet                  Only print the KPI report; log warnings only");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("RUST_LOG overrides the log filter.");
}

/// Returns the value following flag `args[*i]`, exiting when it is missing.
fn take_value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str, type_name: &str) -> T {
    value.parse::<T>().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{value}\" is not a valid {type_name}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        sols_override: None,
        telemetry_out: None,
        log_json: false,
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(take_value(&args, &mut i, "a path argument").to_string());
            }
            "--preset" => {
                cli.preset = Some(take_value(&args, &mut i, "a name argument").to_string());
            }
            "--seed" => {
                let value = take_value(&args, &mut i, "a u64 argument");
                cli.seed_override = Some(parse_number("--seed", value, "u64"));
            }
            "--sols" => {
                let value = take_value(&args, &mut i, "a usize argument");
                cli.sols_override = Some(parse_number("--sols", value, "usize"));
            }
            "--telemetry-out" => {
                cli.telemetry_out = Some(take_value(&args, &mut i, "a path argument").to_string());
            }
            "--log-json" => cli.log_json = true,
            "--quiet" | "-q" => cli.quiet = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();
    init_tracing(cli.log_json, cli.quiet);

    // --scenario takes priority, then --preset, then the baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(sols) = cli.sols_override {
        scenario.simulation.sols = sols;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mut engine = scenario.build_engine().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    info!(
        structures = engine.grid().structures().len(),
        sols = scenario.simulation.sols,
        seed = scenario.simulation.seed,
        "settlement built"
    );

    let reports = engine.run();
    let kpi = KpiReport::from_reports(&reports);

    if !cli.quiet {
        for r in &reports {
            println!("{r}");
        }
        println!();
    }
    println!("{kpi}");

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&reports, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path, "telemetry written");
    }
}
