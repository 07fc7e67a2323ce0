//! ERP simulator entry point: CLI wiring and config-driven run.

use std::io;
use std::path::Path;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use erp_sim::config::ScenarioConfig;
use erp_sim::io::export::{export_json, export_summary_csv};
use erp_sim::sim::run_erp_with;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    trials_override: Option<usize>,
    threads_override: Option<usize>,
    json_out: Option<String>,
    csv_out: Option<String>,
}

fn print_help() {
    eprintln!("erp-sim: outage survival Monte Carlo for on-site backup assets");
    eprintln!();
    eprintln!("Usage: erp-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --trials <n>             Override number of trials");
    eprintln!("  --threads <n>            Worker threads (0 = all cores)");
    eprintln!("  --json-out <path>        Write full results as JSON");
    eprintln!("  --csv-out <path>         Write per-duration summary as CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str, kind: &str) -> T {
    raw.parse::<T>().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{raw}\" is not a valid {kind}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        trials_override: None,
        threads_override: None,
        json_out: None,
        csv_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(value_of(&args, i, flag, "a path argument").to_string());
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_of(&args, i, flag, "a name argument").to_string());
            }
            "--seed" => {
                i += 1;
                let raw = value_of(&args, i, flag, "a u64 argument");
                cli.seed_override = Some(parse_number(raw, flag, "u64"));
            }
            "--trials" => {
                i += 1;
                let raw = value_of(&args, i, flag, "a count argument");
                cli.trials_override = Some(parse_number(raw, flag, "count"));
            }
            "--threads" => {
                i += 1;
                let raw = value_of(&args, i, flag, "a count argument");
                cli.threads_override = Some(parse_number(raw, flag, "count"));
            }
            "--json-out" => {
                i += 1;
                cli.json_out = Some(value_of(&args, i, flag, "a path argument").to_string());
            }
            "--csv-out" => {
                i += 1;
                cli.csv_out = Some(value_of(&args, i, flag, "a path argument").to_string());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = parse_args();

    // --scenario takes priority, then --preset, then baseline
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(trials) = cli.trials_override {
        scenario.simulation.num_trials = trials;
    }
    if let Some(threads) = cli.threads_override {
        scenario.simulation.threads = threads;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let inputs = match scenario.to_inputs() {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let outputs = match run_erp_with(&inputs, &scenario.run_options()) {
        Ok(outputs) => outputs,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    println!("{outputs}");

    if let Some(ref path) = cli.json_out {
        if let Err(e) = export_json(&outputs, Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        info!(path = %path, "results written");
    }
    if let Some(ref path) = cli.csv_out {
        if let Err(e) = export_summary_csv(&outputs, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path, "summary written");
    }
}
