//! Presets and scenario files resolve into runnable inputs.

use std::path::Path;

use erp_sim::config::ScenarioConfig;
use erp_sim::sim::run_erp_with;

#[test]
fn every_preset_runs() {
    for name in ScenarioConfig::PRESETS {
        let mut cfg = ScenarioConfig::from_preset(name).expect("known preset");
        cfg.simulation.start_stride = 24;
        cfg.simulation.num_trials = 2;
        let inputs = cfg.to_inputs().expect("resolves");
        let out = run_erp_with(&inputs, &cfg.run_options()).expect("run succeeds");
        assert_eq!(out.starts_evaluated, 365, "{name}");
        assert_eq!(out.outage_durations, cfg.simulation.outage_durations, "{name}");
    }
}

#[test]
fn generator_only_preset_always_survives() {
    let cfg = ScenarioConfig::generator_only();
    let inputs = cfg.to_inputs().expect("resolves");
    let out = run_erp_with(&inputs, &cfg.run_options()).expect("run succeeds");
    for d in [1, 4, 8] {
        assert_eq!(out.probs_of_surviving[&d], 1.0);
    }
}

#[test]
fn solar_storage_is_weaker_overnight() {
    let mut cfg = ScenarioConfig::solar_storage();
    cfg.simulation.num_trials = 1;
    cfg.pv.operational_availability = 1.0;
    cfg.battery.operational_availability = 1.0;
    cfg.battery.energy_kwh = erp_sim::config::ProfileConfig::Scalar(30.0);
    let inputs = cfg.to_inputs().expect("resolves");
    let out = run_erp_with(&inputs, &cfg.run_options()).expect("run succeeds");

    let by_hour = &out.probs_of_surviving_by_hour_of_the_day;
    let noon = by_hour[&12][&4];
    let evening = by_hour[&19][&4];
    assert!(noon > evening, "noon {noon} vs evening {evening}");
}

#[test]
fn scenario_files_parse_and_resolve() {
    for file in [
        "scenarios/generator_only.toml",
        "scenarios/solar_storage.toml",
        "scenarios/measured_load.toml",
    ] {
        let cfg = ScenarioConfig::from_toml_file(Path::new(file)).expect("parses");
        assert!(cfg.validate().is_empty(), "{file}: {:?}", cfg.validate());
        let inputs = cfg.to_inputs().expect("resolves");
        assert_eq!(inputs.load_series_kw.len(), 8760, "{file}");
    }
}

#[test]
fn csv_reference_resolves_relative_to_scenario() {
    let cfg = ScenarioConfig::from_toml_file(Path::new("scenarios/measured_load.toml"))
        .expect("parses");
    let inputs = cfg.to_inputs().expect("resolves");
    assert!((inputs.load_series_kw[0] - 13.76).abs() < 1e-9);
    assert_eq!(inputs.generator.num_generators, 2);
}
