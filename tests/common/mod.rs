//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use erp_sim::sim::inputs::{ErpInputs, Profile};
use erp_sim::sim::RunOptions;

/// Flat critical load over a one-year hourly series.
pub fn constant_load(kw: f64) -> ErpInputs {
    ErpInputs::with_load(vec![kw; 8760])
}

/// Flat load served only by one generator with unlimited fuel and no
/// start/run failures.
pub fn generator_backed(load_kw: f64, gen_kw: f64, availability: f64) -> ErpInputs {
    let mut inputs = constant_load(load_kw);
    inputs.generator.nameplate_kw = Profile::Scalar(gen_kw);
    inputs.generator.operational_availability = availability;
    inputs
}

/// Site with PV, a battery and a fuel-limited generator, every asset unreliable.
pub fn mixed_site(num_trials: usize) -> ErpInputs {
    let load: Vec<f64> = (0..8760)
        .map(|t| 15.0 + 5.0 * ((t % 24) as f64 / 24.0 * std::f64::consts::TAU).sin())
        .collect();
    let pv: Vec<f64> = (0..8760)
        .map(|t| match t % 24 {
            h @ 7..=17 => 25.0 * (std::f64::consts::PI * (h - 6) as f64 / 12.0).sin(),
            _ => 0.0,
        })
        .collect();

    let mut inputs = ErpInputs::with_load(load);
    inputs.pv.production_kw = Profile::Series(pv);
    inputs.pv.operational_availability = 0.95;
    inputs.battery.power_kw = Profile::Scalar(10.0);
    inputs.battery.energy_kwh = Profile::Scalar(40.0);
    inputs.battery.operational_availability = 0.97;
    inputs.battery.minimum_soc_fraction = 0.1;
    inputs.battery.starting_soc_series_fraction = vec![0.8; 8760];
    inputs.generator.nameplate_kw = Profile::Scalar(12.0);
    inputs.generator.operational_availability = 0.9;
    inputs.generator.failure_to_start = 0.05;
    inputs.generator.failure_to_run = 0.01;
    inputs.generator.fuel_avail_gal = 30.0;
    inputs.outage_durations = vec![1, 2, 4, 8, 16, 24];
    inputs.num_trials = num_trials;
    inputs.random_seed = 7;
    inputs.value_of_lost_load_per_kwh = 20.0;
    inputs
}

/// Every `stride`-th start, to keep integration runs short.
pub fn strided(stride: usize) -> RunOptions {
    RunOptions {
        start_stride: stride,
        ..RunOptions::default()
    }
}
