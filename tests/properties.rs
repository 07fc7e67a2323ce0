//! Structural properties every ERP result must satisfy.

mod common;

use erp_sim::sim::inputs::Profile;
use erp_sim::sim::{RunOptions, run_erp_with};

#[test]
fn survival_never_increases_with_duration() {
    let out = run_erp_with(&common::mixed_site(4), &common::strided(5)).expect("run succeeds");
    let probs: Vec<f64> = out.probs_of_surviving.values().copied().collect();
    assert_eq!(probs.len(), 6);
    for pair in probs.windows(2) {
        assert!(pair[1] <= pair[0], "not monotone: {probs:?}");
    }
    for by_d in out
        .probs_of_surviving_by_hour_of_the_day
        .values()
        .chain(out.probs_of_surviving_by_month.values())
    {
        let p: Vec<f64> = by_d.values().copied().collect();
        for pair in p.windows(2) {
            assert!(pair[1] <= pair[0], "bin not monotone: {p:?}");
        }
    }
    for pair in out.mean_cumulative_survival_by_time_step.windows(2) {
        assert!(pair[1] <= pair[0]);
    }
}

#[test]
fn probabilities_are_bounded() {
    let out = run_erp_with(&common::mixed_site(3), &common::strided(7)).expect("run succeeds");
    let all = out
        .probs_of_surviving
        .values()
        .chain(out.probs_of_surviving_by_hour_of_the_day.values().flat_map(|m| m.values()))
        .chain(out.probs_of_surviving_by_month.values().flat_map(|m| m.values()))
        .chain(out.cumulative_outage_survival_final_time_step.values())
        .chain(&out.mean_cumulative_survival_by_time_step)
        .chain(&out.min_cumulative_survival_by_time_step)
        .chain(&out.mean_marginal_survival_by_time_step)
        .chain(&out.min_marginal_survival_by_time_step);
    for &p in all {
        assert!((0.0..=1.0).contains(&p), "{p} out of range");
    }
    for (min, mean) in out
        .min_cumulative_survival_by_time_step
        .iter()
        .zip(&out.mean_cumulative_survival_by_time_step)
    {
        assert!(min <= mean);
    }
    assert!(out.resilience_hours_min <= out.resilience_hours_avg);
    assert!(out.resilience_hours_avg <= out.resilience_hours_max);
    assert!(out.resilience_hours_max <= 24.0);
}

#[test]
fn marginal_survival_bounds_cumulative_survival() {
    let out = run_erp_with(&common::mixed_site(4), &common::strided(5)).expect("run succeeds");
    let longest = out.outage_durations.last().copied().unwrap_or(0);
    assert_eq!(out.mean_marginal_survival_by_time_step.len(), longest);
    assert_eq!(out.min_marginal_survival_by_time_step.len(), longest);
    for k in 0..longest {
        assert!(
            out.mean_marginal_survival_by_time_step[k] >= out.mean_cumulative_survival_by_time_step[k],
            "mean at step {k}"
        );
        assert!(
            out.min_marginal_survival_by_time_step[k] >= out.min_cumulative_survival_by_time_step[k],
            "min at step {k}"
        );
        assert!(
            out.min_marginal_survival_by_time_step[k] <= out.mean_marginal_survival_by_time_step[k]
        );
    }
    assert_eq!(
        out.mean_marginal_survival_by_time_step.first(),
        out.mean_cumulative_survival_by_time_step.first()
    );
}

#[test]
fn same_seed_same_outputs() {
    let inputs = common::mixed_site(3);
    let options = RunOptions {
        start_stride: 11,
        batch_size: 17,
        threads: 3,
        cancel: None,
    };
    let a = run_erp_with(&inputs, &options).expect("run succeeds");
    let b = run_erp_with(&inputs, &common::strided(11)).expect("run succeeds");
    assert_eq!(a, b);
}

#[test]
fn different_seed_changes_outcomes() {
    let mut inputs = common::mixed_site(3);
    let a = run_erp_with(&inputs, &common::strided(11)).expect("run succeeds");
    inputs.random_seed += 1;
    let b = run_erp_with(&inputs, &common::strided(11)).expect("run succeeds");
    assert_ne!(a.probs_of_surviving, b.probs_of_surviving);
}

#[test]
fn perfectly_reliable_oversized_assets_always_survive() {
    let mut inputs = common::mixed_site(2);
    inputs.pv.operational_availability = 1.0;
    inputs.battery.operational_availability = 1.0;
    inputs.generator.operational_availability = 1.0;
    inputs.generator.failure_to_start = 0.0;
    inputs.generator.failure_to_run = 0.0;
    inputs.generator.fuel_avail_gal = f64::INFINITY;
    inputs.generator.nameplate_kw = Profile::Scalar(25.0);
    let out = run_erp_with(&inputs, &common::strided(13)).expect("run succeeds");
    assert!(out.probs_of_surviving.values().all(|&p| p == 1.0));
    assert!(out.unserved_load_per_outage.values().all(|&kwh| kwh == 0.0));
}

#[test]
fn unavailable_sole_source_never_survives() {
    let inputs = {
        let mut i = common::generator_backed(5.0, 50.0, 0.0);
        i.outage_durations = vec![1, 6, 12];
        i.num_trials = 2;
        i
    };
    let out = run_erp_with(&inputs, &common::strided(9)).expect("run succeeds");
    assert!(out.probs_of_surviving.values().all(|&p| p == 0.0));
    assert_eq!(out.generator_fuel_used_per_outage[&12], 0.0);
}
