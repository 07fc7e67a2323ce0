//! ERP result record.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Outcome of a full ERP run. Produced once by the aggregator, never mutated.
///
/// Durations and start positions are in time steps; hours-of-day run `0..24`
/// and months `1..=12`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErpOutputs {
    /// Evaluated outage lengths, ascending.
    pub outage_durations: Vec<usize>,
    /// Probability a randomly timed outage of each duration is fully served.
    pub probs_of_surviving: BTreeMap<usize, f64>,
    /// hour-of-day -> duration -> probability, binned by outage start.
    pub probs_of_surviving_by_hour_of_the_day: BTreeMap<usize, BTreeMap<usize, f64>>,
    /// month -> duration -> probability, binned by outage start.
    pub probs_of_surviving_by_month: BTreeMap<usize, BTreeMap<usize, f64>>,
    /// start step -> probability of surviving the longest duration.
    pub cumulative_outage_survival_final_time_step: BTreeMap<usize, f64>,
    /// Mean over start steps of `cumulative_outage_survival_final_time_step`.
    pub mean_cumulative_outage_survival_final_time_step: f64,
    /// Index k: mean over starts of P(survive steps 0..=k), up to the longest duration.
    pub mean_cumulative_survival_by_time_step: Vec<f64>,
    /// Index k: min over starts of P(survive steps 0..=k).
    pub min_cumulative_survival_by_time_step: Vec<f64>,
    /// Index k: mean over starts of P(step k is served), whatever happened before it.
    pub mean_marginal_survival_by_time_step: Vec<f64>,
    pub min_marginal_survival_by_time_step: Vec<f64>,
    /// Mean unserved energy (kWh) per outage of each duration.
    pub unserved_load_per_outage: BTreeMap<usize, f64>,
    pub max_unserved_load_per_outage: BTreeMap<usize, f64>,
    /// Mean generator fuel burned (gal) per outage of each duration.
    pub generator_fuel_used_per_outage: BTreeMap<usize, f64>,
    pub max_generator_fuel_used_per_outage: BTreeMap<usize, f64>,
    /// Value of lost load times the worst unserved energy seen for each duration.
    pub max_outage_cost_per_outage_duration: BTreeMap<usize, f64>,
    /// Value of lost load times the mean unserved energy for each duration.
    pub expected_outage_cost_per_outage_duration: BTreeMap<usize, f64>,
    /// Hours survived, capped at the longest duration.
    pub resilience_hours_min: f64,
    pub resilience_hours_max: f64,
    pub resilience_hours_avg: f64,
    pub num_trials: usize,
    pub starts_evaluated: usize,
}

impl fmt::Display for ErpOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- ERP Report ---")?;
        writeln!(
            f,
            "Trials x starts:        {} x {}",
            self.num_trials, self.starts_evaluated
        )?;
        writeln!(
            f,
            "Hours survived:         min {:.2}  avg {:.2}  max {:.2}",
            self.resilience_hours_min, self.resilience_hours_avg, self.resilience_hours_max
        )?;
        writeln!(
            f,
            "{:>10}  {:>10}  {:>14}  {:>12}  {:>12}",
            "duration", "P(survive)", "unserved kWh", "fuel gal", "max cost"
        )?;
        for d in &self.outage_durations {
            writeln!(
                f,
                "{:>10}  {:>10.4}  {:>14.3}  {:>12.3}  {:>12.2}",
                d,
                self.probs_of_surviving.get(d).copied().unwrap_or(0.0),
                self.unserved_load_per_outage.get(d).copied().unwrap_or(0.0),
                self.generator_fuel_used_per_outage.get(d).copied().unwrap_or(0.0),
                self.max_outage_cost_per_outage_duration
                    .get(d)
                    .copied()
                    .unwrap_or(0.0),
            )?;
        }
        write!(
            f,
            "Mean survival of longest outage: {:.4}",
            self.mean_cumulative_outage_survival_final_time_step
        )
    }
}
