//! Reduction of per-start outage results into [`ErpOutputs`].
//!
//! [`SurvivalTally`] is a commutative monoid: counts add, extremes take
//! min/max, and floating-point sums live in per-start slots that are only
//! added together, in start order, by [`SurvivalTally::finish`]. Partial
//! tallies from any number of workers can therefore be merged in any order
//! and still give bit-identical outputs.

use std::collections::BTreeMap;

use super::calendar::TimeIndex;
use super::dispatch::OutageResult;
use super::types::ErpOutputs;

/// Successes over attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ratio {
    pub survived: u64,
    pub total: u64,
}

impl Ratio {
    pub fn add(&mut self, survived: u64, total: u64) {
        self.survived += survived;
        self.total += total;
    }

    pub fn merge(&mut self, other: Ratio) {
        self.add(other.survived, other.total);
    }

    /// `None` when nothing was evaluated.
    pub fn prob(&self) -> Option<f64> {
        (self.total > 0).then(|| self.survived as f64 / self.total as f64)
    }
}

/// All trials of one outage start, reduced over the trial axis.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSummary {
    pub start: usize,
    pub trials: u64,
    /// Trials surviving each requested duration (same order as the durations).
    pub survived: Vec<u64>,
    /// Index k: trials serving every step `0..=k`, up to the longest duration.
    pub survived_through_step: Vec<u64>,
    /// Index k: trials serving step k itself.
    pub served_at_step: Vec<u64>,
    pub unserved_kwh_sum: Vec<f64>,
    pub unserved_kwh_max: Vec<f64>,
    pub fuel_gal_sum: Vec<f64>,
    pub fuel_gal_max: Vec<f64>,
    pub steps_survived_min: u64,
    pub steps_survived_max: u64,
    pub steps_survived_sum: u64,
}

impl StartSummary {
    pub fn new(start: usize, n_durations: usize, max_duration: usize) -> Self {
        Self {
            start,
            trials: 0,
            survived: vec![0; n_durations],
            survived_through_step: vec![0; max_duration],
            served_at_step: vec![0; max_duration],
            unserved_kwh_sum: vec![0.0; n_durations],
            unserved_kwh_max: vec![0.0; n_durations],
            fuel_gal_sum: vec![0.0; n_durations],
            fuel_gal_max: vec![0.0; n_durations],
            steps_survived_min: u64::MAX,
            steps_survived_max: 0,
            steps_survived_sum: 0,
        }
    }

    /// Adds one trial: its results for each duration (in duration order), the
    /// number of steps it served before the first shortfall, and which steps
    /// of the longest outage were served.
    pub fn record_trial(
        &mut self,
        results: &[OutageResult],
        steps_survived: usize,
        step_served: &[bool],
    ) {
        self.trials += 1;
        for (i, r) in results.iter().enumerate() {
            if r.survived {
                self.survived[i] += 1;
            }
            self.unserved_kwh_sum[i] += r.unserved_kwh;
            self.unserved_kwh_max[i] = self.unserved_kwh_max[i].max(r.unserved_kwh);
            self.fuel_gal_sum[i] += r.fuel_used_gal;
            self.fuel_gal_max[i] = self.fuel_gal_max[i].max(r.fuel_used_gal);
        }
        let capped = steps_survived.min(self.survived_through_step.len());
        for count in &mut self.survived_through_step[..capped] {
            *count += 1;
        }
        for (count, &served) in self.served_at_step.iter_mut().zip(step_served) {
            if served {
                *count += 1;
            }
        }
        let steps = capped as u64;
        self.steps_survived_min = self.steps_survived_min.min(steps);
        self.steps_survived_max = self.steps_survived_max.max(steps);
        self.steps_survived_sum += steps;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StartSlot {
    final_survived: u64,
    trials: u64,
    unserved_kwh_sum: Vec<f64>,
    fuel_gal_sum: Vec<f64>,
}

/// Mergeable accumulator over outage starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalTally {
    durations: Vec<usize>,
    time: TimeIndex,
    by_duration: Vec<Ratio>,
    by_hour_of_day: Vec<Vec<Ratio>>,
    by_month: Vec<Vec<Ratio>>,
    survived_through_step: Vec<Ratio>,
    min_start_survival_through_step: Vec<Option<(u64, u64)>>,
    served_at_step: Vec<Ratio>,
    min_start_served_at_step: Vec<Option<(u64, u64)>>,
    unserved_kwh_max: Vec<f64>,
    fuel_gal_max: Vec<f64>,
    steps_survived_min: u64,
    steps_survived_max: u64,
    steps_survived_sum: u64,
    trials_seen: u64,
    slots: BTreeMap<usize, StartSlot>,
}

impl SurvivalTally {
    /// Empty tally for the given (sorted, de-duplicated) durations.
    pub fn new(durations: &[usize], time: TimeIndex) -> Self {
        let nd = durations.len();
        let max_d = durations.iter().copied().max().unwrap_or(0);
        Self {
            durations: durations.to_vec(),
            time,
            by_duration: vec![Ratio::default(); nd],
            by_hour_of_day: vec![vec![Ratio::default(); nd]; 24],
            by_month: vec![vec![Ratio::default(); nd]; 12],
            survived_through_step: vec![Ratio::default(); max_d],
            min_start_survival_through_step: vec![None; max_d],
            served_at_step: vec![Ratio::default(); max_d],
            min_start_served_at_step: vec![None; max_d],
            unserved_kwh_max: vec![0.0; nd],
            fuel_gal_max: vec![0.0; nd],
            steps_survived_min: u64::MAX,
            steps_survived_max: 0,
            steps_survived_sum: 0,
            trials_seen: 0,
            slots: BTreeMap::new(),
        }
    }

    pub fn starts(&self) -> usize {
        self.slots.len()
    }

    /// Folds one start's summary into the tally.
    pub fn absorb(&mut self, s: StartSummary) {
        let hour = self.time.hour_of_day(s.start);
        let month = self.time.month(s.start);
        for i in 0..self.durations.len() {
            self.by_duration[i].add(s.survived[i], s.trials);
            self.by_hour_of_day[hour][i].add(s.survived[i], s.trials);
            self.by_month[month - 1][i].add(s.survived[i], s.trials);
            self.unserved_kwh_max[i] = self.unserved_kwh_max[i].max(s.unserved_kwh_max[i]);
            self.fuel_gal_max[i] = self.fuel_gal_max[i].max(s.fuel_gal_max[i]);
        }
        for (k, &count) in s.survived_through_step.iter().enumerate() {
            self.survived_through_step[k].add(count, s.trials);
            self.min_start_survival_through_step[k] =
                lower_fraction(self.min_start_survival_through_step[k], Some((count, s.trials)));
        }
        for (k, &count) in s.served_at_step.iter().enumerate() {
            self.served_at_step[k].add(count, s.trials);
            self.min_start_served_at_step[k] =
                lower_fraction(self.min_start_served_at_step[k], Some((count, s.trials)));
        }
        if s.trials > 0 {
            self.steps_survived_min = self.steps_survived_min.min(s.steps_survived_min);
            self.steps_survived_max = self.steps_survived_max.max(s.steps_survived_max);
        }
        self.steps_survived_sum += s.steps_survived_sum;
        self.trials_seen += s.trials;
        self.slots.insert(
            s.start,
            StartSlot {
                final_survived: s.survived.last().copied().unwrap_or(0),
                trials: s.trials,
                unserved_kwh_sum: s.unserved_kwh_sum,
                fuel_gal_sum: s.fuel_gal_sum,
            },
        );
    }

    /// Combines two partial tallies over disjoint sets of starts.
    pub fn merge(mut self, mut other: SurvivalTally) -> SurvivalTally {
        for i in 0..self.durations.len() {
            self.by_duration[i].merge(other.by_duration[i]);
            for h in 0..24 {
                self.by_hour_of_day[h][i].merge(other.by_hour_of_day[h][i]);
            }
            for m in 0..12 {
                self.by_month[m][i].merge(other.by_month[m][i]);
            }
            self.unserved_kwh_max[i] = self.unserved_kwh_max[i].max(other.unserved_kwh_max[i]);
            self.fuel_gal_max[i] = self.fuel_gal_max[i].max(other.fuel_gal_max[i]);
        }
        for k in 0..self.survived_through_step.len() {
            self.survived_through_step[k].merge(other.survived_through_step[k]);
            self.min_start_survival_through_step[k] = lower_fraction(
                self.min_start_survival_through_step[k],
                other.min_start_survival_through_step[k],
            );
            self.served_at_step[k].merge(other.served_at_step[k]);
            self.min_start_served_at_step[k] =
                lower_fraction(self.min_start_served_at_step[k], other.min_start_served_at_step[k]);
        }
        self.steps_survived_min = self.steps_survived_min.min(other.steps_survived_min);
        self.steps_survived_max = self.steps_survived_max.max(other.steps_survived_max);
        self.steps_survived_sum += other.steps_survived_sum;
        self.trials_seen += other.trials_seen;
        self.slots.append(&mut other.slots);
        self
    }

    /// Turns the tally into the final result record.
    pub fn finish(self, value_of_lost_load_per_kwh: f64) -> ErpOutputs {
        let nd = self.durations.len();
        let trials = self.trials_seen;
        let per_duration = |values: &[f64]| -> BTreeMap<usize, f64> {
            self.durations.iter().copied().zip(values.iter().copied()).collect()
        };
        let probs = |ratios: &[Ratio]| -> BTreeMap<usize, f64> {
            self.durations
                .iter()
                .zip(ratios)
                .filter_map(|(&d, r)| r.prob().map(|p| (d, p)))
                .collect()
        };
        let binned = |bins: &[Vec<Ratio>], first_label: usize| {
            bins.iter()
                .enumerate()
                .filter(|(_, row)| row.iter().any(|r| r.total > 0))
                .map(|(i, row)| (i + first_label, probs(row)))
                .collect::<BTreeMap<_, _>>()
        };

        let mut unserved_sum = vec![0.0; nd];
        let mut fuel_sum = vec![0.0; nd];
        for slot in self.slots.values() {
            for i in 0..nd {
                unserved_sum[i] += slot.unserved_kwh_sum[i];
                fuel_sum[i] += slot.fuel_gal_sum[i];
            }
        }
        let mean = |sums: Vec<f64>| -> Vec<f64> {
            sums.into_iter()
                .map(|s| if trials > 0 { s / trials as f64 } else { 0.0 })
                .collect()
        };
        let unserved_mean = mean(unserved_sum);
        let fuel_mean = mean(fuel_sum);
        let scale = |values: &[f64]| -> Vec<f64> {
            values.iter().map(|v| v * value_of_lost_load_per_kwh).collect()
        };

        let final_step = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.trials > 0)
            .map(|(&start, slot)| (start, slot.final_survived as f64 / slot.trials as f64))
            .collect();

        let mean_over_starts = |ratios: &[Ratio]| -> Vec<f64> {
            ratios.iter().map(|r| r.prob().unwrap_or(0.0)).collect()
        };
        let min_over_starts = |fractions: &[Option<(u64, u64)>]| -> Vec<f64> {
            fractions
                .iter()
                .map(|m| m.map_or(0.0, |(s, t)| s as f64 / t as f64))
                .collect()
        };

        let dt = self.time.dt_hours();
        let (hours_min, hours_max, hours_avg) = if trials > 0 {
            (
                self.steps_survived_min as f64 * dt,
                self.steps_survived_max as f64 * dt,
                self.steps_survived_sum as f64 / trials as f64 * dt,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        ErpOutputs {
            outage_durations: self.durations.clone(),
            probs_of_surviving: probs(&self.by_duration),
            probs_of_surviving_by_hour_of_the_day: binned(&self.by_hour_of_day, 0),
            probs_of_surviving_by_month: binned(&self.by_month, 1),
            cumulative_outage_survival_final_time_step: final_step,
            mean_cumulative_outage_survival_final_time_step: self
                .by_duration
                .last()
                .and_then(Ratio::prob)
                .unwrap_or(0.0),
            mean_cumulative_survival_by_time_step: mean_over_starts(&self.survived_through_step),
            min_cumulative_survival_by_time_step: min_over_starts(
                &self.min_start_survival_through_step,
            ),
            mean_marginal_survival_by_time_step: mean_over_starts(&self.served_at_step),
            min_marginal_survival_by_time_step: min_over_starts(&self.min_start_served_at_step),
            unserved_load_per_outage: per_duration(&unserved_mean),
            max_unserved_load_per_outage: per_duration(&self.unserved_kwh_max),
            generator_fuel_used_per_outage: per_duration(&fuel_mean),
            max_generator_fuel_used_per_outage: per_duration(&self.fuel_gal_max),
            max_outage_cost_per_outage_duration: per_duration(&scale(&self.unserved_kwh_max)),
            expected_outage_cost_per_outage_duration: per_duration(&scale(&unserved_mean)),
            resilience_hours_min: hours_min,
            resilience_hours_max: hours_max,
            resilience_hours_avg: hours_avg,
            num_trials: self
                .slots
                .values()
                .next()
                .map_or(0, |slot| slot.trials as usize),
            starts_evaluated: self.slots.len(),
        }
    }
}

/// The smaller of two survival fractions, compared exactly by cross-multiplication.
fn lower_fraction(a: Option<(u64, u64)>, b: Option<(u64, u64)>) -> Option<(u64, u64)> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some((sa, ta)), Some((sb, tb))) => {
            if ta == 0 {
                Some((sb, tb))
            } else if tb == 0 || u128::from(sa) * u128::from(tb) <= u128::from(sb) * u128::from(ta) {
                Some((sa, ta))
            } else {
                Some((sb, tb))
            }
        }
    }
}
