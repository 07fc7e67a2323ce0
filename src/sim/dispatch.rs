//! Hour-by-hour replay of a single outage instance.

use crate::devices::{DispatchFault, Dispatchable, GeneratorFleet, OutageBattery, OutagePv};
use crate::error::ErpError;

use super::availability::{AvailabilityMask, TrialMasks};
use super::calendar::TimeIndex;
use super::inputs::ErpInputs;

/// Shortfall below this many kW is treated as floating-point noise.
pub const UNSERVED_TOLERANCE_KW: f64 = 1e-6;

/// Survive/fail verdict and energy totals for one (trial, start, duration).
#[derive(Debug, Clone, PartialEq)]
pub struct OutageResult {
    pub survived: bool,
    /// Steps served before the first shortfall, or the full duration.
    pub steps_survived: usize,
    /// Unserved energy over the whole outage (kWh). Zero when survived.
    pub unserved_kwh: f64,
    pub fuel_used_gal: f64,
}

/// Per-step record of one replay, from which any shorter duration's result
/// can be read off as a prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct OutageTrace {
    pub start: usize,
    /// First step index (0-based within the outage) with unserved load.
    pub first_failure: Option<usize>,
    /// Whether each step's load was fully served, regardless of earlier steps.
    pub step_served: Vec<bool>,
    /// Unserved energy accumulated through the end of each step.
    pub cumulative_unserved_kwh: Vec<f64>,
    /// Fuel burned through the end of each step.
    pub cumulative_fuel_gal: Vec<f64>,
}

impl OutageTrace {
    /// Steps replayed.
    pub fn len(&self) -> usize {
        self.cumulative_unserved_kwh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative_unserved_kwh.is_empty()
    }

    /// Result of an outage of `duration` steps, which must not exceed [`Self::len`].
    pub fn outcome(&self, duration: usize) -> OutageResult {
        let survived = self.first_failure.is_none_or(|f| f >= duration);
        let at = |series: &[f64]| {
            duration
                .checked_sub(1)
                .and_then(|i| series.get(i))
                .copied()
                .unwrap_or(0.0)
        };
        OutageResult {
            survived,
            steps_survived: self.first_failure.map_or(duration, |f| f.min(duration)),
            unserved_kwh: at(&self.cumulative_unserved_kwh),
            fuel_used_gal: at(&self.cumulative_fuel_gal),
        }
    }
}

/// How load was met in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepBalance {
    pub pv_kw: f64,
    pub battery_kw: f64,
    pub generator_kw: f64,
    pub unserved_kw: f64,
}

/// The three asset models, always dispatched PV, then battery, then generator.
struct DispatchStack<'a> {
    pv: OutagePv<'a>,
    battery: OutageBattery<'a>,
    generators: GeneratorFleet<'a>,
}

impl DispatchStack<'_> {
    fn serve(&mut self, step: usize, load_kw: f64) -> Result<StepBalance, DispatchFault> {
        self.pv.begin_step(step);
        self.battery.begin_step(step);
        self.generators.begin_step(step);

        let mut remaining = load_kw;
        let pv_kw = draw(&mut self.pv, step, &mut remaining)?;
        let battery_kw = draw(&mut self.battery, step, &mut remaining)?;
        let generator_kw = draw(&mut self.generators, step, &mut remaining)?;

        Ok(StepBalance {
            pv_kw,
            battery_kw,
            generator_kw,
            unserved_kw: remaining,
        })
    }
}

fn draw(asset: &mut impl Dispatchable, step: usize, remaining: &mut f64) -> Result<f64, DispatchFault> {
    if *remaining <= 0.0 {
        return Ok(0.0);
    }
    let request = remaining.min(asset.available_power(step));
    let delivered = asset.consume(step, request)?;
    *remaining = (*remaining - delivered).max(0.0);
    Ok(delivered)
}

/// Replays `duration` steps of an outage beginning at `start`, wrapping past the
/// end of the year, and records the per-step cumulative totals.
///
/// Replay continues after the first shortfall so the unserved energy of the
/// whole outage is known. The instance is failed from that step on.
///
/// # Errors
///
/// `WorkerFailure` tagged with the trial, start and duration if an asset
/// reaches an impossible state; `InvalidInput` if the series length is not a
/// supported resolution or a profile or mask does not cover every step.
pub fn replay_outage(
    inputs: &ErpInputs,
    masks: &TrialMasks,
    start: usize,
    duration: usize,
) -> Result<OutageTrace, ErpError> {
    let n = inputs.n_steps();
    let time = TimeIndex::for_series_len(n).ok_or_else(|| {
        ErpError::invalid("load_series_kw", format!("unsupported series length {n}"))
    })?;
    let dt = time.dt_hours();
    check_coverage(inputs, masks, n)?;

    let mut stack = DispatchStack {
        pv: OutagePv::new(&inputs.pv.production_kw, &masks.pv),
        battery: OutageBattery::new(&inputs.battery, &masks.battery, start, dt),
        generators: GeneratorFleet::new(&inputs.generator, &masks.generators, start, dt),
    };

    let mut trace = OutageTrace {
        start,
        first_failure: None,
        step_served: Vec::with_capacity(duration),
        cumulative_unserved_kwh: Vec::with_capacity(duration),
        cumulative_fuel_gal: Vec::with_capacity(duration),
    };
    let mut unserved_kwh = 0.0;

    for i in 0..duration {
        let t = (start + i) % n;
        let balance = stack
            .serve(t, inputs.load_series_kw[t])
            .map_err(|fault| ErpError::WorkerFailure {
                trial: masks.trial,
                start,
                duration,
                message: fault.to_string(),
            })?;

        let served = balance.unserved_kw <= UNSERVED_TOLERANCE_KW;
        if !served {
            unserved_kwh += balance.unserved_kw * dt;
            trace.first_failure.get_or_insert(i);
        }
        trace.step_served.push(served);
        trace.cumulative_unserved_kwh.push(unserved_kwh);
        trace.cumulative_fuel_gal.push(stack.generators.fuel_used_gal);
    }

    Ok(trace)
}

/// Confirms every per-step profile and mask has one entry per load step.
fn check_coverage(inputs: &ErpInputs, masks: &TrialMasks, n: usize) -> Result<(), ErpError> {
    let profiles = [
        ("pv.production_kw", &inputs.pv.production_kw),
        ("battery.power_kw", &inputs.battery.power_kw),
        ("battery.energy_kwh", &inputs.battery.energy_kwh),
        ("generator.nameplate_kw", &inputs.generator.nameplate_kw),
    ];
    for (field, profile) in profiles {
        if let Some(len) = profile.series_len().filter(|&len| len != n) {
            return Err(ErpError::invalid(
                field,
                format!("length {len} does not match load_series_kw length {n}"),
            ));
        }
    }

    let generator_masks = masks
        .generators
        .iter()
        .flat_map(|g| [&g.available, &g.starts, &g.runs]);
    let short = [&masks.pv, &masks.battery]
        .into_iter()
        .chain(generator_masks)
        .find_map(|m| match m {
            AvailabilityMask::Steps(s) if s.len() != n => Some(s.len()),
            _ => None,
        });
    if let Some(len) = short {
        return Err(ErpError::invalid(
            "availability mask",
            format!("trial {} mask has {len} steps, expected {n}", masks.trial),
        ));
    }
    Ok(())
}

/// Survive/fail verdict for one outage instance.
///
/// Pure function of its arguments; safe to call from any worker.
pub fn simulate_outage(
    inputs: &ErpInputs,
    masks: &TrialMasks,
    start: usize,
    duration: usize,
) -> Result<OutageResult, ErpError> {
    Ok(replay_outage(inputs, masks, start, duration)?.outcome(duration))
}
