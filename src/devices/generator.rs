use crate::devices::types::{AssetKind, DispatchFault, Dispatchable, STATE_EPSILON};
use crate::sim::availability::GeneratorMasks;
use crate::sim::inputs::GeneratorSpec;

/// Backup generator fleet sharing one fuel tank through an outage.
///
/// A unit can serve in a step only if it started when the outage began, has
/// not tripped on a run failure since, and is not down for maintenance in
/// that step. Running units never go below their minimum turndown; surplus
/// output is curtailed.
///
/// # Fuel Model
/// Fuel per step is
/// `(intercept * nameplate * running_units + slope * output_kw) * dt_hours`.
/// When the tank cannot cover the requested units, fewer units are committed;
/// the fleet delivers zero only if not even one unit can hold its minimum.
#[derive(Debug, Clone)]
pub struct GeneratorFleet<'a> {
    spec: &'a GeneratorSpec,
    masks: &'a [GeneratorMasks],
    started: Vec<bool>,
    tripped: Vec<bool>,

    /// Fuel remaining in gallons (may be infinite).
    pub fuel_gal: f64,

    /// Fuel burned so far in this outage.
    pub fuel_used_gal: f64,

    dt_hours: f64,
}

impl<'a> GeneratorFleet<'a> {
    /// Creates the fleet for an outage beginning at `start_step`, resolving
    /// which units fail to start.
    pub fn new(
        spec: &'a GeneratorSpec,
        masks: &'a [GeneratorMasks],
        start_step: usize,
        dt_hours: f64,
    ) -> Self {
        let started = masks.iter().map(|m| m.starts.is_up(start_step)).collect();
        Self {
            spec,
            masks,
            started,
            tripped: vec![false; masks.len()],
            fuel_gal: spec.fuel_avail_gal,
            fuel_used_gal: 0.0,
            dt_hours,
        }
    }

    /// Units able to run at `step`.
    pub fn units_online(&self, step: usize) -> usize {
        self.masks
            .iter()
            .enumerate()
            .filter(|(u, m)| self.started[*u] && !self.tripped[*u] && m.available.is_up(step))
            .count()
    }

    fn fuel_for(&self, nameplate_kw: f64, running: usize, output_kw: f64) -> f64 {
        (self.spec.fuel_intercept_gal_per_hr_per_kw * nameplate_kw * running as f64
            + self.spec.fuel_slope_gal_per_kwh * output_kw)
            * self.dt_hours
    }

    /// Largest output the remaining fuel supports with `running` units.
    fn fuel_limited_kw(&self, nameplate_kw: f64, running: usize) -> f64 {
        if self.fuel_gal.is_infinite() {
            return f64::INFINITY;
        }
        let no_load = self.fuel_for(nameplate_kw, running, 0.0);
        if no_load > self.fuel_gal {
            return 0.0;
        }
        if self.spec.fuel_slope_gal_per_kwh <= 0.0 {
            return f64::INFINITY;
        }
        (self.fuel_gal - no_load) / (self.spec.fuel_slope_gal_per_kwh * self.dt_hours)
    }

    /// Picks how many of `online` units run to serve `request_kw`.
    ///
    /// Starts from the units the request needs and steps down while the tank
    /// cannot hold that many at minimum turndown, keeping whichever commitment
    /// delivers the most.
    fn commit(&self, nameplate_kw: f64, online: usize, request_kw: f64) -> Option<Commitment> {
        let request_kw = request_kw.min(nameplate_kw * online as f64);
        let wanted = ((request_kw / nameplate_kw).ceil() as usize).clamp(1, online);

        let mut best: Option<Commitment> = None;
        for running in (1..=wanted).rev() {
            let min_output_kw = self.spec.min_turndown_fraction * nameplate_kw * running as f64;
            let mut output_kw = request_kw
                .max(min_output_kw)
                .min(nameplate_kw * running as f64);
            let mut fuel_gal = self.fuel_for(nameplate_kw, running, output_kw);
            if fuel_gal > self.fuel_gal {
                let limited_kw = self.fuel_limited_kw(nameplate_kw, running);
                if limited_kw <= 0.0 || limited_kw < min_output_kw {
                    continue;
                }
                output_kw = limited_kw.min(output_kw);
                fuel_gal = self.fuel_gal;
            }

            let candidate = Commitment {
                delivered_kw: output_kw.min(request_kw),
                fuel_gal,
            };
            if best.as_ref().is_none_or(|b| candidate.delivered_kw > b.delivered_kw) {
                best = Some(candidate);
            }
            if output_kw >= request_kw {
                break;
            }
        }
        best
    }
}

/// Delivered output and fuel burn of the units chosen for one step.
#[derive(Debug, Clone, Copy)]
struct Commitment {
    delivered_kw: f64,
    fuel_gal: f64,
}

impl Dispatchable for GeneratorFleet<'_> {
    fn kind(&self) -> AssetKind {
        AssetKind::Generator
    }

    fn begin_step(&mut self, step: usize) {
        for (u, m) in self.masks.iter().enumerate() {
            if self.started[u] && !m.runs.is_up(step) {
                self.tripped[u] = true;
            }
        }
    }

    fn available_power(&self, step: usize) -> f64 {
        let nameplate = self.spec.nameplate_kw.at(step);
        let online = self.units_online(step);
        if online == 0 || nameplate <= 0.0 {
            return 0.0;
        }
        self.commit(nameplate, online, nameplate * online as f64)
            .map_or(0.0, |c| c.delivered_kw)
    }

    fn consume(&mut self, step: usize, kw: f64) -> Result<f64, DispatchFault> {
        let nameplate = self.spec.nameplate_kw.at(step);
        let online = self.units_online(step);
        if kw <= 0.0 || online == 0 || nameplate <= 0.0 {
            return Ok(0.0);
        }

        let Some(Commitment {
            delivered_kw,
            fuel_gal,
        }) = self.commit(nameplate, online, kw)
        else {
            return Ok(0.0);
        };

        self.fuel_gal -= fuel_gal;
        if self.fuel_gal < -STATE_EPSILON || self.fuel_gal.is_nan() {
            return Err(DispatchFault {
                asset: AssetKind::Generator,
                step,
                message: format!("fuel tank went negative ({:.9} gal)", self.fuel_gal),
            });
        }
        self.fuel_gal = self.fuel_gal.max(0.0);
        self.fuel_used_gal += fuel_gal;

        Ok(delivered_kw)
    }
}
