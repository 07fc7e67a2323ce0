use crate::devices::types::{AssetKind, DispatchFault, Dispatchable, STATE_EPSILON};
use crate::sim::availability::AvailabilityMask;
use crate::sim::inputs::BatterySpec;

/// A battery energy storage system serving critical load through an outage.
///
/// `OutageBattery` starts from the pre-outage state of charge recorded for the
/// outage's first step and only discharges. It never draws below
/// `minimum_soc_fraction` of its energy capacity, and delivers nothing in a
/// step where its availability mask is down.
///
/// # Energy Convention
/// Delivered power is measured at the AC bus. Stored energy falls by
/// `delivered_kw * dt_hours / discharge_efficiency`.
#[derive(Debug, Clone)]
pub struct OutageBattery<'a> {
    spec: &'a BatterySpec,
    mask: &'a AvailabilityMask,

    /// Stored energy in kilowatt-hours.
    pub charge_kwh: f64,

    /// Duration of one timestep in hours.
    dt_hours: f64,
}

impl<'a> OutageBattery<'a> {
    /// Creates the battery for an outage beginning at `start_step`.
    ///
    /// # Arguments
    ///
    /// * `spec` - Validated battery parameters
    /// * `mask` - This trial's availability mask for the battery
    /// * `start_step` - First step of the outage
    /// * `dt_hours` - Duration of one step in hours
    pub fn new(
        spec: &'a BatterySpec,
        mask: &'a AvailabilityMask,
        start_step: usize,
        dt_hours: f64,
    ) -> Self {
        let soc = spec
            .starting_soc_series_fraction
            .get(start_step)
            .copied()
            .unwrap_or(0.0);
        Self {
            spec,
            mask,
            charge_kwh: soc * spec.energy_kwh.at(start_step),
            dt_hours,
        }
    }

    fn floor_kwh(&self, step: usize) -> f64 {
        self.spec.minimum_soc_fraction * self.spec.energy_kwh.at(step)
    }
}

impl Dispatchable for OutageBattery<'_> {
    fn kind(&self) -> AssetKind {
        AssetKind::Battery
    }

    fn available_power(&self, step: usize) -> f64 {
        if !self.mask.is_up(step) {
            return 0.0;
        }
        let headroom_kwh = (self.charge_kwh - self.floor_kwh(step)).max(0.0);
        let energy_limited_kw = headroom_kwh * self.spec.discharge_efficiency / self.dt_hours;
        self.spec.power_kw.at(step).max(0.0).min(energy_limited_kw)
    }

    fn consume(&mut self, step: usize, kw: f64) -> Result<f64, DispatchFault> {
        let delivered_kw = kw.max(0.0).min(self.available_power(step));
        if delivered_kw <= 0.0 {
            return Ok(0.0);
        }

        self.charge_kwh -= delivered_kw * self.dt_hours / self.spec.discharge_efficiency;

        let floor = self.floor_kwh(step);
        if self.charge_kwh < floor - STATE_EPSILON || !self.charge_kwh.is_finite() {
            return Err(DispatchFault {
                asset: AssetKind::Battery,
                step,
                message: format!(
                    "stored energy {:.6} kWh fell below floor {floor:.6} kWh",
                    self.charge_kwh
                ),
            });
        }
        self.charge_kwh = self.charge_kwh.max(floor);

        Ok(delivered_kw)
    }
}
