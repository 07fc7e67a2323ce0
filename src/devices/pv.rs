use crate::devices::types::{AssetKind, DispatchFault, Dispatchable};
use crate::sim::availability::AvailabilityMask;
use crate::sim::inputs::Profile;

/// PV array during an outage: its production when up, nothing when down.
///
/// Stateless; surplus production is curtailed.
#[derive(Debug, Clone, Copy)]
pub struct OutagePv<'a> {
    production_kw: &'a Profile,
    mask: &'a AvailabilityMask,
}

impl<'a> OutagePv<'a> {
    pub fn new(production_kw: &'a Profile, mask: &'a AvailabilityMask) -> Self {
        Self {
            production_kw,
            mask,
        }
    }
}

impl Dispatchable for OutagePv<'_> {
    fn kind(&self) -> AssetKind {
        AssetKind::Pv
    }

    fn available_power(&self, step: usize) -> f64 {
        if self.mask.is_up(step) {
            self.production_kw.at(step).max(0.0)
        } else {
            0.0
        }
    }

    fn consume(&mut self, step: usize, kw: f64) -> Result<f64, DispatchFault> {
        Ok(kw.max(0.0).min(self.available_power(step)))
    }
}
