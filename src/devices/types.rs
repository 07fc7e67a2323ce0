//! Common types and traits for outage-time asset models.

use std::fmt;

use thiserror::Error;

/// The fixed set of on-site resources, listed in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Pv,
    Battery,
    Generator,
}

impl AssetKind {
    /// Dispatch order: zero-marginal-cost resources first.
    pub const PRIORITY: [AssetKind; 3] = [AssetKind::Pv, AssetKind::Battery, AssetKind::Generator];
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pv => "PV",
            Self::Battery => "Battery",
            Self::Generator => "Generator",
        };
        f.write_str(name)
    }
}

/// An impossible numeric state inside a single replay.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{asset} at step {step}: {message}")]
pub struct DispatchFault {
    pub asset: AssetKind,
    pub step: usize,
    pub message: String,
}

/// Uniform capability interface for the assets serving critical load during an outage.
///
/// Implementors hold the per-outage state (remaining charge, fuel, tripped units)
/// and borrow everything else from the immutable inputs and trial masks.
pub trait Dispatchable {
    fn kind(&self) -> AssetKind;

    /// Called once at the top of each outage step, before any dispatch.
    fn begin_step(&mut self, _step: usize) {}

    /// Power (kW) the asset could deliver at `step`.
    fn available_power(&self, step: usize) -> f64;

    /// Delivers up to `kw` at `step` and returns the power actually delivered.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchFault` if the asset's internal state becomes invalid.
    fn consume(&mut self, step: usize, kw: f64) -> Result<f64, DispatchFault>;
}

/// Tolerance for floating-point drift in stored energy and fuel.
pub(crate) const STATE_EPSILON: f64 = 1e-9;
