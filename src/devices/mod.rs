//! Outage-time models of the on-site assets that serve critical load.

/// Stationary battery storage model.
pub mod battery;
/// Backup generator fleet model.
pub mod generator;
/// Solar photovoltaic array model.
pub mod pv;
pub mod types;

// Re-export the main types for convenience
pub use battery::OutageBattery;
pub use generator::GeneratorFleet;
pub use pv::OutagePv;
pub use types::AssetKind;
pub use types::DispatchFault;
pub use types::Dispatchable;
