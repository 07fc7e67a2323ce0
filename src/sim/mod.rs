/// Reduction of outage results into the final record.
pub mod aggregate;
/// Seeded per-trial availability masks.
pub mod availability;
/// Step-to-calendar mapping for hour-of-day and month bins.
pub mod calendar;
pub mod dispatch;
/// Outage grid enumeration over the worker pool.
pub mod driver;
pub mod inputs;
pub mod types;
pub mod validate;

pub use driver::{CancelToken, RunOptions, run_erp, run_erp_with};
pub use inputs::ErpInputs;
pub use types::ErpOutputs;
