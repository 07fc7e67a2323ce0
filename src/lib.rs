//! Energy Resilience Performance (ERP): Monte Carlo estimation of how likely a
//! site's backup assets are to carry its critical load through a grid outage.

pub mod config;
/// Outage-time PV, battery and generator models.
pub mod devices;
pub mod error;
pub mod io;
pub mod profiles;
/// Validation, sampling, dispatch, outage grid and aggregation.
pub mod sim;

pub use error::ErpError;
