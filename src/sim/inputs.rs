//! Immutable simulation configuration consumed by the ERP engine.

use serde::{Deserialize, Serialize};

/// A capability that is either constant across the year or aligned to the load series.
///
/// # Examples
///
/// ```
/// use erp_sim::sim::inputs::Profile;
///
/// let flat = Profile::Scalar(5.0);
/// assert_eq!(flat.at(1234), 5.0);
///
/// let hourly = Profile::Series(vec![1.0, 2.0, 3.0]);
/// assert_eq!(hourly.at(2), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Profile {
    /// Value at time step `t`.
    ///
    /// # Panics
    ///
    /// If `t` is past the end of a series profile. `validate` and
    /// `replay_outage` check lengths before any indexing.
    pub fn at(&self, t: usize) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Series(s) => s[t],
        }
    }

    /// Series length, or `None` for a scalar.
    pub fn series_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Series(s) => Some(s.len()),
        }
    }

    /// Largest value over the year.
    pub fn max(&self) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Series(s) => s.iter().copied().fold(0.0, f64::max),
        }
    }

    /// Iterates the distinct stored values (one for a scalar).
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let slice: &[f64] = match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Series(s) => s,
        };
        slice.iter().copied()
    }

    /// True when every value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.values().all(|v| v == 0.0)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

/// On-site PV array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSpec {
    /// AC production (kW) at each step.
    pub production_kw: Profile,
    /// Probability the array can deliver its production in a given step.
    pub operational_availability: f64,
}

impl Default for PvSpec {
    fn default() -> Self {
        Self {
            production_kw: Profile::default(),
            operational_availability: 1.0,
        }
    }
}

/// Stationary battery. Only discharges during an outage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySpec {
    /// Inverter power limit (kW).
    pub power_kw: Profile,
    /// Usable energy capacity (kWh).
    pub energy_kwh: Profile,
    /// Probability the battery is online in a given step.
    pub operational_availability: f64,
    /// Discharge floor as a fraction of `energy_kwh`.
    pub minimum_soc_fraction: f64,
    /// State of charge when an outage begins at each step. May be empty when the
    /// battery has no energy capacity; validation fills it with zeros.
    pub starting_soc_series_fraction: Vec<f64>,
    /// Fraction of drawn energy delivered to the load (0, 1].
    pub discharge_efficiency: f64,
}

impl Default for BatterySpec {
    fn default() -> Self {
        Self {
            power_kw: Profile::default(),
            energy_kwh: Profile::default(),
            operational_availability: 1.0,
            minimum_soc_fraction: 0.0,
            starting_soc_series_fraction: Vec::new(),
            discharge_efficiency: 1.0,
        }
    }
}

/// A fleet of identical backup generators sharing one fuel tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    /// Nameplate of each unit (kW).
    pub nameplate_kw: Profile,
    pub num_generators: usize,
    /// Probability a unit is not down for maintenance in a given step.
    pub operational_availability: f64,
    /// Probability a unit fails to start when an outage begins.
    pub failure_to_start: f64,
    /// Probability a running unit fails in each step of an outage.
    pub failure_to_run: f64,
    /// Fuel on hand at the start of every outage (gal). `f64::INFINITY` means unlimited.
    pub fuel_avail_gal: f64,
    /// Fuel burn per kWh produced (gal/kWh).
    pub fuel_slope_gal_per_kwh: f64,
    /// No-load fuel burn per hour per kW of running nameplate (gal/h/kW).
    pub fuel_intercept_gal_per_hr_per_kw: f64,
    /// Minimum output of a running unit as a fraction of its nameplate.
    pub min_turndown_fraction: f64,
}

impl Default for GeneratorSpec {
    fn default() -> Self {
        Self {
            nameplate_kw: Profile::default(),
            num_generators: 1,
            operational_availability: 1.0,
            failure_to_start: 0.0,
            failure_to_run: 0.0,
            fuel_avail_gal: f64::INFINITY,
            fuel_slope_gal_per_kwh: 0.076,
            fuel_intercept_gal_per_hr_per_kw: 0.0,
            min_turndown_fraction: 0.0,
        }
    }
}

/// Complete ERP request. Constructed once, never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErpInputs {
    /// Critical load (kW) for every step of one year.
    pub load_series_kw: Vec<f64>,
    pub pv: PvSpec,
    pub battery: BatterySpec,
    pub generator: GeneratorSpec,
    /// Candidate outage lengths in time steps.
    pub outage_durations: Vec<usize>,
    /// Monte Carlo draws per outage.
    pub num_trials: usize,
    pub random_seed: u64,
    /// Cost of unserved energy ($/kWh) used for outage cost bounds.
    pub value_of_lost_load_per_kwh: f64,
}

impl ErpInputs {
    /// Inputs with every asset absent and a single trial; tests and presets fill in the rest.
    pub fn with_load(load_series_kw: Vec<f64>) -> Self {
        Self {
            load_series_kw,
            pv: PvSpec::default(),
            battery: BatterySpec::default(),
            generator: GeneratorSpec::default(),
            outage_durations: vec![1],
            num_trials: 1,
            random_seed: 42,
            value_of_lost_load_per_kwh: 0.0,
        }
    }

    /// Number of steps in the year.
    pub fn n_steps(&self) -> usize {
        self.load_series_kw.len()
    }

    /// Longest requested outage, in steps.
    pub fn max_duration(&self) -> usize {
        self.outage_durations.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_max_and_zero() {
        assert_eq!(Profile::Series(vec![1.0, 4.0, 2.0]).max(), 4.0);
        assert!(Profile::Scalar(0.0).is_zero());
        assert!(!Profile::Series(vec![0.0, 0.1]).is_zero());
        assert_eq!(Profile::Scalar(3.0).series_len(), None);
    }

    #[test]
    fn untagged_profile_deserializes_from_number_or_array() {
        let scalar: Profile = serde_json::from_str("2.5").expect("scalar parses");
        assert_eq!(scalar, Profile::Scalar(2.5));
        let series: Profile = serde_json::from_str("[1.0, 2.0]").expect("series parses");
        assert_eq!(series, Profile::Series(vec![1.0, 2.0]));
    }

    #[test]
    fn max_duration_of_empty_set_is_zero() {
        let mut inputs = ErpInputs::with_load(vec![1.0; 8760]);
        inputs.outage_durations.clear();
        assert_eq!(inputs.max_duration(), 0);
    }
}
