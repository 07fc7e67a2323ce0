//! Input validation and normalization, run once before any sampling.

use crate::error::ErpError;

use super::calendar::{HOURS_PER_YEAR, SUPPORTED_STEPS_PER_HOUR, TimeIndex};
use super::inputs::{ErpInputs, Profile};

/// Checks `inputs` and returns a normalized copy.
///
/// Normalization sorts and de-duplicates `outage_durations` and fills an empty
/// starting SOC series with zeros when the battery has no energy capacity.
///
/// # Errors
///
/// `InvalidInput` naming the first offending field, or `NumericDegeneracy` for
/// zero trials or a zero-length outage.
pub fn validate(inputs: &ErpInputs) -> Result<ErpInputs, ErpError> {
    let mut out = inputs.clone();
    let n = out.load_series_kw.len();

    if TimeIndex::for_series_len(n).is_none() {
        return Err(ErpError::invalid(
            "load_series_kw",
            format!(
                "length {n} is not {HOURS_PER_YEAR} x steps_per_hour for steps_per_hour in {SUPPORTED_STEPS_PER_HOUR:?}"
            ),
        ));
    }
    check_series("load_series_kw", &out.load_series_kw)?;

    check_profile("pv.production_kw", &out.pv.production_kw, n)?;
    check_probability("pv.operational_availability", out.pv.operational_availability)?;

    let bat = &mut out.battery;
    check_profile("battery.power_kw", &bat.power_kw, n)?;
    check_profile("battery.energy_kwh", &bat.energy_kwh, n)?;
    check_probability("battery.operational_availability", bat.operational_availability)?;
    check_probability("battery.minimum_soc_fraction", bat.minimum_soc_fraction)?;
    if !(bat.discharge_efficiency > 0.0 && bat.discharge_efficiency <= 1.0) {
        return Err(ErpError::invalid(
            "battery.discharge_efficiency",
            "must be in (0, 1]",
        ));
    }
    if bat.starting_soc_series_fraction.is_empty() && bat.energy_kwh.is_zero() {
        bat.starting_soc_series_fraction = vec![0.0; n];
    }
    if bat.starting_soc_series_fraction.len() != n {
        return Err(ErpError::invalid(
            "battery.starting_soc_series_fraction",
            format!(
                "length {} does not match load_series_kw length {n}",
                bat.starting_soc_series_fraction.len()
            ),
        ));
    }
    if let Some((i, v)) = bat
        .starting_soc_series_fraction
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        return Err(ErpError::invalid(
            "battery.starting_soc_series_fraction",
            format!("value {v} at index {i} is outside [0, 1]"),
        ));
    }

    let g = &out.generator;
    check_profile("generator.nameplate_kw", &g.nameplate_kw, n)?;
    if g.num_generators == 0 {
        return Err(ErpError::invalid("generator.num_generators", "must be >= 1"));
    }
    check_probability("generator.operational_availability", g.operational_availability)?;
    check_probability("generator.failure_to_start", g.failure_to_start)?;
    check_probability("generator.failure_to_run", g.failure_to_run)?;
    check_probability("generator.min_turndown_fraction", g.min_turndown_fraction)?;
    // Infinity is allowed for fuel and means an unlimited tank.
    if g.fuel_avail_gal.is_nan() || g.fuel_avail_gal < 0.0 {
        return Err(ErpError::invalid("generator.fuel_avail_gal", "must be >= 0"));
    }
    check_rate("generator.fuel_slope_gal_per_kwh", g.fuel_slope_gal_per_kwh)?;
    check_rate(
        "generator.fuel_intercept_gal_per_hr_per_kw",
        g.fuel_intercept_gal_per_hr_per_kw,
    )?;

    if out.outage_durations.is_empty() {
        return Err(ErpError::invalid("outage_durations", "must not be empty"));
    }
    if out.outage_durations.contains(&0) {
        return Err(ErpError::degenerate(
            "outage_durations",
            "zero-length outage requested",
        ));
    }
    if let Some(d) = out.outage_durations.iter().find(|&&d| d > n) {
        return Err(ErpError::invalid(
            "outage_durations",
            format!("duration {d} exceeds series length {n}"),
        ));
    }
    out.outage_durations.sort_unstable();
    out.outage_durations.dedup();

    if out.num_trials == 0 {
        return Err(ErpError::degenerate("num_trials", "at least one trial is required"));
    }
    check_rate("value_of_lost_load_per_kwh", out.value_of_lost_load_per_kwh)?;

    Ok(out)
}

fn check_probability(field: &str, p: f64) -> Result<(), ErpError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ErpError::invalid(field, format!("{p} is outside [0, 1]")))
    }
}

fn check_rate(field: &str, v: f64) -> Result<(), ErpError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ErpError::invalid(field, format!("{v} must be finite and >= 0")))
    }
}

fn check_series(field: &str, values: &[f64]) -> Result<(), ErpError> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        Some((i, v)) => Err(ErpError::invalid(
            field,
            format!("value {v} at index {i} must be finite and >= 0"),
        )),
        None => Ok(()),
    }
}

fn check_profile(field: &str, profile: &Profile, n: usize) -> Result<(), ErpError> {
    if let Some(len) = profile.series_len() {
        if len != n {
            return Err(ErpError::invalid(
                field,
                format!("length {len} does not match load_series_kw length {n}"),
            ));
        }
    }
    match profile {
        Profile::Scalar(v) => check_series(field, std::slice::from_ref(v)),
        Profile::Series(s) => check_series(field, s),
    }
}
