//! Synthetic one-year profiles for presets and quick what-if runs.

use std::f64::consts::PI;

use crate::sim::calendar::{HOURS_PER_YEAR, TimeIndex};

/// Fraction of peak output at a given hour of day for a half-cosine daylight
/// shape: zero outside `[sunrise_hour, sunset_hour)`, one at solar noon.
pub fn daylight_frac(hour: f64, sunrise_hour: f64, sunset_hour: f64) -> f64 {
    if sunset_hour <= sunrise_hour || hour < sunrise_hour || hour >= sunset_hour {
        return 0.0;
    }
    let x = (hour - sunrise_hour) / (sunset_hour - sunrise_hour);
    (PI * x).sin().max(0.0)
}

fn hour_of_day_f64(step: usize, time: TimeIndex) -> f64 {
    let sph = time.steps_per_hour();
    (step % (24 * sph)) as f64 / sph as f64
}

/// Clear-sky PV production (kW) for every step of the year.
///
/// # Examples
///
/// ```
/// use erp_sim::profiles::half_cosine_solar;
/// use erp_sim::sim::calendar::TimeIndex;
///
/// let pv = half_cosine_solar(50.0, 6.0, 18.0, TimeIndex::new(1));
/// assert_eq!(pv.len(), 8760);
/// assert_eq!(pv[0], 0.0);
/// assert!((pv[12] - 50.0).abs() < 1e-9);
/// ```
pub fn half_cosine_solar(
    peak_kw: f64,
    sunrise_hour: f64,
    sunset_hour: f64,
    time: TimeIndex,
) -> Vec<f64> {
    let peak_kw = peak_kw.max(0.0);
    (0..HOURS_PER_YEAR * time.steps_per_hour())
        .map(|t| peak_kw * daylight_frac(hour_of_day_f64(t, time), sunrise_hour, sunset_hour))
        .collect()
}

/// Daily sinusoidal critical load (kW) for every step of the year, never negative.
///
/// `phase_rad = 0` puts the midpoint of the rising edge at midnight.
pub fn sinusoidal_load(base_kw: f64, amp_kw: f64, phase_rad: f64, time: TimeIndex) -> Vec<f64> {
    (0..HOURS_PER_YEAR * time.steps_per_hour())
        .map(|t| {
            let day_pos = hour_of_day_f64(t, time) / 24.0;
            let angle = 2.0 * PI * day_pos + phase_rad;
            (base_kw + amp_kw * angle.sin()).max(0.0)
        })
        .collect()
}
