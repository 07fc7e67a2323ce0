//! Mapping of step indices to hour of day and month over a non-leap year.

/// Steps in a non-leap year at hourly resolution.
pub const HOURS_PER_YEAR: usize = 8760;

/// Supported sub-hourly resolutions.
pub const SUPPORTED_STEPS_PER_HOUR: &[usize] = &[1, 2, 4];

const DAYS_IN_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Maps a step index of a one-year series to calendar bins.
///
/// The series is taken to start at local-standard-time midnight on 1 January
/// of a non-leap year. There is no DST shift.
///
/// # Examples
///
/// ```
/// use erp_sim::sim::calendar::TimeIndex;
///
/// let idx = TimeIndex::new(1);
/// assert_eq!(idx.hour_of_day(25), 1);
/// assert_eq!(idx.month(31 * 24), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIndex {
    steps_per_hour: usize,
}

impl TimeIndex {
    /// # Panics
    ///
    /// Panics if `steps_per_hour` is zero.
    pub fn new(steps_per_hour: usize) -> Self {
        assert!(steps_per_hour > 0, "steps_per_hour must be > 0");
        Self { steps_per_hour }
    }

    /// Infers the resolution from a series length, if it is a supported one.
    pub fn for_series_len(len: usize) -> Option<Self> {
        if len == 0 || len % HOURS_PER_YEAR != 0 {
            return None;
        }
        let sph = len / HOURS_PER_YEAR;
        SUPPORTED_STEPS_PER_HOUR
            .contains(&sph)
            .then(|| Self::new(sph))
    }

    pub fn steps_per_hour(&self) -> usize {
        self.steps_per_hour
    }

    /// Duration of one step in hours.
    pub fn dt_hours(&self) -> f64 {
        1.0 / self.steps_per_hour as f64
    }

    /// Hour of day in `0..24`.
    pub fn hour_of_day(&self, step: usize) -> usize {
        (step / self.steps_per_hour) % 24
    }

    /// Calendar month in `1..=12`.
    pub fn month(&self, step: usize) -> usize {
        let mut day = (step / self.steps_per_hour / 24) % 365;
        for (i, days) in DAYS_IN_MONTH.iter().enumerate() {
            if day < *days {
                return i + 1;
            }
            day -= days;
        }
        12
    }
}
