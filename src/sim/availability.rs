//! Monte Carlo availability sampling.
//!
//! This is the only place randomness enters an ERP run. Every (trial, stream)
//! pair gets its own `StdRng` seeded by [`derive_seed`], so the masks for a
//! trial do not depend on which worker samples them or in what order.

use rand::distr::{Bernoulli, Distribution};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::error::ErpError;

use super::inputs::ErpInputs;

/// Independent random streams drawn for each trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Pv,
    Battery,
    /// Maintenance availability of generator unit `n`.
    GeneratorAvailability(usize),
    /// Start success of generator unit `n` for an outage beginning at each step.
    GeneratorStart(usize),
    /// Per-step run-failure draws for generator unit `n`.
    GeneratorRun(usize),
}

impl Stream {
    fn tag(self) -> u64 {
        match self {
            Self::Pv => 1 << 32,
            Self::Battery => 2 << 32,
            Self::GeneratorAvailability(n) => (3 << 32) | n as u64,
            Self::GeneratorStart(n) => (4 << 32) | n as u64,
            Self::GeneratorRun(n) => (5 << 32) | n as u64,
        }
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for one (trial, stream) pair.
///
/// Defined as `splitmix64(splitmix64(splitmix64(random_seed) ^ trial) ^ stream_tag)`
/// where the stream tag packs the asset kind in the high 32 bits and the
/// generator unit index in the low 32 bits.
pub fn derive_seed(random_seed: u64, trial: usize, stream: Stream) -> u64 {
    let z = splitmix64(random_seed);
    let z = splitmix64(z ^ trial as u64);
    splitmix64(z ^ stream.tag())
}

/// Up/down state of one asset for every step of the year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityMask {
    AlwaysUp,
    AlwaysDown,
    Steps(Vec<bool>),
}

impl AvailabilityMask {
    /// Draws an independent Bernoulli(`p_up`) state for each of `len` steps.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `p_up` is not a probability.
    pub fn sample(p_up: f64, len: usize, seed: u64, field: &str) -> Result<Self, ErpError> {
        if p_up >= 1.0 {
            return Ok(Self::AlwaysUp);
        }
        if p_up <= 0.0 {
            return Ok(Self::AlwaysDown);
        }
        let dist =
            Bernoulli::new(p_up).map_err(|e| ErpError::invalid(field, e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self::Steps(dist.sample_iter(&mut rng).take(len).collect()))
    }

    pub fn is_up(&self, step: usize) -> bool {
        match self {
            Self::AlwaysUp => true,
            Self::AlwaysDown => false,
            Self::Steps(s) => s[step],
        }
    }
}

/// Masks for one generator unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorMasks {
    /// Not in maintenance at this step.
    pub available: AvailabilityMask,
    /// Starts successfully if an outage begins at this step.
    pub starts: AvailabilityMask,
    /// Does not trip if running at this step.
    pub runs: AvailabilityMask,
}

/// Everything one trial needs to replay any outage. Read-only once sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialMasks {
    pub trial: usize,
    pub pv: AvailabilityMask,
    pub battery: AvailabilityMask,
    pub generators: Vec<GeneratorMasks>,
}

/// Samples the masks for a single trial.
///
/// Battery starting SOC is not sampled; it is read from the input series.
pub fn sample_trial(inputs: &ErpInputs, trial: usize) -> Result<TrialMasks, ErpError> {
    let n = inputs.n_steps();
    let seed = inputs.random_seed;
    let g = &inputs.generator;

    let generators = (0..g.num_generators)
        .map(|unit| -> Result<GeneratorMasks, ErpError> {
            Ok(GeneratorMasks {
                available: AvailabilityMask::sample(
                    g.operational_availability,
                    n,
                    derive_seed(seed, trial, Stream::GeneratorAvailability(unit)),
                    "generator.operational_availability",
                )?,
                starts: AvailabilityMask::sample(
                    1.0 - g.failure_to_start,
                    n,
                    derive_seed(seed, trial, Stream::GeneratorStart(unit)),
                    "generator.failure_to_start",
                )?,
                runs: AvailabilityMask::sample(
                    1.0 - g.failure_to_run,
                    n,
                    derive_seed(seed, trial, Stream::GeneratorRun(unit)),
                    "generator.failure_to_run",
                )?,
            })
        })
        .collect::<Result<Vec<_>, ErpError>>()?;

    Ok(TrialMasks {
        trial,
        pv: AvailabilityMask::sample(
            inputs.pv.operational_availability,
            n,
            derive_seed(seed, trial, Stream::Pv),
            "pv.operational_availability",
        )?,
        battery: AvailabilityMask::sample(
            inputs.battery.operational_availability,
            n,
            derive_seed(seed, trial, Stream::Battery),
            "battery.operational_availability",
        )?,
        generators,
    })
}

/// Samples all `num_trials` trials in parallel, returned in trial order.
pub fn sample_trials(inputs: &ErpInputs) -> Result<Vec<TrialMasks>, ErpError> {
    (0..inputs.num_trials)
        .into_par_iter()
        .map(|trial| sample_trial(inputs, trial))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(p: f64) -> ErpInputs {
        let mut inputs = ErpInputs::with_load(vec![1.0; 8760]);
        inputs.generator.operational_availability = p;
        inputs.pv.operational_availability = p;
        inputs.num_trials = 3;
        inputs
    }

    #[test]
    fn seeds_differ_across_trials_and_streams() {
        let a = derive_seed(7, 0, Stream::Pv);
        assert_ne!(a, derive_seed(7, 1, Stream::Pv));
        assert_ne!(a, derive_seed(7, 0, Stream::Battery));
        assert_ne!(
            derive_seed(7, 0, Stream::GeneratorAvailability(0)),
            derive_seed(7, 0, Stream::GeneratorAvailability(1))
        );
        assert_eq!(a, derive_seed(7, 0, Stream::Pv));
    }

    #[test]
    fn certain_probabilities_shortcut() {
        assert_eq!(
            AvailabilityMask::sample(1.0, 10, 0, "x").ok(),
            Some(AvailabilityMask::AlwaysUp)
        );
        assert_eq!(
            AvailabilityMask::sample(0.0, 10, 0, "x").ok(),
            Some(AvailabilityMask::AlwaysDown)
        );
    }

    #[test]
    fn sampling_is_reproducible() {
        let a = sample_trials(&inputs(0.5)).expect("sampling succeeds");
        let b = sample_trials(&inputs(0.5)).expect("sampling succeeds");
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_ne!(a[0].pv, a[1].pv);
    }

    #[test]
    fn single_trial_matches_batch_sampling() {
        let inputs = inputs(0.5);
        let all = sample_trials(&inputs).expect("sampling succeeds");
        let second = sample_trial(&inputs, 1).expect("sampling succeeds");
        assert_eq!(all[1], second);
    }

    #[test]
    fn empirical_rate_tracks_probability() {
        let mask = AvailabilityMask::sample(0.9, 8760, 99, "x").expect("sampling succeeds");
        let up = (0..8760).filter(|&t| mask.is_up(t)).count() as f64 / 8760.0;
        assert!((up - 0.9).abs() < 0.02, "observed availability {up}");
    }
}
