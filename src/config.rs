//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::ErpError;
use crate::io::series::read_series;
use crate::profiles::{half_cosine_solar, sinusoidal_load};
use crate::sim::calendar::{HOURS_PER_YEAR, SUPPORTED_STEPS_PER_HOUR, TimeIndex};
use crate::sim::driver::RunOptions;
use crate::sim::inputs::{BatterySpec, ErpInputs, GeneratorSpec, Profile, PvSpec};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run size, resolution and seeding.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Critical load served during an outage.
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub pv: PvConfig,
    #[serde(default)]
    pub battery: BatteryConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub economics: EconomicsConfig,
    /// Directory CSV references are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Run size, resolution and seeding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Time steps per hour: 1, 2 or 4.
    pub steps_per_hour: usize,
    /// Outage lengths to evaluate, in time steps.
    pub outage_durations: Vec<usize>,
    /// Monte Carlo trials per outage start.
    pub num_trials: usize,
    /// Master random seed.
    pub seed: u64,
    /// Evaluate every n-th start step.
    pub start_stride: usize,
    /// Start steps per cancellation batch.
    pub batch_size: usize,
    /// Worker threads (0 = all cores).
    pub threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_hour: 1,
            outage_durations: vec![1, 2, 4, 8, 12, 24, 48, 72],
            num_trials: 10,
            seed: 42,
            start_stride: 1,
            batch_size: 168,
            threads: 0,
        }
    }
}

/// A time-varying quantity in a scenario file.
///
/// ```toml
/// kw = 10.0
/// kw = { csv = "load.csv", column = "kw" }
/// kw = { solar_peak_kw = 50.0, sunrise_hour = 6.0, sunset_hour = 18.0 }
/// kw = { base_kw = 20.0, amp_kw = 8.0, phase_rad = 1.2 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProfileConfig {
    Scalar(f64),
    Csv {
        csv: PathBuf,
        #[serde(default)]
        column: Option<String>,
    },
    Solar {
        solar_peak_kw: f64,
        sunrise_hour: f64,
        sunset_hour: f64,
    },
    Daily {
        base_kw: f64,
        amp_kw: f64,
        phase_rad: f64,
    },
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl ProfileConfig {
    /// Resolves into an engine profile; scalars stay scalars.
    fn resolve(&self, time: TimeIndex, base_dir: Option<&Path>) -> Result<Profile, ErpError> {
        Ok(match self {
            Self::Scalar(v) => Profile::Scalar(*v),
            Self::Csv { csv, column } => {
                let path = match base_dir {
                    Some(dir) if csv.is_relative() => dir.join(csv),
                    _ => csv.clone(),
                };
                Profile::Series(read_series(&path, column.as_deref())?)
            }
            Self::Solar {
                solar_peak_kw,
                sunrise_hour,
                sunset_hour,
            } => Profile::Series(half_cosine_solar(
                *solar_peak_kw,
                *sunrise_hour,
                *sunset_hour,
                time,
            )),
            Self::Daily {
                base_kw,
                amp_kw,
                phase_rad,
            } => Profile::Series(sinusoidal_load(*base_kw, *amp_kw, *phase_rad, time)),
        })
    }

    /// Resolves into a full-year series, broadcasting scalars.
    fn resolve_series(&self, time: TimeIndex, base_dir: Option<&Path>) -> Result<Vec<f64>, ErpError> {
        let n = HOURS_PER_YEAR * time.steps_per_hour();
        Ok(match self.resolve(time, base_dir)? {
            Profile::Scalar(v) => vec![v; n],
            Profile::Series(values) => values,
        })
    }
}

/// Critical load served during an outage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Critical load (kW).
    pub critical_kw: ProfileConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            critical_kw: ProfileConfig::Daily {
                base_kw: 20.0,
                amp_kw: 8.0,
                phase_rad: 1.2,
            },
        }
    }
}

/// Solar PV parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// AC production (kW).
    pub production_kw: ProfileConfig,
    /// Per-step probability the array is up (0.0-1.0).
    pub operational_availability: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            production_kw: ProfileConfig::Scalar(0.0),
            operational_availability: 0.98,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Maximum discharge power (kW).
    pub power_kw: ProfileConfig,
    /// Usable energy capacity (kWh).
    pub energy_kwh: ProfileConfig,
    /// Per-step probability the battery is up (0.0-1.0).
    pub operational_availability: f64,
    /// Reserve the battery never discharges below (0.0-1.0).
    pub minimum_soc_fraction: f64,
    /// State of charge when an outage begins at each step (0.0-1.0).
    pub starting_soc_fraction: ProfileConfig,
    /// Discharge efficiency (0.0-1.0].
    pub discharge_efficiency: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            power_kw: ProfileConfig::Scalar(0.0),
            energy_kwh: ProfileConfig::Scalar(0.0),
            operational_availability: 0.97,
            minimum_soc_fraction: 0.0,
            starting_soc_fraction: ProfileConfig::Scalar(1.0),
            discharge_efficiency: 0.96,
        }
    }
}

/// Backup generator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Nameplate of one unit (kW).
    pub nameplate_kw: ProfileConfig,
    /// Identical units sharing one fuel tank.
    pub num_generators: usize,
    /// Per-step probability a unit is not down for maintenance (0.0-1.0).
    pub operational_availability: f64,
    /// Probability a unit fails to start when an outage begins.
    pub failure_to_start: f64,
    /// Per-step probability a running unit trips.
    pub failure_to_run: f64,
    /// Fuel on hand (gal); `inf` for unlimited.
    pub fuel_avail_gal: f64,
    /// Fuel burn per kWh produced (gal/kWh).
    pub fuel_slope_gal_per_kwh: f64,
    /// No-load fuel burn per kW of running nameplate (gal/h/kW).
    pub fuel_intercept_gal_per_hr_per_kw: f64,
    /// Minimum output of a running unit as a fraction of nameplate.
    pub min_turndown_fraction: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            nameplate_kw: ProfileConfig::Scalar(0.0),
            num_generators: 1,
            operational_availability: 0.995,
            failure_to_start: 0.0066,
            failure_to_run: 0.00157,
            fuel_avail_gal: 660.0,
            fuel_slope_gal_per_kwh: 0.076,
            fuel_intercept_gal_per_hr_per_kw: 0.0,
            min_turndown_fraction: 0.0,
        }
    }
}

/// Outage cost parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomicsConfig {
    /// Value of lost load ($/kWh).
    pub value_of_lost_load_per_kwh: f64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            value_of_lost_load_per_kwh: 100.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps_per_hour"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Mixed site: daily load profile, PV, battery and a generator sized below peak.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            load: LoadConfig::default(),
            pv: PvConfig {
                production_kw: ProfileConfig::Solar {
                    solar_peak_kw: 30.0,
                    sunrise_hour: 6.0,
                    sunset_hour: 18.0,
                },
                ..PvConfig::default()
            },
            battery: BatteryConfig {
                power_kw: ProfileConfig::Scalar(15.0),
                energy_kwh: ProfileConfig::Scalar(60.0),
                minimum_soc_fraction: 0.1,
                starting_soc_fraction: ProfileConfig::Scalar(0.9),
                ..BatteryConfig::default()
            },
            generator: GeneratorConfig {
                nameplate_kw: ProfileConfig::Scalar(20.0),
                ..GeneratorConfig::default()
            },
            economics: EconomicsConfig::default(),
            base_dir: None,
        }
    }

    /// Constant 10 kW load backed only by a perfectly reliable 10 kW generator.
    pub fn generator_only() -> Self {
        Self {
            simulation: SimulationConfig {
                outage_durations: vec![1, 4, 8],
                num_trials: 1,
                ..SimulationConfig::default()
            },
            load: LoadConfig {
                critical_kw: ProfileConfig::Scalar(10.0),
            },
            pv: PvConfig::default(),
            battery: BatteryConfig::default(),
            generator: GeneratorConfig {
                nameplate_kw: ProfileConfig::Scalar(10.0),
                operational_availability: 1.0,
                failure_to_start: 0.0,
                failure_to_run: 0.0,
                fuel_avail_gal: f64::INFINITY,
                ..GeneratorConfig::default()
            },
            economics: EconomicsConfig::default(),
            base_dir: None,
        }
    }

    /// Solar plus storage with no generator; survival depends on time of day.
    pub fn solar_storage() -> Self {
        Self {
            simulation: SimulationConfig {
                outage_durations: vec![1, 4, 8, 12, 24],
                ..SimulationConfig::default()
            },
            load: LoadConfig {
                critical_kw: ProfileConfig::Daily {
                    base_kw: 12.0,
                    amp_kw: 4.0,
                    phase_rad: 1.2,
                },
            },
            pv: PvConfig {
                production_kw: ProfileConfig::Solar {
                    solar_peak_kw: 45.0,
                    sunrise_hour: 6.0,
                    sunset_hour: 18.0,
                },
                ..PvConfig::default()
            },
            battery: BatteryConfig {
                power_kw: ProfileConfig::Scalar(20.0),
                energy_kwh: ProfileConfig::Scalar(120.0),
                minimum_soc_fraction: 0.05,
                ..BatteryConfig::default()
            },
            generator: GeneratorConfig::default(),
            economics: EconomicsConfig::default(),
            base_dir: None,
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "generator_only", "solar_storage"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "generator_only" => Ok(Self::generator_only()),
            "solar_storage" => Ok(Self::solar_storage()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file. CSV references resolve against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Series contents
    /// (CSV values, lengths) are checked later by the engine.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !SUPPORTED_STEPS_PER_HOUR.contains(&s.steps_per_hour) {
            errors.push(ConfigError::new(
                "simulation.steps_per_hour",
                format!("must be one of {SUPPORTED_STEPS_PER_HOUR:?}"),
            ));
        }
        if s.outage_durations.is_empty() {
            errors.push(ConfigError::new("simulation.outage_durations", "must not be empty"));
        }
        let n = HOURS_PER_YEAR * s.steps_per_hour;
        if let Some(d) = s.outage_durations.iter().find(|&&d| d == 0 || d > n) {
            errors.push(ConfigError::new(
                "simulation.outage_durations",
                format!("{d} must be in 1..={n}"),
            ));
        }
        for (field, value) in [
            ("simulation.num_trials", s.num_trials),
            ("simulation.start_stride", s.start_stride),
            ("simulation.batch_size", s.batch_size),
            ("generator.num_generators", self.generator.num_generators),
        ] {
            if value == 0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }

        for (field, p) in [
            ("pv.operational_availability", self.pv.operational_availability),
            ("battery.operational_availability", self.battery.operational_availability),
            ("battery.minimum_soc_fraction", self.battery.minimum_soc_fraction),
            ("generator.operational_availability", self.generator.operational_availability),
            ("generator.failure_to_start", self.generator.failure_to_start),
            ("generator.failure_to_run", self.generator.failure_to_run),
            ("generator.min_turndown_fraction", self.generator.min_turndown_fraction),
        ] {
            if !(0.0..=1.0).contains(&p) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }
        let eta = self.battery.discharge_efficiency;
        if !(eta > 0.0 && eta <= 1.0) {
            errors.push(ConfigError::new(
                "battery.discharge_efficiency",
                "must be in (0.0, 1.0]",
            ));
        }

        let g = &self.generator;
        if g.fuel_avail_gal.is_nan() || g.fuel_avail_gal < 0.0 {
            errors.push(ConfigError::new("generator.fuel_avail_gal", "must be >= 0"));
        }
        for (field, v) in [
            ("generator.fuel_slope_gal_per_kwh", g.fuel_slope_gal_per_kwh),
            (
                "generator.fuel_intercept_gal_per_hr_per_kw",
                g.fuel_intercept_gal_per_hr_per_kw,
            ),
            (
                "economics.value_of_lost_load_per_kwh",
                self.economics.value_of_lost_load_per_kwh,
            ),
        ] {
            if !v.is_finite() || v < 0.0 {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }

        for (field, profile) in [
            ("load.critical_kw", &self.load.critical_kw),
            ("pv.production_kw", &self.pv.production_kw),
            ("battery.power_kw", &self.battery.power_kw),
            ("battery.energy_kwh", &self.battery.energy_kwh),
            ("battery.starting_soc_fraction", &self.battery.starting_soc_fraction),
            ("generator.nameplate_kw", &self.generator.nameplate_kw),
        ] {
            check_profile(field, profile, &mut errors);
        }
        if let ProfileConfig::Scalar(soc) = self.battery.starting_soc_fraction {
            if !(0.0..=1.0).contains(&soc) {
                errors.push(ConfigError::new(
                    "battery.starting_soc_fraction",
                    "must be in [0.0, 1.0]",
                ));
            }
        }

        errors
    }

    /// Builds engine inputs, reading CSV series and expanding synthetic profiles.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an unsupported resolution, or any error reading a CSV series.
    pub fn to_inputs(&self) -> Result<ErpInputs, ErpError> {
        let s = &self.simulation;
        if !SUPPORTED_STEPS_PER_HOUR.contains(&s.steps_per_hour) {
            return Err(ErpError::invalid(
                "simulation.steps_per_hour",
                format!("must be one of {SUPPORTED_STEPS_PER_HOUR:?}"),
            ));
        }
        let time = TimeIndex::new(s.steps_per_hour);
        let dir = self.base_dir.as_deref();

        let b = &self.battery;
        let g = &self.generator;
        Ok(ErpInputs {
            load_series_kw: self.load.critical_kw.resolve_series(time, dir)?,
            pv: PvSpec {
                production_kw: self.pv.production_kw.resolve(time, dir)?,
                operational_availability: self.pv.operational_availability,
            },
            battery: BatterySpec {
                power_kw: b.power_kw.resolve(time, dir)?,
                energy_kwh: b.energy_kwh.resolve(time, dir)?,
                operational_availability: b.operational_availability,
                minimum_soc_fraction: b.minimum_soc_fraction,
                starting_soc_series_fraction: b.starting_soc_fraction.resolve_series(time, dir)?,
                discharge_efficiency: b.discharge_efficiency,
            },
            generator: GeneratorSpec {
                nameplate_kw: g.nameplate_kw.resolve(time, dir)?,
                num_generators: g.num_generators,
                operational_availability: g.operational_availability,
                failure_to_start: g.failure_to_start,
                failure_to_run: g.failure_to_run,
                fuel_avail_gal: g.fuel_avail_gal,
                fuel_slope_gal_per_kwh: g.fuel_slope_gal_per_kwh,
                fuel_intercept_gal_per_hr_per_kw: g.fuel_intercept_gal_per_hr_per_kw,
                min_turndown_fraction: g.min_turndown_fraction,
            },
            outage_durations: s.outage_durations.clone(),
            num_trials: s.num_trials,
            random_seed: s.seed,
            value_of_lost_load_per_kwh: self.economics.value_of_lost_load_per_kwh,
        })
    }

    /// Execution options from the `[simulation]` section.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            start_stride: self.simulation.start_stride,
            batch_size: self.simulation.batch_size,
            threads: self.simulation.threads,
            cancel: None,
        }
    }
}

fn check_profile(field: &str, profile: &ProfileConfig, errors: &mut Vec<ConfigError>) {
    match profile {
        ProfileConfig::Scalar(v) if !v.is_finite() || *v < 0.0 => {
            errors.push(ConfigError::new(field, "must be finite and >= 0"));
        }
        ProfileConfig::Solar {
            solar_peak_kw,
            sunrise_hour,
            sunset_hour,
        } => {
            if solar_peak_kw.is_nan() || *solar_peak_kw < 0.0 {
                errors.push(ConfigError::new(field, "solar_peak_kw must be >= 0"));
            }
            if !(0.0..=24.0).contains(sunrise_hour)
                || !(0.0..=24.0).contains(sunset_hour)
                || sunrise_hour >= sunset_hour
            {
                errors.push(ConfigError::new(
                    field,
                    "need 0 <= sunrise_hour < sunset_hour <= 24",
                ));
            }
        }
        ProfileConfig::Daily {
            base_kw, amp_kw, ..
        } if !(base_kw.is_finite() && amp_kw.is_finite()) => {
            errors.push(ConfigError::new(field, "base_kw and amp_kw must be finite"));
        }
        _ => {}
    }
}
