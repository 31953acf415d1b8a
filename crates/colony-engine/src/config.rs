//! Simulation configuration, controller knobs, and validation errors.
//!
//! [`SimConfig`] holds the global simulation parameters that parameter
//! files and batch sweeps address by name. [`ControllerConfig`] holds the
//! runtime knobs of one [`SimulationController`](crate::SimulationController)
//! that are never written from scripts.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::event::ControllerEvent;
use crate::params::{normalize_name, ParamError, ParamKind, ParamValue, ParameterStore};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SimConfig::validate()`] or while starting a run.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `time_step` is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// `slideshow_rate` is zero while slideshows are enabled.
    InvalidSlideshowRate,
    /// `dilution_factor` is outside `[0, 1]`.
    InvalidDilutionFactor {
        /// The invalid value.
        value: f64,
    },
    /// `dilution_time` is not finite and positive while dilution is on.
    InvalidDilutionTime {
        /// The invalid value.
        value: f64,
    },
    /// `undo_depth` is zero.
    UndoDepthZero,
    /// `poll_interval` is zero.
    PollIntervalZero,
    /// The worker thread could not be spawned.
    ThreadSpawnFailed {
        /// The OS error, rendered.
        reason: String,
    },
    /// The simulation could not be recovered from the worker thread
    /// (the worker panicked).
    WorkerPanicked,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeStep { value } => {
                write!(f, "time_step must be finite and positive, got {value}")
            }
            Self::InvalidSlideshowRate => write!(f, "slideshow_rate must be at least 1"),
            Self::InvalidDilutionFactor { value } => {
                write!(f, "dilution_factor must be in [0, 1], got {value}")
            }
            Self::InvalidDilutionTime { value } => {
                write!(f, "dilution_time must be finite and positive, got {value}")
            }
            Self::UndoDepthZero => write!(f, "undo_depth must be at least 1"),
            Self::PollIntervalZero => write!(f, "poll_interval must be non-zero"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::WorkerPanicked => {
                write!(f, "simulation could not be recovered from worker thread")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimConfig ──────────────────────────────────────────────────────

/// Global simulation parameters.
///
/// Each field is registered under the name given in its doc comment.
/// Names are case-insensitive.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// `maxcycles`: stop after this many cycles. `None` (written as -1)
    /// runs until cancelled or the world empties. Default: 1000.
    pub max_cycles: Option<u64>,
    /// `timestep`: simulated hours per cycle. Default: 0.1.
    pub time_step: f64,
    /// `pauseonstep`: pause after every completed cycle. Default: false.
    pub pause_on_step: bool,
    /// `toroidalworld`: wrap coordinates on every axis. Default: false.
    pub toroidal: bool,
    /// `slideshow`: emit periodic snapshot notifications. Default: false.
    pub slideshow: bool,
    /// `slideshowrate`: cycles between snapshot notifications. Default: 1.
    pub slideshow_rate: u64,
    /// `batchdilution`: periodically dilute cell biomass. Default: false.
    pub batch_dilution: bool,
    /// `dilfactor`: multiplier applied on each dilution. Default: 0.01.
    pub dilution_factor: f64,
    /// `diltime`: simulated hours between dilutions. Default: 24.
    pub dilution_time: f64,
    /// `randomseed`: seed for the grid's random stream. Default: 0.
    pub seed: u64,
    /// `undodepth`: snapshots retained by the undo history. Default: 2.
    pub undo_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_cycles: Some(1000),
            time_step: 0.1,
            pause_on_step: false,
            toroidal: false,
            slideshow: false,
            slideshow_rate: 1,
            batch_dilution: false,
            dilution_factor: 0.01,
            dilution_time: 24.0,
            seed: 0,
            undo_depth: 2,
        }
    }
}

/// Registered names and kinds, in declaration order.
const SIM_PARAMS: &[(&str, ParamKind)] = &[
    ("maxcycles", ParamKind::Int),
    ("timestep", ParamKind::Float),
    ("pauseonstep", ParamKind::Bool),
    ("toroidalworld", ParamKind::Bool),
    ("slideshow", ParamKind::Bool),
    ("slideshowrate", ParamKind::Int),
    ("batchdilution", ParamKind::Bool),
    ("dilfactor", ParamKind::Float),
    ("diltime", ParamKind::Float),
    ("randomseed", ParamKind::Int),
    ("undodepth", ParamKind::Int),
];

impl SimConfig {
    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step,
            });
        }
        if self.slideshow && self.slideshow_rate == 0 {
            return Err(ConfigError::InvalidSlideshowRate);
        }
        if !(0.0..=1.0).contains(&self.dilution_factor) {
            return Err(ConfigError::InvalidDilutionFactor {
                value: self.dilution_factor,
            });
        }
        if self.batch_dilution && (!self.dilution_time.is_finite() || self.dilution_time <= 0.0) {
            return Err(ConfigError::InvalidDilutionTime {
                value: self.dilution_time,
            });
        }
        if self.undo_depth == 0 {
            return Err(ConfigError::UndoDepthZero);
        }
        Ok(())
    }

    /// Cycles between dilutions, or `None` when dilution is off.
    ///
    /// The interval is `dilution_time / time_step` rounded to the nearest
    /// cycle, and never less than one.
    pub fn dilution_interval(&self) -> Option<u64> {
        if !self.batch_dilution {
            return None;
        }
        let cycles = (self.dilution_time / self.time_step).round();
        Some(if cycles.is_finite() && cycles >= 1.0 {
            cycles as u64
        } else {
            1
        })
    }

    /// Cycles between snapshot notifications, or `None` when off.
    pub fn slideshow_interval(&self) -> Option<u64> {
        (self.slideshow && self.slideshow_rate > 0).then_some(self.slideshow_rate)
    }

    /// Whether `cycle` is past the configured limit.
    pub fn exceeds_max_cycles(&self, cycle: u64) -> bool {
        self.max_cycles.is_some_and(|max| cycle > max)
    }
}

fn out_of_range(name: &str, reason: &str) -> ParamError {
    ParamError::OutOfRange {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn mismatch(name: &str, expected: ParamKind, value: &ParamValue) -> ParamError {
    ParamError::TypeMismatch {
        name: name.to_string(),
        expected,
        raw: value.to_string(),
    }
}

impl ParameterStore for SimConfig {
    fn registry_name(&self) -> &str {
        "global"
    }

    fn names(&self) -> Vec<String> {
        SIM_PARAMS.iter().map(|(n, _)| (*n).to_string()).collect()
    }

    fn kind_of(&self, name: &str) -> Option<ParamKind> {
        let key = normalize_name(name);
        SIM_PARAMS
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, kind)| *kind)
    }

    fn get_param(&self, name: &str) -> Option<ParamValue> {
        let value = match normalize_name(name).as_str() {
            "maxcycles" => ParamValue::Int(self.max_cycles.map_or(-1, |m| m as i64)),
            "timestep" => ParamValue::Float(self.time_step),
            "pauseonstep" => ParamValue::Bool(self.pause_on_step),
            "toroidalworld" => ParamValue::Bool(self.toroidal),
            "slideshow" => ParamValue::Bool(self.slideshow),
            "slideshowrate" => ParamValue::Int(self.slideshow_rate as i64),
            "batchdilution" => ParamValue::Bool(self.batch_dilution),
            "dilfactor" => ParamValue::Float(self.dilution_factor),
            "diltime" => ParamValue::Float(self.dilution_time),
            "randomseed" => ParamValue::Int(self.seed as i64),
            "undodepth" => ParamValue::Int(self.undo_depth as i64),
            _ => return None,
        };
        Some(value)
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        self.check_param(name, &value)?;
        let key = normalize_name(name);
        match (key.as_str(), value) {
            ("maxcycles", ParamValue::Int(v)) => {
                self.max_cycles = (v >= 0).then_some(v as u64);
            }
            ("timestep", ParamValue::Float(v)) => self.time_step = v,
            ("pauseonstep", ParamValue::Bool(v)) => self.pause_on_step = v,
            ("toroidalworld", ParamValue::Bool(v)) => self.toroidal = v,
            ("slideshow", ParamValue::Bool(v)) => self.slideshow = v,
            ("slideshowrate", ParamValue::Int(v)) => self.slideshow_rate = v as u64,
            ("batchdilution", ParamValue::Bool(v)) => self.batch_dilution = v,
            ("dilfactor", ParamValue::Float(v)) => self.dilution_factor = v,
            ("diltime", ParamValue::Float(v)) => self.dilution_time = v,
            ("randomseed", ParamValue::Int(v)) => self.seed = v as u64,
            ("undodepth", ParamValue::Int(v)) => self.undo_depth = v as usize,
            (_, value) => {
                let kind = value.kind();
                return Err(mismatch(&key, kind, &value));
            }
        }
        Ok(())
    }

    fn check_param(&self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let key = normalize_name(name);
        let kind = self
            .kind_of(&key)
            .ok_or_else(|| ParamError::Unknown { name: key.clone() })?;
        if value.kind() != kind {
            return Err(mismatch(&key, kind, value));
        }
        let reason = match (key.as_str(), value) {
            ("maxcycles", ParamValue::Int(v)) if *v < -1 => "must be -1 or non-negative",
            ("timestep" | "diltime", ParamValue::Float(v)) if *v <= 0.0 => "must be positive",
            ("slideshowrate" | "undodepth", ParamValue::Int(v)) if *v < 1 => "must be at least 1",
            ("dilfactor", ParamValue::Float(v)) if !(0.0..=1.0).contains(v) => "must be in [0, 1]",
            ("randomseed", ParamValue::Int(v)) if *v < 0 => "must be non-negative",
            _ => return Ok(()),
        };
        Err(out_of_range(&key, reason))
    }
}

// ── ControllerConfig ───────────────────────────────────────────────

/// How a paused worker waits for release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PauseMode {
    /// Block on a condition variable until resumed or cancelled.
    #[default]
    Supervised,
    /// Sleep in `poll_interval` slices, re-checking the pause and finish
    /// flags each time. Used when nobody is watching the run.
    Unattended,
}

/// Runtime knobs for one [`SimulationController`](crate::SimulationController).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Paused-worker wait strategy. Default: supervised.
    pub pause_mode: PauseMode,
    /// Interval used by unattended pause polling and by
    /// [`wait_until_finished`](crate::SimulationController::wait_until_finished).
    /// Default: 10 ms.
    pub poll_interval: Duration,
    /// Optional sink for [`ControllerEvent`]s. Sends never block the
    /// worker; events are dropped if the receiver is gone.
    pub events: Option<Sender<ControllerEvent>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pause_mode: PauseMode::Supervised,
            poll_interval: Duration::from_millis(10),
            events: None,
        }
    }
}

impl ControllerConfig {
    /// Unattended polling with no event sink, as used for batch runs.
    pub fn unattended() -> Self {
        Self {
            pause_mode: PauseMode::Unattended,
            ..Self::default()
        }
    }

    /// Attach an event sink (builder style).
    pub fn with_events(mut self, sink: Sender<ControllerEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Validate the knobs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::PollIntervalZero);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::apply_param_text;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_time_step() {
        let cfg = SimConfig {
            time_step: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidTimeStep { value: 0.0 })
        );
        let cfg = SimConfig {
            time_step: f64::NAN,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTimeStep { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_dilution() {
        let cfg = SimConfig {
            dilution_factor: 1.5,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDilutionFactor { .. })
        ));
        let cfg = SimConfig {
            batch_dilution: true,
            dilution_time: -1.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDilutionTime { .. })
        ));
    }

    #[test]
    fn dilution_interval_rounds_and_floors_at_one() {
        let mut cfg = SimConfig {
            batch_dilution: true,
            time_step: 0.1,
            dilution_time: 24.0,
            ..SimConfig::default()
        };
        assert_eq!(cfg.dilution_interval(), Some(240));
        cfg.dilution_time = 0.01;
        assert_eq!(cfg.dilution_interval(), Some(1));
        cfg.batch_dilution = false;
        assert_eq!(cfg.dilution_interval(), None);
    }

    #[test]
    fn max_cycles_minus_one_is_unlimited() {
        let mut cfg = SimConfig::default();
        cfg.set_param_str("MaxCycles", "-1").unwrap();
        assert_eq!(cfg.max_cycles, None);
        assert!(!cfg.exceeds_max_cycles(u64::MAX));
        cfg.set_param_str("maxcycles", "3").unwrap();
        assert!(!cfg.exceeds_max_cycles(3));
        assert!(cfg.exceeds_max_cycles(4));
        assert_eq!(cfg.get_param("maxcycles"), Some(ParamValue::Int(3)));
    }

    #[test]
    fn setters_enforce_domains() {
        let mut cfg = SimConfig::default();
        assert!(matches!(
            cfg.set_param_str("maxcycles", "-5"),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            cfg.set_param_str("dilfactor", "2"),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            cfg.set_param_str("timestep", "true"),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert_eq!(cfg, SimConfig::default());
    }

    #[test]
    fn check_param_matches_setter_domains() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.check_param("dilFactor", &ParamValue::Float(1.0)), Ok(()));
        assert!(matches!(
            cfg.check_param("dilfactor", &ParamValue::Float(1.5)),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            cfg.check_param("undodepth", &ParamValue::Int(0)),
            Err(ParamError::OutOfRange { .. })
        ));
        assert_eq!(cfg.check_param("maxcycles", &ParamValue::Int(-1)), Ok(()));
        assert!(matches!(
            cfg.check_param("randomseed", &ParamValue::Bool(true)),
            Err(ParamError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn every_registered_name_round_trips_through_get() {
        let cfg = SimConfig::default();
        for name in cfg.names() {
            let value = cfg.get_param(&name).unwrap();
            assert_eq!(Some(value.kind()), cfg.kind_of(&name), "{name}");
        }
    }

    #[test]
    fn parameter_file_is_all_or_nothing() {
        let mut cfg = SimConfig::default();
        let text = "timestep = 0.5\nslideshow = true\ndilfactor = 3.0\n";
        assert!(apply_param_text(text, &mut cfg).is_err());
        assert_eq!(cfg, SimConfig::default());

        let text = "timestep = 0.5\nslideshow = true\nslideshowrate = 5\n";
        assert_eq!(apply_param_text(text, &mut cfg), Ok(3));
        assert_eq!(cfg.slideshow_interval(), Some(5));
        assert_eq!(cfg.time_step, 0.5);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cfg = ControllerConfig {
            poll_interval: Duration::ZERO,
            ..ControllerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::PollIntervalZero));
    }
}
