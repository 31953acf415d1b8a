//! Parameter sweeps: the Cartesian product of ranged parameters, one
//! full run per combination.
//!
//! Each [`BatchParameter`] is one digit of a mixed-radix odometer whose
//! radix is the parameter's step count. Combination `n` is reached by
//! resetting every digit and incrementing the odometer `n` times, first
//! declared parameter least significant.

use std::error::Error;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use colony_core::Backup;
use tracing::info;

use crate::config::{ConfigError, ControllerConfig};
use crate::controller::SimulationController;
use crate::params::{ParamError, ParamKind, ParamValue, ParameterStore};
use crate::report::RunOutcome;
use crate::world::Simulation;

// ── BatchError ─────────────────────────────────────────────────────

/// Errors building or driving a sweep.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchError {
    /// Neither the global nor the package registry knows the name.
    UnknownParameter {
        /// The name as given.
        name: String,
    },
    /// The parameter exists but its kind cannot be swept.
    NotBatchable {
        /// The parameter name.
        name: String,
        /// Its registered kind.
        kind: ParamKind,
    },
    /// A numeric range is not `start increment end` or is empty.
    MalformedRange {
        /// The parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A combination index past the end of the sweep.
    SetOutOfRange {
        /// The requested combination.
        index: u64,
        /// Number of combinations.
        total: u64,
    },
    /// A package parameter was swept but the package has no registry.
    NoPackageParameters {
        /// The parameter name.
        name: String,
    },
    /// The backing store rejected a value.
    Param(ParamError),
    /// A run could not be started or recovered.
    Run(ConfigError),
    /// The batch list file could not be written.
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error, rendered.
        reason: String,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParameter { name } => write!(f, "unknown batch parameter '{name}'"),
            Self::NotBatchable { name, kind } => {
                write!(f, "parameter '{name}' of kind {kind} cannot be swept")
            }
            Self::MalformedRange { name, reason } => {
                write!(f, "malformed range for '{name}': {reason}")
            }
            Self::SetOutOfRange { index, total } => {
                write!(f, "parameter set {index} out of range ({total} combinations)")
            }
            Self::NoPackageParameters { name } => {
                write!(f, "package has no parameters to receive '{name}'")
            }
            Self::Param(e) => write!(f, "{e}"),
            Self::Run(e) => write!(f, "run: {e}"),
            Self::Io { path, reason } => {
                write!(f, "cannot write batch list {}: {reason}", path.display())
            }
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Param(e) => Some(e),
            Self::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamError> for BatchError {
    fn from(e: ParamError) -> Self {
        Self::Param(e)
    }
}

impl From<ConfigError> for BatchError {
    fn from(e: ConfigError) -> Self {
        Self::Run(e)
    }
}

// ── BatchSpec / BatchParameter ─────────────────────────────────────

/// One requested sweep: a parameter name and its raw range tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSpec {
    /// Parameter name as written.
    pub name: String,
    /// `start increment end` for numbers; ignored for booleans.
    pub values: Vec<String>,
}

impl BatchSpec {
    /// Build a spec from string slices.
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

/// Which registry a swept parameter lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamTarget {
    /// The global [`SimConfig`](crate::SimConfig).
    Global,
    /// The package's own registry.
    Package,
}

#[derive(Clone, Debug, PartialEq)]
enum Domain {
    Int { start: i64, increment: i64, steps: usize },
    Float { start: f64, increment: f64, steps: usize },
    Toggle,
}

/// Slack for float step counts, so `(0.2 - 0.0) / 0.1` counts 3 steps.
const STEP_EPSILON: f64 = 1e-9;

/// Round a computed float to nine digits below the increment's leading
/// digit, so `0.0 + 3 * 0.1` prints as `0.3` and `3 * 1e-13` stays
/// distinct from zero.
fn snap(v: f64, increment: f64) -> f64 {
    let digits = (9.0 - increment.abs().log10().floor()).clamp(0.0, 330.0) as usize;
    format!("{v:.digits$}").parse().unwrap_or(v)
}

/// A swept parameter and its odometer cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchParameter {
    name: String,
    target: ParamTarget,
    domain: Domain,
    cursor: usize,
}

impl BatchParameter {
    /// A numeric or boolean sweep over `kind`.
    ///
    /// Numeric sweeps take exactly `start increment end`, already parsed
    /// to `kind`. Boolean sweeps always run `[false, true]`.
    fn build(
        name: &str,
        target: ParamTarget,
        kind: ParamKind,
        range: &[ParamValue],
    ) -> Result<Self, BatchError> {
        let malformed = |reason: &str| BatchError::MalformedRange {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let domain = match kind {
            ParamKind::Bool => Domain::Toggle,
            ParamKind::Int => match range {
                [ParamValue::Int(start), ParamValue::Int(increment), ParamValue::Int(end)] => {
                    if *increment == 0 {
                        return Err(malformed("increment must be non-zero"));
                    }
                    let span = end
                        .checked_sub(*start)
                        .ok_or_else(|| malformed("range overflows"))?;
                    let steps = span / increment;
                    if span.signum() * increment.signum() < 0 {
                        return Err(malformed("increment points away from end"));
                    }
                    Domain::Int {
                        start: *start,
                        increment: *increment,
                        steps: usize::try_from(steps)
                            .ok()
                            .and_then(|s| s.checked_add(1))
                            .ok_or_else(|| malformed("too many steps"))?,
                    }
                }
                _ => return Err(malformed("expected start increment end")),
            },
            ParamKind::Float => {
                let as_f64: Vec<f64> = range.iter().filter_map(ParamValue::as_f64).collect();
                match as_f64.as_slice() {
                    [start, increment, end] if range.len() == 3 => {
                        if *increment == 0.0 {
                            return Err(malformed("increment must be non-zero"));
                        }
                        let ratio = (end - start) / increment;
                        if !ratio.is_finite() || ratio < -STEP_EPSILON {
                            return Err(malformed("increment points away from end"));
                        }
                        let steps = (ratio + STEP_EPSILON).floor();
                        let steps = (steps < usize::MAX as f64)
                            .then_some(steps as usize)
                            .and_then(|s| s.checked_add(1))
                            .ok_or_else(|| malformed("too many steps"))?;
                        Domain::Float {
                            start: *start,
                            increment: *increment,
                            steps,
                        }
                    }
                    _ => return Err(malformed("expected start increment end")),
                }
            }
            ParamKind::Text => {
                return Err(BatchError::NotBatchable {
                    name: name.to_string(),
                    kind,
                })
            }
        };
        Ok(Self {
            name: name.to_string(),
            target,
            domain,
            cursor: 0,
        })
    }

    /// Parameter name as written in the batch command.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry holding the parameter.
    pub fn target(&self) -> ParamTarget {
        self.target
    }

    /// Number of values this parameter takes.
    pub fn step_count(&self) -> usize {
        match self.domain {
            Domain::Int { steps, .. } | Domain::Float { steps, .. } => steps,
            Domain::Toggle => 2,
        }
    }

    /// The `k`-th value, if `k` is below [`step_count`](Self::step_count).
    pub fn value_at(&self, k: usize) -> Option<ParamValue> {
        if k >= self.step_count() {
            return None;
        }
        Some(match self.domain {
            Domain::Int {
                start, increment, ..
            } => ParamValue::Int(start + k as i64 * increment),
            Domain::Float {
                start, increment, ..
            } => ParamValue::Float(snap(start + k as f64 * increment, increment)),
            Domain::Toggle => ParamValue::Bool(k == 1),
        })
    }

    /// Ask `store` whether it accepts this parameter's first and last
    /// values. Numeric domains are intervals, so the endpoints decide
    /// every value between them.
    fn check_against(&self, store: &dyn ParameterStore) -> Result<(), BatchError> {
        let last = self.step_count().saturating_sub(1);
        for k in [0, last] {
            if let Some(value) = self.value_at(k) {
                store.check_param(&self.name, &value)?;
            }
        }
        Ok(())
    }

    /// All values in order.
    pub fn values(&self) -> Vec<ParamValue> {
        (0..self.step_count()).filter_map(|k| self.value_at(k)).collect()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value under the cursor.
    pub fn current(&self) -> ParamValue {
        self.value_at(self.cursor).unwrap_or(ParamValue::Bool(false))
    }

    /// Move the cursor back to the first value.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Advance the cursor, wrapping to the first value. Returns true on
    /// wrap (the odometer carry).
    pub fn advance(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor >= self.step_count() {
            self.cursor = 0;
            true
        } else {
            false
        }
    }
}

// ── BatchSweep ─────────────────────────────────────────────────────

/// Summary of one combination's run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Zero-based combination index.
    pub ordinal: u64,
    /// Resolved parameter values, in declaration order.
    pub values: Vec<(String, ParamValue)>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Cycles completed.
    pub cycles_completed: u64,
    /// Cycles whose step failed.
    pub failed_cycles: u64,
}

/// Result of driving a whole sweep.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The simulation after the last combination, with every swept
    /// parameter restored to its baseline.
    pub simulation: Simulation,
    /// One summary per combination, in order.
    pub summaries: Vec<RunSummary>,
}

/// Enumerates and drives every combination of a set of swept parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSweep {
    params: Vec<BatchParameter>,
    baseline: Vec<ParamValue>,
}

fn render(values: &[(String, ParamValue)]) -> String {
    values
        .iter()
        .map(|(n, v)| format!("{n}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl BatchSweep {
    /// Resolve every spec against the global registry, then the package
    /// registry, and capture each parameter's current value as the
    /// baseline restored after every run.
    ///
    /// Every swept value is checked against its store here, so a range
    /// leaving the parameter's domain fails before any run starts and
    /// the caller keeps the simulation.
    pub fn new(
        specs: &[BatchSpec],
        global: &dyn ParameterStore,
        package: Option<&dyn ParameterStore>,
    ) -> Result<Self, BatchError> {
        let mut params = Vec::with_capacity(specs.len());
        let mut baseline = Vec::with_capacity(specs.len());
        for spec in specs {
            let (target, store) = if global.kind_of(&spec.name).is_some() {
                (ParamTarget::Global, global)
            } else {
                match package {
                    Some(p) if p.kind_of(&spec.name).is_some() => (ParamTarget::Package, p),
                    _ => {
                        return Err(BatchError::UnknownParameter {
                            name: spec.name.clone(),
                        })
                    }
                }
            };
            let kind = store
                .kind_of(&spec.name)
                .ok_or_else(|| BatchError::UnknownParameter {
                    name: spec.name.clone(),
                })?;
            if !kind.is_batchable() {
                return Err(BatchError::NotBatchable {
                    name: spec.name.clone(),
                    kind,
                });
            }
            let range = if kind == ParamKind::Bool {
                Vec::new()
            } else {
                if spec.values.len() != 3 {
                    return Err(BatchError::MalformedRange {
                        name: spec.name.clone(),
                        reason: format!(
                            "expected start increment end, got {} values",
                            spec.values.len()
                        ),
                    });
                }
                spec.values
                    .iter()
                    .map(|raw| store.parse_param(&spec.name, raw))
                    .collect::<Result<Vec<_>, _>>()?
            };
            let current = store
                .get_param(&spec.name)
                .ok_or_else(|| BatchError::UnknownParameter {
                    name: spec.name.clone(),
                })?;
            let param = BatchParameter::build(&spec.name, target, kind, &range)?;
            param.check_against(store)?;
            params.push(param);
            baseline.push(current);
        }
        Ok(Self { params, baseline })
    }

    /// [`new`](Self::new) against a simulation's own registries.
    pub fn for_simulation(specs: &[BatchSpec], sim: &Simulation) -> Result<Self, BatchError> {
        Self::new(specs, &sim.config, sim.package.params())
    }

    /// The swept parameters in declaration order.
    pub fn parameters(&self) -> &[BatchParameter] {
        &self.params
    }

    /// Product of every parameter's step count.
    pub fn total_combinations(&self) -> u64 {
        self.params
            .iter()
            .fold(1u64, |acc, p| acc.saturating_mul(p.step_count() as u64))
    }

    /// Position the odometer on combination `n` and return its values.
    pub fn select(&mut self, n: u64) -> Result<Vec<(String, ParamValue)>, BatchError> {
        let total = self.total_combinations();
        if n >= total {
            return Err(BatchError::SetOutOfRange { index: n, total });
        }
        for p in &mut self.params {
            p.reset();
        }
        for _ in 0..n {
            for p in &mut self.params {
                if !p.advance() {
                    break;
                }
            }
        }
        Ok(self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.current()))
            .collect())
    }

    /// Select combination `n` and write each value into its backing
    /// store through the same parse/validate path as parameter files.
    pub fn apply_parameter_set(
        &mut self,
        n: u64,
        sim: &mut Simulation,
    ) -> Result<Vec<(String, ParamValue)>, BatchError> {
        let values = self.select(n)?;
        for (param, (name, value)) in self.params.iter().zip(&values) {
            let raw = value.to_string();
            match param.target {
                ParamTarget::Global => sim.config.set_param_str(name, &raw)?,
                ParamTarget::Package => sim
                    .package
                    .params_mut()
                    .ok_or_else(|| BatchError::NoPackageParameters { name: name.clone() })?
                    .set_param_str(name, &raw)?,
            }
        }
        Ok(values)
    }

    /// Write every swept parameter's baseline value back.
    pub fn restore_baseline(&self, sim: &mut Simulation) -> Result<(), BatchError> {
        for (param, value) in self.params.iter().zip(&self.baseline) {
            match param.target {
                ParamTarget::Global => sim.config.set_param(&param.name, value.clone())?,
                ParamTarget::Package => sim
                    .package
                    .params_mut()
                    .ok_or_else(|| BatchError::NoPackageParameters {
                        name: param.name.clone(),
                    })?
                    .set_param(&param.name, value.clone())?,
            }
        }
        Ok(())
    }

    /// Every combination as text: a `Set <n+1>` header followed by one
    /// indented `name = value` line per parameter.
    pub fn batch_list(&mut self) -> String {
        let mut out = String::new();
        for n in 0..self.total_combinations() {
            let Ok(values) = self.select(n) else { break };
            let _ = writeln!(out, "Set {}", n + 1);
            for (name, value) in values {
                let _ = writeln!(out, "\t{name} = {value}");
            }
        }
        out
    }

    /// Write [`batch_list`](Self::batch_list) to `path`.
    pub fn write_batch_list(&mut self, path: &Path) -> Result<(), BatchError> {
        std::fs::write(path, self.batch_list()).map_err(|e| BatchError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Run every combination to completion.
    ///
    /// Each run starts from a copy of the world as it was on entry, with
    /// combination `n` applied; afterwards every swept parameter returns
    /// to its baseline. Runs never pause on step. The world in the
    /// returned simulation is the last run's final world.
    pub fn run(&mut self, mut sim: Simulation, config: &ControllerConfig) -> Result<BatchOutcome, BatchError> {
        let baseline_world = sim.world.backup();
        let total = self.total_combinations();
        let mut summaries = Vec::new();

        for n in 0..total {
            sim.world = baseline_world.backup();
            let values = self.apply_parameter_set(n, &mut sim)?;
            info!(set = n + 1, total, values = %render(&values), "batch combination");

            let pause_on_step = std::mem::replace(&mut sim.config.pause_on_step, false);
            let report = SimulationController::run_to_completion(sim, config.clone())?;
            sim = report.simulation;
            sim.config.pause_on_step = pause_on_step;
            self.restore_baseline(&mut sim)?;

            summaries.push(RunSummary {
                ordinal: n,
                values,
                outcome: report.outcome,
                cycles_completed: report.cycles_completed,
                failed_cycles: report.failed_cycles,
            });
        }
        Ok(BatchOutcome {
            simulation: sim,
            summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::params::ParamTable;

    fn package_params() -> ParamTable {
        ParamTable::new("package")
            .with("deathrate", ParamValue::Float(0.05))
            .with("spawn", ParamValue::Bool(false))
            .with("label", ParamValue::Text("x".into()))
            .with("maxspawn", ParamValue::Int(1))
    }

    fn sweep(specs: &[BatchSpec]) -> Result<BatchSweep, BatchError> {
        let global = SimConfig::default();
        let package = package_params();
        BatchSweep::new(specs, &global, Some(&package as &dyn ParameterStore))
    }

    #[test]
    fn float_range_is_inclusive() {
        let s = sweep(&[BatchSpec::new("deathrate", &["0.0", "0.1", "0.2"])]).unwrap();
        let p = &s.parameters()[0];
        assert_eq!(p.step_count(), 3);
        assert_eq!(
            p.values(),
            vec![
                ParamValue::Float(0.0),
                ParamValue::Float(0.1),
                ParamValue::Float(0.2)
            ]
        );
        assert_eq!(p.target(), ParamTarget::Package);
    }

    #[test]
    fn float_steps_are_snapped() {
        let s = sweep(&[BatchSpec::new("deathrate", &["0.0", "0.1", "0.3"])]).unwrap();
        assert_eq!(s.parameters()[0].value_at(3), Some(ParamValue::Float(0.3)));
    }

    #[test]
    fn tiny_increments_keep_distinct_values() {
        let s = sweep(&[BatchSpec::new("deathrate", &["1e-13", "1e-13", "3e-13"])]).unwrap();
        assert_eq!(
            s.parameters()[0].values(),
            vec![
                ParamValue::Float(1e-13),
                ParamValue::Float(2e-13),
                ParamValue::Float(3e-13)
            ]
        );
    }

    #[test]
    fn step_count_overflow_is_malformed() {
        assert_eq!(
            sweep(&[BatchSpec::new("deathrate", &["0", "1e-300", "1"])]),
            Err(BatchError::MalformedRange {
                name: "deathrate".into(),
                reason: "too many steps".into(),
            })
        );
    }

    #[test]
    fn values_outside_the_domain_fail_construction() {
        assert!(matches!(
            sweep(&[BatchSpec::new("dilfactor", &["0.5", "0.5", "1.5"])]),
            Err(BatchError::Param(ParamError::OutOfRange { .. }))
        ));
        assert!(matches!(
            sweep(&[BatchSpec::new("undodepth", &["0", "1", "2"])]),
            Err(BatchError::Param(ParamError::OutOfRange { .. }))
        ));
        assert!(sweep(&[BatchSpec::new("dilfactor", &["0.0", "0.5", "1.0"])]).is_ok());
    }

    #[test]
    fn int_range_and_global_lookup_first() {
        let s = sweep(&[BatchSpec::new("maxCycles", &["10", "5", "22"])]).unwrap();
        let p = &s.parameters()[0];
        assert_eq!(p.target(), ParamTarget::Global);
        assert_eq!(
            p.values(),
            vec![
                ParamValue::Int(10),
                ParamValue::Int(15),
                ParamValue::Int(20)
            ]
        );
    }

    #[test]
    fn bool_domain_is_false_then_true() {
        let s = sweep(&[BatchSpec::new("spawn", &[])]).unwrap();
        assert_eq!(
            s.parameters()[0].values(),
            vec![ParamValue::Bool(false), ParamValue::Bool(true)]
        );
    }

    #[test]
    fn construction_failures() {
        assert_eq!(
            sweep(&[BatchSpec::new("nosuch", &["1", "1", "2"])]),
            Err(BatchError::UnknownParameter {
                name: "nosuch".into()
            })
        );
        assert!(matches!(
            sweep(&[BatchSpec::new("label", &["a", "b", "c"])]),
            Err(BatchError::NotBatchable { .. })
        ));
        assert!(matches!(
            sweep(&[BatchSpec::new("deathrate", &["0.0", "0.1"])]),
            Err(BatchError::MalformedRange { .. })
        ));
        assert!(matches!(
            sweep(&[BatchSpec::new("deathrate", &["0.0", "0.0", "1.0"])]),
            Err(BatchError::MalformedRange { .. })
        ));
        assert!(matches!(
            sweep(&[BatchSpec::new("deathrate", &["1.0", "0.1", "0.0"])]),
            Err(BatchError::MalformedRange { .. })
        ));
        assert!(matches!(
            sweep(&[BatchSpec::new("maxspawn", &["1", "x", "3"])]),
            Err(BatchError::Param(ParamError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn odometer_first_parameter_least_significant() {
        let mut s = sweep(&[
            BatchSpec::new("deathrate", &["0.0", "0.1", "0.2"]),
            BatchSpec::new("spawn", &[]),
        ])
        .unwrap();
        assert_eq!(s.total_combinations(), 6);

        let first = s.select(0).unwrap();
        assert_eq!(first[0].1, ParamValue::Float(0.0));
        assert_eq!(first[1].1, ParamValue::Bool(false));

        let second = s.select(1).unwrap();
        assert_eq!(second[0].1, ParamValue::Float(0.1));
        assert_eq!(second[1].1, ParamValue::Bool(false));

        let fourth = s.select(3).unwrap();
        assert_eq!(fourth[0].1, ParamValue::Float(0.0));
        assert_eq!(fourth[1].1, ParamValue::Bool(true));

        let last = s.select(5).unwrap();
        assert_eq!(last[0].1, ParamValue::Float(0.2));
        assert_eq!(last[1].1, ParamValue::Bool(true));

        assert_eq!(
            s.select(6),
            Err(BatchError::SetOutOfRange { index: 6, total: 6 })
        );
    }

    #[test]
    fn empty_sweep_is_one_combination() {
        let mut s = sweep(&[]).unwrap();
        assert_eq!(s.total_combinations(), 1);
        assert!(s.select(0).unwrap().is_empty());
    }

    #[test]
    fn batch_list_format() {
        let mut s = sweep(&[
            BatchSpec::new("spawn", &[]),
            BatchSpec::new("maxspawn", &["1", "1", "2"]),
        ])
        .unwrap();
        let text = s.batch_list();
        let expected = "Set 1\n\tspawn = false\n\tmaxspawn = 1\n\
                        Set 2\n\tspawn = true\n\tmaxspawn = 1\n\
                        Set 3\n\tspawn = false\n\tmaxspawn = 2\n\
                        Set 4\n\tspawn = true\n\tmaxspawn = 2\n";
        assert_eq!(text, expected);
    }
}
