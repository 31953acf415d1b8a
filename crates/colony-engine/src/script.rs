//! Line-oriented experiment scripts and the runner that executes them.
//!
//! A script is a sequence of whitespace-delimited lines. The leading
//! token picks the command (case-insensitive):
//!
//! ```text
//! load_comets_parameters  <path>   # global SimConfig parameters
//! load_package_parameters <path>   # package parameters
//! load_layout             <path>   # world layout, via a LayoutLoader
//! batch_list_file         <path>   # where to write the batch list
//! <name> <v1> <v2> <v3>            # anything else: a batch sweep spec
//! ```
//!
//! Blank lines and lines starting with `#` or `//` are ignored.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::batch::{BatchError, BatchSpec, BatchSweep, RunSummary};
use crate::config::{ConfigError, ControllerConfig, SimConfig};
use crate::controller::SimulationController;
use crate::package::Package;
use crate::params::{load_param_file, ParamFileError};
use crate::world::{Simulation, WorldState};

// ── Errors ─────────────────────────────────────────────────────────

/// A layout could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutError {
    /// The layout file.
    pub path: PathBuf,
    /// What went wrong.
    pub reason: String,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot load layout {}: {}", self.path.display(), self.reason)
    }
}

impl Error for LayoutError {}

/// Errors parsing or executing a script. Every variant halts the script
/// before (or instead of) running.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptError {
    /// The script file could not be read.
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error, rendered.
        reason: String,
    },
    /// A command is missing its path argument.
    MissingArgument {
        /// 1-based line number.
        line: usize,
        /// The command.
        command: String,
    },
    /// A parameter file failed to load.
    Params {
        /// The parameter file.
        path: PathBuf,
        /// The load error.
        source: ParamFileError,
    },
    /// `load_package_parameters` on a package without parameters.
    NoPackageParameters {
        /// 1-based line number.
        line: usize,
    },
    /// The layout loader failed.
    Layout(LayoutError),
    /// The script never loaded a layout.
    NoLayout,
    /// A batch sweep could not be built or driven.
    Batch(BatchError),
    /// A single run could not be started or recovered.
    Run(ConfigError),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => {
                write!(f, "cannot read script {}: {reason}", path.display())
            }
            Self::MissingArgument { line, command } => {
                write!(f, "line {line}: '{command}' needs a path argument")
            }
            Self::Params { path, source } => write!(f, "{}: {source}", path.display()),
            Self::NoPackageParameters { line } => {
                write!(f, "line {line}: package has no parameters to load")
            }
            Self::Layout(e) => write!(f, "{e}"),
            Self::NoLayout => write!(f, "script does not load a layout"),
            Self::Batch(e) => write!(f, "batch: {e}"),
            Self::Run(e) => write!(f, "run: {e}"),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Params { source, .. } => Some(source),
            Self::Layout(e) => Some(e),
            Self::Batch(e) => Some(e),
            Self::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for ScriptError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl From<BatchError> for ScriptError {
    fn from(e: BatchError) -> Self {
        Self::Batch(e)
    }
}

impl From<ConfigError> for ScriptError {
    fn from(e: ConfigError) -> Self {
        Self::Run(e)
    }
}

// ── Script ─────────────────────────────────────────────────────────

/// One parsed script line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptCommand {
    /// `load_comets_parameters <path>`
    LoadGlobalParams(PathBuf),
    /// `load_package_parameters <path>`
    LoadPackageParams(PathBuf),
    /// `load_layout <path>`
    LoadLayout(PathBuf),
    /// `batch_list_file <path>`
    BatchListFile(PathBuf),
    /// Any other line.
    Batch(BatchSpec),
}

/// A parsed script: commands with their 1-based line numbers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<(usize, ScriptCommand)>,
}

impl Script {
    /// Parse script text.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut commands = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            let Some(head) = tokens.next() else { continue };
            let path_arg = |tokens: std::str::SplitWhitespace<'_>| {
                let rest: Vec<&str> = tokens.collect();
                if rest.is_empty() {
                    Err(ScriptError::MissingArgument {
                        line,
                        command: head.to_string(),
                    })
                } else {
                    Ok(PathBuf::from(rest.join(" ")))
                }
            };
            let command = match head.to_ascii_lowercase().as_str() {
                "load_comets_parameters" => ScriptCommand::LoadGlobalParams(path_arg(tokens)?),
                "load_package_parameters" => ScriptCommand::LoadPackageParams(path_arg(tokens)?),
                "load_layout" => ScriptCommand::LoadLayout(path_arg(tokens)?),
                "batch_list_file" => ScriptCommand::BatchListFile(path_arg(tokens)?),
                _ => ScriptCommand::Batch(BatchSpec {
                    name: head.to_string(),
                    values: tokens.map(str::to_string).collect(),
                }),
            };
            commands.push((line, command));
        }
        Ok(Self { commands })
    }

    /// Read and parse a script file.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Commands with their line numbers.
    pub fn commands(&self) -> &[(usize, ScriptCommand)] {
        &self.commands
    }

    /// Every batch spec, in order.
    pub fn batch_specs(&self) -> Vec<BatchSpec> {
        self.commands
            .iter()
            .filter_map(|(_, c)| match c {
                ScriptCommand::Batch(spec) => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    /// The last `batch_list_file` path, if any.
    pub fn batch_list_file(&self) -> Option<&Path> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            ScriptCommand::BatchListFile(p) => Some(p.as_path()),
            _ => None,
        })
    }
}

// ── ScriptRunner ───────────────────────────────────────────────────

/// Builds a world from a layout file. Layout formats live outside the
/// engine.
pub trait LayoutLoader {
    /// Load the layout at `path` with the global parameters loaded so far.
    fn load_layout(&mut self, path: &Path, config: &SimConfig) -> Result<WorldState, LayoutError>;
}

/// What a script run produced.
#[derive(Debug)]
pub struct ScriptOutcome {
    /// The simulation after the last run.
    pub simulation: Simulation,
    /// One summary per run: a single entry without batch specs.
    pub runs: Vec<RunSummary>,
}

/// Executes scripts end to end.
pub struct ScriptRunner<L> {
    loader: L,
    controller: ControllerConfig,
}

impl<L: LayoutLoader> ScriptRunner<L> {
    /// A runner whose runs use unattended pausing.
    pub fn new(loader: L) -> Self {
        Self::with_controller(loader, ControllerConfig::unattended())
    }

    /// A runner with explicit controller knobs.
    pub fn with_controller(loader: L, controller: ControllerConfig) -> Self {
        Self { loader, controller }
    }

    /// The layout loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Load everything the script names, in order, then run once or
    /// sweep every batch combination.
    ///
    /// Each run gives the grid its edge behavior from `toroidalworld`
    /// and its random stream from `randomseed`.
    pub fn run(
        &mut self,
        script: &Script,
        package: Box<dyn Package>,
        config: SimConfig,
    ) -> Result<ScriptOutcome, ScriptError> {
        self.execute(script, package, config).inspect_err(|e| {
            error!(error = %e, "script aborted");
        })
    }

    fn execute(
        &mut self,
        script: &Script,
        mut package: Box<dyn Package>,
        mut config: SimConfig,
    ) -> Result<ScriptOutcome, ScriptError> {
        let mut world = None;
        for (line, command) in script.commands() {
            match command {
                ScriptCommand::LoadGlobalParams(path) => {
                    let n = load_param_file(path, &mut config).map_err(|source| ScriptError::Params {
                        path: path.clone(),
                        source,
                    })?;
                    info!(path = %path.display(), assignments = n, "global parameters loaded");
                }
                ScriptCommand::LoadPackageParams(path) => {
                    let store = package
                        .params_mut()
                        .ok_or(ScriptError::NoPackageParameters { line: *line })?;
                    let n = load_param_file(path, store).map_err(|source| ScriptError::Params {
                        path: path.clone(),
                        source,
                    })?;
                    info!(path = %path.display(), assignments = n, "package parameters loaded");
                }
                ScriptCommand::LoadLayout(path) => {
                    let loaded = self.loader.load_layout(path, &config)?;
                    info!(
                        path = %path.display(),
                        shape = %loaded.grid().shape(),
                        cells = loaded.cells().len(),
                        "layout loaded"
                    );
                    world = Some(loaded);
                }
                ScriptCommand::BatchListFile(_) | ScriptCommand::Batch(_) => {}
            }
        }

        let world = world.ok_or(ScriptError::NoLayout)?;
        let sim = Simulation::new(world, package, config);

        let specs = script.batch_specs();
        if specs.is_empty() {
            let report = SimulationController::run_to_completion(sim, self.controller.clone())?;
            let summary = RunSummary {
                ordinal: 0,
                values: Vec::new(),
                outcome: report.outcome,
                cycles_completed: report.cycles_completed,
                failed_cycles: report.failed_cycles,
            };
            return Ok(ScriptOutcome {
                simulation: report.simulation,
                runs: vec![summary],
            });
        }

        let mut sweep = BatchSweep::for_simulation(&specs, &sim)?;
        info!(
            parameters = sweep.parameters().len(),
            combinations = sweep.total_combinations(),
            "batch sweep configured"
        );
        if let Some(path) = script.batch_list_file() {
            sweep.write_batch_list(path)?;
            info!(path = %path.display(), "batch list written");
        }
        let outcome = sweep.run(sim, &self.controller)?;
        Ok(ScriptOutcome {
            simulation: outcome.simulation,
            runs: outcome.summaries,
        })
    }
}
