//! What a finished run hands back.

use std::fmt;

use colony_core::PackageError;

use crate::config::ConfigError;
use crate::metrics::RunMetrics;
use crate::world::Simulation;

/// Why a run that started ended on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// The world ran out of cells after the package's reactions were
    /// initialized.
    NoCells,
    /// The cycle counter passed `max_cycles`.
    MaxCycles,
}

/// Why a run never entered the running state.
#[derive(Clone, Debug, PartialEq)]
pub enum AbortReason {
    /// The simulation or controller configuration failed validation.
    Config(ConfigError),
    /// The package's `initialize` hook failed.
    Init(PackageError),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Init(e) => write!(f, "package initialization: {e}"),
        }
    }
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// Ended by a termination condition.
    Completed(TerminationReason),
    /// Ended by [`cancel`](crate::SimulationController::cancel).
    Cancelled,
    /// Never started.
    Aborted(AbortReason),
}

impl RunOutcome {
    /// Whether the run ended by a termination condition.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(TerminationReason::NoCells) => write!(f, "completed (no cells left)"),
            Self::Completed(TerminationReason::MaxCycles) => write!(f, "completed (max cycles)"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// Result of one run, including the simulation it ran on.
#[derive(Debug)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Cycles that ran to completion (failed steps included).
    pub cycles_completed: u64,
    /// Cycles whose package step reported an error.
    pub failed_cycles: u64,
    /// Timing totals.
    pub metrics: RunMetrics,
    /// The simulation, returned to the caller.
    pub simulation: Simulation,
}
