//! Run lifecycle states and the events a controller publishes.

use std::fmt;
use std::time::Duration;

use colony_core::{CycleId, PackageError};

use crate::metrics::CycleMetrics;

/// Lifecycle state of a run.
///
/// `Init -> Running <-> Paused -> Finished`; `Finished` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SimState {
    /// Spawned; the package has not finished initializing.
    Init = 0,
    /// Advancing cycles.
    Running = 1,
    /// Blocked at the top of a cycle until resumed or cancelled.
    Paused = 2,
    /// The run is over. The package's `finish` hook has run or the run
    /// was aborted before it started.
    Finished = 3,
}

impl SimState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Finished,
        }
    }
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Outcome of one completed cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// The cycle that ran.
    pub cycle: CycleId,
    /// Wall-clock time of the cycle.
    pub elapsed: Duration,
    /// The package step's result. A failure is reported here and does
    /// not stop the run.
    pub status: Result<(), PackageError>,
    /// Cells alive after the cycle.
    pub cell_count: usize,
    /// Timing breakdown.
    pub metrics: CycleMetrics,
}

/// Notification published by a running controller.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    /// The run moved between lifecycle states.
    StateChanged {
        /// Previous state.
        from: SimState,
        /// New state.
        to: SimState,
    },
    /// A cycle finished, successfully or not.
    CycleCompleted(CycleReport),
    /// A slideshow snapshot should be captured for this cycle.
    SnapshotDue {
        /// The cycle about to run.
        cycle: CycleId,
    },
    /// Batch dilution was applied at the start of this cycle.
    DilutionApplied {
        /// The cycle about to run.
        cycle: CycleId,
        /// The factor applied.
        factor: f64,
    },
}
