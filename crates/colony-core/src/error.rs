//! Error types shared across the Colony workspace.
//!
//! Grid mutators report a small closed set of failures; simulation
//! packages report step and initialization failures. Both are plain
//! values for callers to branch on, never panics.

use std::error::Error;
use std::fmt;

use crate::id::{CellId, Coord};

/// Errors from coordinate-indexed grid mutators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// An argument vector had the wrong length (`PARAMS_ERROR`).
    Params {
        /// Length the grid expected (media count or rank).
        expected: usize,
        /// Length that was supplied.
        got: usize,
    },
    /// The coordinate does not resolve to a voxel (`BOUNDS_ERROR`).
    Bounds {
        /// The offending coordinate.
        coord: Coord,
    },
    /// The voxel already holds a different cell.
    Occupied {
        /// The resolved coordinate.
        coord: Coord,
        /// The cell already placed there.
        occupant: CellId,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Params { expected, got } => {
                write!(f, "argument length mismatch: expected {expected}, got {got}")
            }
            Self::Bounds { coord } => write!(f, "coordinate {coord:?} is off the grid"),
            Self::Occupied { coord, occupant } => {
                write!(f, "voxel {coord:?} already holds cell {occupant}")
            }
        }
    }
}

impl Error for GridError {}

/// Errors reported by a simulation package.
///
/// A `StepFailed` returned from a cycle is recorded on that cycle's
/// report and the run continues; an `InitFailed` aborts the run before
/// the first cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageError {
    /// One-time initialization failed (bad layout, missing model data).
    InitFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A single cycle's numeric step failed (solver did not converge,
    /// infeasible flux problem, and so on).
    StepFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A cell referenced by the package is not in the collection.
    UnknownCell {
        /// The missing cell.
        id: CellId,
    },
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed { reason } => write!(f, "package initialization failed: {reason}"),
            Self::StepFailed { reason } => write!(f, "package step failed: {reason}"),
            Self::UnknownCell { id } => write!(f, "unknown cell {id}"),
        }
    }
}

impl Error for PackageError {}
