//! Simulation engine for Colony ecosystem simulations.
//!
//! Owns the live world ([`WorldState`]), drives it one cycle at a time on
//! a background worker ([`SimulationController`]), keeps bounded
//! undo/redo history ([`SnapshotHistory`]), and repeats whole runs over
//! parameter sweeps ([`BatchSweep`]) described by line-oriented
//! [`Script`]s.
//!
//! The numerical work of each cycle belongs to a [`Package`]; the engine
//! adds the refresh and static-media passes, termination checks, periodic
//! dilution, and the pause/resume/cancel protocol around it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod controller;
mod cycle;
pub mod event;
mod gate;
pub mod history;
pub mod metrics;
pub mod package;
pub mod params;
pub mod report;
pub mod script;
pub mod world;

pub use batch::{
    BatchError, BatchOutcome, BatchParameter, BatchSpec, BatchSweep, ParamTarget, RunSummary,
};
pub use config::{ConfigError, ControllerConfig, PauseMode, SimConfig};
pub use controller::{ControllerHandle, SimulationController};
pub use event::{ControllerEvent, CycleReport, SimState};
pub use history::{HistoryError, SnapshotHistory};
pub use metrics::{CycleMetrics, RunMetrics};
pub use package::Package;
pub use params::{
    apply_param_text, load_param_file, parse_param_text, ParamError, ParamFileError, ParamKind,
    ParamTable, ParamValue, ParameterStore,
};
pub use report::{AbortReason, RunOutcome, RunReport, TerminationReason};
pub use script::{
    LayoutError, LayoutLoader, Script, ScriptCommand, ScriptError, ScriptOutcome, ScriptRunner,
};
pub use world::{CellCollection, Simulation, WorldError, WorldState};
