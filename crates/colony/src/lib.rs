//! Colony: the core of a spatial microbial ecosystem simulator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Colony sub-crates. For most users, adding `colony` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use colony::prelude::*;
//! use colony::types::{CycleId, PackageError};
//!
//! // A package that leaves the world to the engine's media passes.
//! struct Idle;
//! impl Runnable for Idle {
//!     type State = WorldState;
//!     fn run(&mut self, _: &mut WorldState, _: CycleId) -> Result<(), PackageError> {
//!         Ok(())
//!     }
//! }
//! impl Package for Idle {
//!     fn name(&self) -> &str { "idle" }
//! }
//!
//! // A 16x16 grid with one medium, fed at its center.
//! let shape = Shape::square(16, 16).unwrap();
//! let mut world = WorldState::new(Grid::new(shape, 1, EdgeBehavior::Clamp, 42), Vec::new());
//! world.grid_mut().set_refresh_point(&Coord::from_slice(&[8, 8]), vec![0.5]).unwrap();
//!
//! let config = SimConfig { max_cycles: Some(10), ..SimConfig::default() };
//! let sim = Simulation::new(world, Box::new(Idle), config);
//! let report = SimulationController::run_to_completion(sim, ControllerConfig::unattended()).unwrap();
//! assert_eq!(report.cycles_completed, 10);
//! assert_eq!(report.simulation.world.grid().total_media(), vec![5.0]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `colony-core` | IDs, capability traits, error types |
//! | [`grid`] | `colony-grid` | Shapes, media, barriers, occupancy, refresh rules |
//! | [`engine`] | `colony-engine` | World state, controller, history, sweeps, scripts |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers, traits, and errors (`colony-core`).
///
/// Contains [`types::CellId`], [`types::Coord`], and the capability
/// traits ([`types::Biomass`], [`types::Backup`], [`types::Cell`]).
pub use colony_core as types;

/// The spatial grid (`colony-grid`).
pub use colony_grid as grid;

/// World state and run control (`colony-engine`).
///
/// [`engine::SimulationController`] runs a [`engine::Simulation`] on a
/// worker thread; [`engine::BatchSweep`] and [`engine::ScriptRunner`]
/// repeat runs across parameter combinations.
pub use colony_engine as engine;

/// Common imports for typical Colony usage.
///
/// ```rust
/// use colony::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use colony_core::{Backup, Biomass, Cell, CellId, Coord, Model, Runnable};

    // Grid
    pub use colony_grid::{EdgeBehavior, Grid, Shape};

    // Engine
    pub use colony_engine::{
        BatchSpec, BatchSweep, ControllerConfig, ControllerHandle, Package, ParameterStore,
        RunOutcome, RunReport, Script, ScriptRunner, SimConfig, SimState, Simulation,
        SimulationController, SnapshotHistory, WorldState,
    };
}
