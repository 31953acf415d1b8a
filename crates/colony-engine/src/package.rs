//! The contract a simulation package fulfils to be driven by the engine.

use colony_core::{Biomass, PackageError, Runnable};

use crate::config::SimConfig;
use crate::params::ParameterStore;
use crate::world::WorldState;

/// A pluggable simulation package.
///
/// The package owns the numerical work of a cycle (diffusion, reactions,
/// growth, death) through [`Runnable::run`]. The engine adds the refresh
/// and static-media passes after each step and calls the lifecycle hooks
/// below at fixed points of a run.
pub trait Package: Runnable<State = WorldState> + Send {
    /// Display name, used in logs.
    fn name(&self) -> &str;

    /// Called once when a run starts, before the first cycle.
    ///
    /// A returned error aborts the run before it enters the running
    /// state.
    fn initialize(&mut self, world: &mut WorldState, config: &SimConfig) -> Result<(), PackageError> {
        let _ = (world, config);
        Ok(())
    }

    /// Whether the package's reaction subsystem is ready.
    ///
    /// A run ends early on an empty world only once this reports true,
    /// so a world seeded after start-up is not mistaken for extinct.
    fn reactions_initialized(&self) -> bool {
        false
    }

    /// Apply batch dilution. The default scales every cell's biomass by
    /// `factor`.
    fn dilute(&mut self, world: &mut WorldState, factor: f64) -> Result<(), PackageError> {
        for cell in world.cells_mut().iter_mut() {
            cell.scale_biomass(factor);
        }
        Ok(())
    }

    /// Called once when a run that initialized successfully ends, however
    /// it ends.
    fn finish(&mut self, world: &mut WorldState) {
        let _ = world;
    }

    /// Package-specific parameters, if any.
    fn params(&self) -> Option<&dyn ParameterStore> {
        None
    }

    /// Mutable package-specific parameters, if any.
    fn params_mut(&mut self) -> Option<&mut dyn ParameterStore> {
        None
    }
}
