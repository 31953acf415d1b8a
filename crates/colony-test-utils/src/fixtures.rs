//! Reusable package fixtures.
//!
//! Three packages for driving the engine in tests:
//!
//! - [`RefreshOnlyPackage`]: does nothing, so only the engine's
//!   refresh and static passes touch the world.
//! - [`GrowthPackage`]: scales biomass each cycle by package parameters
//!   and records what every run started with.
//! - [`FailingPackage`]: fails deterministically after N steps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use colony_core::{Biomass, Cell, CellId, CycleId, PackageError, Runnable};
use colony_engine::{Package, ParamTable, ParamValue, ParameterStore, SimConfig, WorldState};

/// Steps nothing. Its reactions never initialize, so an empty world
/// runs to `max_cycles`.
#[derive(Debug, Default)]
pub struct RefreshOnlyPackage;

impl Runnable for RefreshOnlyPackage {
    type State = WorldState;

    fn run(&mut self, _world: &mut WorldState, _cycle: CycleId) -> Result<(), PackageError> {
        Ok(())
    }
}

impl Package for RefreshOnlyPackage {
    fn name(&self) -> &str {
        "refresh-only"
    }
}

/// What a [`GrowthPackage`] saw when a run initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct RunStart {
    pub growth_rate: f64,
    pub death_rate: f64,
    pub spawn: bool,
    pub max_cycles: Option<u64>,
    pub cells: usize,
}

/// Multiplies every biomass entry by `1 + growthrate - deathrate` each
/// cycle and removes cells whose total biomass falls below `threshold`.
///
/// Parameters: `growthrate` (float, 0.1), `deathrate` (float, 0.0),
/// `spawn` (bool, false), `threshold` (float, 1e-6).
#[derive(Debug)]
pub struct GrowthPackage {
    params: ParamTable,
    starts: Arc<Mutex<Vec<RunStart>>>,
}

impl GrowthPackage {
    pub fn new() -> Self {
        Self {
            params: ParamTable::new("growth")
                .with("growthRate", ParamValue::Float(0.1))
                .with("deathRate", ParamValue::Float(0.0))
                .with("spawn", ParamValue::Bool(false))
                .with("threshold", ParamValue::Float(1e-6)),
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared log of every run's starting parameters.
    pub fn starts(&self) -> Arc<Mutex<Vec<RunStart>>> {
        Arc::clone(&self.starts)
    }

    fn rate(&self, name: &str) -> f64 {
        self.params.float(name).unwrap_or(0.0)
    }
}

impl Default for GrowthPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl Runnable for GrowthPackage {
    type State = WorldState;

    fn run(&mut self, world: &mut WorldState, _cycle: CycleId) -> Result<(), PackageError> {
        let factor = 1.0 + self.rate("growthrate") - self.rate("deathrate");
        let threshold = self.rate("threshold");
        let mut dead: Vec<CellId> = Vec::new();
        for cell in world.cells_mut().iter_mut() {
            cell.scale_biomass(factor);
            if cell.total_biomass() < threshold {
                dead.push(cell.id());
            }
        }
        for id in dead {
            world.remove_cell(id);
        }
        Ok(())
    }
}

impl Package for GrowthPackage {
    fn name(&self) -> &str {
        "growth"
    }

    fn initialize(&mut self, world: &mut WorldState, config: &SimConfig) -> Result<(), PackageError> {
        let start = RunStart {
            growth_rate: self.rate("growthrate"),
            death_rate: self.rate("deathrate"),
            spawn: self.params.flag("spawn").unwrap_or(false),
            max_cycles: config.max_cycles,
            cells: world.cells().len(),
        };
        if let Ok(mut log) = self.starts.lock() {
            log.push(start);
        }
        Ok(())
    }

    fn reactions_initialized(&self) -> bool {
        true
    }

    fn params(&self) -> Option<&dyn ParameterStore> {
        Some(&self.params)
    }

    fn params_mut(&mut self) -> Option<&mut dyn ParameterStore> {
        Some(&mut self.params)
    }
}

/// Succeeds `succeed_count` steps, then fails every step after.
///
/// The call counter is shared so tests can read it after the package has
/// moved into a run.
#[derive(Debug)]
pub struct FailingPackage {
    pub succeed_count: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingPackage {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `run()` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Runnable for FailingPackage {
    type State = WorldState;

    fn run(&mut self, _world: &mut WorldState, cycle: CycleId) -> Result<(), PackageError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(PackageError::StepFailed {
                reason: format!(
                    "deliberate failure at cycle {cycle} after {} successful steps",
                    self.succeed_count
                ),
            });
        }
        Ok(())
    }
}

impl Package for FailingPackage {
    fn name(&self) -> &str {
        "failing"
    }
}
