//! Test utilities and mock types for Colony development.
//!
//! Provides a concrete [`TestCell`] and [`TestModel`], a
//! [`TestWorldBuilder`] for assembling worlds in a few lines, and a
//! [`MockLayoutLoader`] serving prebuilt worlds to script runs. Packages
//! for driving the engine live in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use colony_core::{Backup, Biomass, Cell, CellId, Coord, Model};
use colony_engine::{LayoutError, LayoutLoader, SimConfig, WorldState};
use colony_grid::{EdgeBehavior, Grid, Shape};

/// Minimal cell: an id, a coordinate, and a biomass vector.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCell {
    pub id: CellId,
    pub coord: Coord,
    pub biomass: Vec<f64>,
}

impl TestCell {
    pub fn new(id: CellId, coord: &[i32], biomass: Vec<f64>) -> Self {
        Self {
            id,
            coord: Coord::from_slice(coord),
            biomass,
        }
    }
}

impl Biomass for TestCell {
    fn biomass(&self) -> &[f64] {
        &self.biomass
    }

    fn biomass_mut(&mut self) -> &mut [f64] {
        &mut self.biomass
    }

    fn set_biomass(&mut self, biomass: Vec<f64>) {
        self.biomass = biomass;
    }
}

impl Cell for TestCell {
    fn id(&self) -> CellId {
        self.id
    }

    fn coord(&self) -> &Coord {
        &self.coord
    }

    fn set_coord(&mut self, coord: Coord) {
        self.coord = coord;
    }

    fn duplicate(&self) -> Box<dyn Cell> {
        Box::new(self.clone())
    }
}

/// A named species with no behavior of its own.
#[derive(Debug)]
pub struct TestModel {
    pub name: String,
}

impl TestModel {
    pub fn shared(name: &str) -> Arc<dyn Model> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

impl Model for TestModel {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for test worlds.
///
/// Defaults: 10x10, one medium, clamped edges, seed 0, one model named
/// `"m0"`, no cells.
pub struct TestWorldBuilder {
    extents: Vec<u32>,
    num_media: usize,
    edge: EdgeBehavior,
    seed: u64,
    models: Vec<Arc<dyn Model>>,
    cells: Vec<(Vec<i32>, Vec<f64>)>,
    media: Vec<(Vec<i32>, Vec<f64>)>,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            extents: vec![10, 10],
            num_media: 1,
            edge: EdgeBehavior::Clamp,
            seed: 0,
            models: vec![TestModel::shared("m0")],
            cells: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn extents(mut self, extents: &[u32]) -> Self {
        self.extents = extents.to_vec();
        self
    }

    pub fn media(mut self, num_media: usize) -> Self {
        self.num_media = num_media;
        self
    }

    pub fn edge(mut self, edge: EdgeBehavior) -> Self {
        self.edge = edge;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the model list with fresh models of the given names.
    pub fn models(mut self, names: &[&str]) -> Self {
        self.models = names.iter().map(|n| TestModel::shared(n)).collect();
        self
    }

    /// Add a cell at `coord`; `biomass` must have one entry per model.
    pub fn cell(mut self, coord: &[i32], biomass: &[f64]) -> Self {
        self.cells.push((coord.to_vec(), biomass.to_vec()));
        self
    }

    /// Set the media vector at `coord`.
    pub fn media_at(mut self, coord: &[i32], values: &[f64]) -> Self {
        self.media.push((coord.to_vec(), values.to_vec()));
        self
    }

    /// Build the world.
    ///
    /// # Panics
    ///
    /// Panics on an invalid shape or a rejected cell or media edit.
    pub fn build(self) -> WorldState {
        let shape = Shape::new(&self.extents).expect("test shape must be valid");
        let grid = Grid::new(shape, self.num_media, self.edge, self.seed);
        let mut world = WorldState::new(grid, self.models);
        for (coord, values) in self.media {
            world
                .grid_mut()
                .set_media(&Coord::from_slice(&coord), &values)
                .expect("test media must be valid");
        }
        for (coord, biomass) in self.cells {
            let id = world.next_cell_id();
            world
                .add_cell(Box::new(TestCell::new(id, &coord, biomass)))
                .expect("test cell must be valid");
        }
        world
    }
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves prebuilt worlds by path. Each load hands out an independent
/// copy of the registered world.
///
/// Records every load along with the `maxcycles` value it saw, so tests
/// can check ordering against parameter loads.
#[derive(Default)]
pub struct MockLayoutLoader {
    layouts: HashMap<PathBuf, WorldState>,
    loads: Arc<Mutex<Vec<(PathBuf, Option<u64>)>>>,
}

impl MockLayoutLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, path: impl Into<PathBuf>, world: WorldState) -> Self {
        self.layouts.insert(path.into(), world);
        self
    }

    /// Shared log of `(path, max_cycles)` per load.
    pub fn loads(&self) -> Arc<Mutex<Vec<(PathBuf, Option<u64>)>>> {
        Arc::clone(&self.loads)
    }
}

impl LayoutLoader for MockLayoutLoader {
    fn load_layout(&mut self, path: &Path, config: &SimConfig) -> Result<WorldState, LayoutError> {
        let world = self.layouts.get(path).ok_or_else(|| LayoutError {
            path: path.to_path_buf(),
            reason: "no such layout".to_string(),
        })?;
        if let Ok(mut log) = self.loads.lock() {
            log.push((path.to_path_buf(), config.max_cycles));
        }
        Ok(world.backup())
    }
}
