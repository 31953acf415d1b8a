//! The live world: grid, cell collection, and model array, kept in sync.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use colony_core::{Backup, Cell, CellId, CellIdAllocator, Coord, GridError, Model};
use colony_grid::{Grid, Shape};
use indexmap::IndexMap;

use crate::config::SimConfig;
use crate::package::Package;

// ── WorldError ─────────────────────────────────────────────────────

/// Errors from structural edits of a [`WorldState`].
#[derive(Clone, Debug, PartialEq)]
pub enum WorldError {
    /// The grid rejected the edit.
    Grid(GridError),
    /// A cell's biomass vector does not match the model array.
    BiomassLength {
        /// The offending cell.
        id: CellId,
        /// Number of models in the world.
        expected: usize,
        /// Length of the cell's biomass vector.
        got: usize,
    },
    /// A cell with this id is already in the world.
    DuplicateCell {
        /// The duplicated id.
        id: CellId,
    },
    /// No cell with this id is in the world.
    UnknownCell {
        /// The missing id.
        id: CellId,
    },
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::BiomassLength { id, expected, got } => write!(
                f,
                "cell {id} carries {got} biomass entries, world has {expected} models"
            ),
            Self::DuplicateCell { id } => write!(f, "cell {id} is already in the world"),
            Self::UnknownCell { id } => write!(f, "no cell {id} in the world"),
        }
    }
}

impl Error for WorldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for WorldError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

// ── CellCollection ─────────────────────────────────────────────────

/// Insertion-ordered cells keyed by id.
///
/// Structural changes (insert, remove) go through [`WorldState`] so the
/// grid's occupancy stays in sync; this type only hands out read access
/// and per-cell mutable access.
#[derive(Debug, Default)]
pub struct CellCollection {
    cells: IndexMap<CellId, Box<dyn Cell>>,
}

impl CellCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether there are no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(&id)
    }

    /// The cell with this id.
    pub fn get(&self, id: CellId) -> Option<&dyn Cell> {
        self.cells.get(&id).map(|c| &**c)
    }

    /// Mutable access to a cell's biomass and other package state.
    ///
    /// Moving a cell through [`Cell::set_coord`] here desynchronizes the
    /// grid; use [`WorldState::move_cell`] instead.
    pub fn get_mut(&mut self, id: CellId) -> Option<&mut (dyn Cell + 'static)> {
        self.cells.get_mut(&id).map(|c| &mut **c)
    }

    /// Cells in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Cell> {
        self.cells.values().map(|c| &**c)
    }

    /// Mutable cells in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Cell + 'static)> {
        self.cells.values_mut().map(|c| &mut **c)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.keys().copied()
    }

    /// Per-model biomass summed over every cell. `num_models` fixes the
    /// output length.
    pub fn total_biomass(&self, num_models: usize) -> Vec<f64> {
        let mut totals = vec![0.0; num_models];
        for cell in self.cells.values() {
            for (t, b) in totals.iter_mut().zip(cell.biomass()) {
                *t += b;
            }
        }
        totals
    }

    fn insert(&mut self, cell: Box<dyn Cell>) {
        self.cells.insert(cell.id(), cell);
    }

    fn remove(&mut self, id: CellId) -> Option<Box<dyn Cell>> {
        self.cells.shift_remove(&id)
    }
}

impl Backup for CellCollection {
    fn backup(&self) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .map(|(id, cell)| (*id, cell.backup()))
                .collect(),
        }
    }
}

/// Same ids in the same order, at the same coordinates, with equal
/// biomass.
impl PartialEq for CellCollection {
    fn eq(&self, other: &Self) -> bool {
        self.cells.len() == other.cells.len()
            && self
                .cells
                .values()
                .zip(other.cells.values())
                .all(|(a, b)| a.id() == b.id() && a.coord() == b.coord() && a.biomass() == b.biomass())
    }
}

// ── WorldState ─────────────────────────────────────────────────────

fn same_model(a: &Arc<dyn Model>, b: &Arc<dyn Model>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Grid, cells, and models of one simulation.
///
/// Every cell in the collection occupies exactly its recorded voxel on
/// the grid, and every cell's biomass vector is as long as the model
/// array. The edits below preserve both.
#[derive(Debug)]
pub struct WorldState {
    grid: Grid,
    cells: CellCollection,
    models: Vec<Arc<dyn Model>>,
    ids: Arc<CellIdAllocator>,
}

impl WorldState {
    /// A world with no cells, using a fresh id allocator.
    pub fn new(grid: Grid, models: Vec<Arc<dyn Model>>) -> Self {
        Self::with_allocator(grid, models, Arc::new(CellIdAllocator::new()))
    }

    /// A world with no cells that issues ids from `ids`.
    pub fn with_allocator(grid: Grid, models: Vec<Arc<dyn Model>>, ids: Arc<CellIdAllocator>) -> Self {
        Self {
            grid,
            cells: CellCollection::new(),
            models,
            ids,
        }
    }

    /// The grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable grid access for media, barrier, and rule edits.
    ///
    /// Occupancy and shape changes go through the cell methods and
    /// [`resize`](Self::resize) so the collection stays in sync.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// The cells.
    pub fn cells(&self) -> &CellCollection {
        &self.cells
    }

    /// Mutable per-cell access.
    pub fn cells_mut(&mut self) -> &mut CellCollection {
        &mut self.cells
    }

    /// The model array.
    pub fn models(&self) -> &[Arc<dyn Model>] {
        &self.models
    }

    /// The shared id allocator.
    pub fn ids(&self) -> &Arc<CellIdAllocator> {
        &self.ids
    }

    /// Issue a fresh cell id.
    pub fn next_cell_id(&self) -> CellId {
        self.ids.next_id()
    }

    /// Add `cell` to the world at its recorded coordinate.
    ///
    /// Under a toroidal edge the coordinate is wrapped and the cell's
    /// recorded coordinate updated to match. Returns the cell's id.
    pub fn add_cell(&mut self, mut cell: Box<dyn Cell>) -> Result<CellId, WorldError> {
        let id = cell.id();
        if cell.biomass().len() != self.models.len() {
            return Err(WorldError::BiomassLength {
                id,
                expected: self.models.len(),
                got: cell.biomass().len(),
            });
        }
        if self.cells.contains(id) {
            return Err(WorldError::DuplicateCell { id });
        }
        let placed = self.grid.put_cell(cell.coord(), id)?;
        cell.set_coord(placed);
        self.cells.insert(cell);
        Ok(id)
    }

    /// Remove the cell from the collection and the grid.
    pub fn remove_cell(&mut self, id: CellId) -> Option<Box<dyn Cell>> {
        let cell = self.cells.remove(id)?;
        self.grid.remove_cell(cell.coord());
        Some(cell)
    }

    /// Move a cell to `to`, returning the voxel it landed on.
    pub fn move_cell(&mut self, id: CellId, to: &Coord) -> Result<Coord, WorldError> {
        let from = self
            .cells
            .get(id)
            .ok_or(WorldError::UnknownCell { id })?
            .coord()
            .clone();
        let dest = self.grid.move_cell(&from, to)?;
        if let Some(cell) = self.cells.get_mut(id) {
            cell.set_coord(dest.clone());
        }
        Ok(dest)
    }

    /// Resize the grid, removing every cell left outside the new bounds.
    ///
    /// Returns the removed cells in the old grid's flat-index order.
    pub fn resize(&mut self, shape: Shape) -> Result<Vec<Box<dyn Cell>>, WorldError> {
        let evicted = self.grid.resize(shape)?;
        Ok(evicted
            .into_iter()
            .filter_map(|id| self.cells.remove(id))
            .collect())
    }

    /// Replace the model array, resizing every cell's biomass in
    /// lock-step.
    ///
    /// A model present in both arrays (by identity) keeps its biomass in
    /// every cell; new models start at zero; removed models' biomass is
    /// discarded.
    pub fn change_models(&mut self, models: Vec<Arc<dyn Model>>) {
        let mapping: Vec<Option<usize>> = models
            .iter()
            .map(|m| self.models.iter().position(|old| same_model(old, m)))
            .collect();
        for cell in self.cells.iter_mut() {
            let old = cell.biomass().to_vec();
            let biomass = mapping
                .iter()
                .map(|slot| slot.and_then(|i| old.get(i).copied()).unwrap_or(0.0))
                .collect();
            cell.set_biomass(biomass);
        }
        self.models = models;
    }

    /// Per-model biomass over all cells.
    pub fn total_biomass(&self) -> Vec<f64> {
        self.cells.total_biomass(self.models.len())
    }
}

/// Grid and cells are deep copies; models are shared; the id allocator
/// is shared so a restored world never reissues an id.
impl Backup for WorldState {
    fn backup(&self) -> Self {
        Self {
            grid: self.grid.backup(),
            cells: self.cells.backup(),
            models: self.models.clone(),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl PartialEq for WorldState {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid
            && self.cells == other.cells
            && self.models.len() == other.models.len()
            && self
                .models
                .iter()
                .zip(&other.models)
                .all(|(a, b)| same_model(a, b))
    }
}

// ── Simulation ─────────────────────────────────────────────────────

/// Everything one run owns: the world, the package driving it, and the
/// global parameters.
///
/// A [`SimulationController`](crate::SimulationController) takes the
/// simulation for the duration of a run and hands it back in the
/// [`RunReport`](crate::RunReport).
pub struct Simulation {
    /// The live world.
    pub world: WorldState,
    /// The package that steps the world.
    pub package: Box<dyn Package>,
    /// Global parameters.
    pub config: SimConfig,
}

impl Simulation {
    /// Bundle a world, package, and configuration.
    pub fn new(world: WorldState, package: Box<dyn Package>, config: SimConfig) -> Self {
        Self {
            world,
            package,
            config,
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("package", &self.package.name())
            .field("config", &self.config)
            .finish()
    }
}

// Compile-time assertion: a simulation can move into the worker thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<Simulation>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::Biomass;
    use colony_grid::EdgeBehavior;
    use smallvec::smallvec;

    #[derive(Debug)]
    struct Species(&'static str);

    impl Model for Species {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[derive(Debug, Clone)]
    struct Colony {
        id: CellId,
        coord: Coord,
        biomass: Vec<f64>,
    }

    impl Biomass for Colony {
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

    impl Cell for Colony {
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

    fn world(edge: EdgeBehavior) -> (WorldState, Vec<Arc<dyn Model>>) {
        let models: Vec<Arc<dyn Model>> = vec![Arc::new(Species("a")), Arc::new(Species("b"))];
        let grid = Grid::new(Shape::square(4, 4).unwrap(), 1, edge, 7);
        (WorldState::new(grid, models.clone()), models)
    }

    fn colony(w: &WorldState, x: i32, y: i32, biomass: Vec<f64>) -> Box<dyn Cell> {
        Box::new(Colony {
            id: w.next_cell_id(),
            coord: smallvec![x, y],
            biomass,
        })
    }

    #[test]
    fn add_cell_occupies_grid() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let c = colony(&w, 1, 2, vec![1.0, 0.5]);
        let id = w.add_cell(c).unwrap();
        assert_eq!(w.grid().cell_at(&smallvec![1, 2]), Some(id));
        assert_eq!(w.total_biomass(), vec![1.0, 0.5]);
    }

    #[test]
    fn add_cell_rejects_wrong_biomass_length() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let c = colony(&w, 0, 0, vec![1.0]);
        assert!(matches!(
            w.add_cell(c),
            Err(WorldError::BiomassLength {
                expected: 2,
                got: 1,
                ..
            })
        ));
        assert!(w.cells().is_empty());
    }

    #[test]
    fn add_cell_wraps_on_torus() {
        let (mut w, _) = world(EdgeBehavior::Wrap);
        let c = colony(&w, -1, 4, vec![1.0, 1.0]);
        let id = w.add_cell(c).unwrap();
        assert_eq!(w.cells().get(id).unwrap().coord(), &Coord::from_slice(&[3, 0]));
    }

    #[test]
    fn occupied_voxel_is_rejected() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let a = colony(&w, 1, 1, vec![1.0, 0.0]);
        w.add_cell(a).unwrap();
        let b = colony(&w, 1, 1, vec![1.0, 0.0]);
        assert!(matches!(
            w.add_cell(b),
            Err(WorldError::Grid(GridError::Occupied { .. }))
        ));
        assert_eq!(w.cells().len(), 1);
    }

    #[test]
    fn move_and_remove_keep_grid_in_sync() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let c = colony(&w, 0, 0, vec![1.0, 0.0]);
        let id = w.add_cell(c).unwrap();
        w.move_cell(id, &smallvec![3, 3]).unwrap();
        assert_eq!(w.grid().cell_at(&smallvec![0, 0]), None);
        assert_eq!(w.grid().cell_at(&smallvec![3, 3]), Some(id));
        let removed = w.remove_cell(id).unwrap();
        assert_eq!(removed.coord(), &Coord::from_slice(&[3, 3]));
        assert_eq!(w.grid().occupied_count(), 0);
        assert_eq!(
            w.move_cell(id, &smallvec![1, 1]),
            Err(WorldError::UnknownCell { id })
        );
    }

    #[test]
    fn resize_drops_evicted_cells_from_collection() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let keep = colony(&w, 1, 1, vec![1.0, 0.0]);
        let keep = w.add_cell(keep).unwrap();
        let gone = colony(&w, 3, 0, vec![1.0, 0.0]);
        let gone = w.add_cell(gone).unwrap();
        let removed = w.resize(Shape::square(2, 2).unwrap()).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id(), gone);
        assert!(w.cells().contains(keep));
        assert!(!w.cells().contains(gone));
        assert_eq!(w.grid().occupied_count(), 1);
    }

    #[test]
    fn change_models_keeps_biomass_by_identity() {
        let (mut w, models) = world(EdgeBehavior::Clamp);
        let c = colony(&w, 0, 0, vec![1.0, 2.0]);
        let id = w.add_cell(c).unwrap();
        let fresh: Arc<dyn Model> = Arc::new(Species("c"));
        w.change_models(vec![Arc::clone(&models[1]), fresh]);
        assert_eq!(w.cells().get(id).unwrap().biomass(), &[2.0, 0.0]);
        assert_eq!(w.models().len(), 2);
        assert_eq!(w.models()[1].name(), "c");
    }

    #[test]
    fn backup_is_independent_but_shares_models_and_ids() {
        let (mut w, _) = world(EdgeBehavior::Clamp);
        let c = colony(&w, 0, 0, vec![1.0, 2.0]);
        let id = w.add_cell(c).unwrap();
        let copy = w.backup();
        assert_eq!(copy, w);

        w.cells_mut().get_mut(id).unwrap().biomass_mut()[0] = 9.0;
        w.grid_mut().set_media(&smallvec![2, 2], &[4.0]).unwrap();
        assert_ne!(copy, w);
        assert_eq!(copy.cells().get(id).unwrap().biomass(), &[1.0, 2.0]);
        assert_eq!(copy.grid().media(&smallvec![2, 2]).unwrap(), &[0.0]);

        let next = copy.next_cell_id();
        assert!(next > id);
        assert!(w.next_cell_id() > next);
    }
}
