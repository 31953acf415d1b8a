//! The [`Grid`]: per-voxel media, barriers, occupancy, and overrides.

use std::fmt;

use colony_core::{Backup, CellId, Coord, GridError};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::edge::EdgeBehavior;
use crate::points::{add_clamped, pin, RefreshPoint, StaticMedia, StaticPoint};
use crate::sampling::sample_population;
use crate::shape::Shape;

/// Spatial world state for one simulation.
///
/// Owns the media tensor (`voxel_count * num_media` concentrations, all
/// non-negative), the barrier mask, single-cell occupancy, and the
/// refresh/static rules applied every cycle. Every mutator validates its
/// arguments and reports [`GridError`] instead of panicking; off-grid
/// coordinates are never stored.
///
/// Cloning (or [`Backup::backup`]) yields a fully independent copy,
/// including the RNG state, so a restored grid replays the same draws.
#[derive(Clone)]
pub struct Grid {
    shape: Shape,
    edge: EdgeBehavior,
    num_media: usize,
    media: Vec<f64>,
    barrier: Vec<bool>,
    occupancy: Vec<Option<CellId>>,
    refresh_points: IndexMap<Coord, RefreshPoint>,
    static_points: IndexMap<Coord, StaticPoint>,
    global_refresh: Vec<f64>,
    global_static: StaticMedia,
    rng: ChaCha8Rng,
}

impl Grid {
    /// Create an empty grid: zero media, no barriers, no cells, no
    /// refresh or static rules.
    pub fn new(shape: Shape, num_media: usize, edge: EdgeBehavior, seed: u64) -> Self {
        let voxels = shape.voxel_count();
        Self {
            shape,
            edge,
            num_media,
            media: vec![0.0; voxels * num_media],
            barrier: vec![false; voxels],
            occupancy: vec![None; voxels],
            refresh_points: IndexMap::new(),
            static_points: IndexMap::new(),
            global_refresh: vec![0.0; num_media],
            global_static: StaticMedia::none(num_media),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    // ── Geometry ────────────────────────────────────────────────

    /// The grid's extents.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// 2 or 3.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Number of media components per voxel.
    pub fn num_media(&self) -> usize {
        self.num_media
    }

    /// Current edge behavior.
    pub fn edge(&self) -> EdgeBehavior {
        self.edge
    }

    /// Switch between toroidal and clamped edges.
    pub fn set_edge(&mut self, edge: EdgeBehavior) {
        self.edge = edge;
    }

    /// Whether `coord` lies inside the grid, ignoring edge behavior.
    pub fn is_on_grid(&self, coord: &Coord) -> bool {
        self.shape.contains(coord)
    }

    /// Map `coord` into the grid for placement: wrap or clamp each axis
    /// per the edge behavior.
    pub fn adjust(&self, coord: &Coord) -> Result<Coord, GridError> {
        self.check_rank(coord.len())?;
        Ok(coord
            .iter()
            .zip(self.shape.extents())
            .map(|(&c, &e)| self.edge.adjust(c, e))
            .collect())
    }

    /// Resolve `coord` to a stored voxel: wrap under a toroidal edge,
    /// reject anything off-grid under a clamped one.
    pub fn resolve(&self, coord: &Coord) -> Result<Coord, GridError> {
        self.check_rank(coord.len())?;
        coord
            .iter()
            .zip(self.shape.extents())
            .map(|(&c, &e)| self.edge.resolve(c, e))
            .collect::<Option<Coord>>()
            .ok_or_else(|| GridError::Bounds {
                coord: coord.clone(),
            })
    }

    fn check_rank(&self, got: usize) -> Result<(), GridError> {
        if got != self.rank() {
            return Err(GridError::Params {
                expected: self.rank(),
                got,
            });
        }
        Ok(())
    }

    fn check_media_len(&self, got: usize) -> Result<(), GridError> {
        if got != self.num_media {
            return Err(GridError::Params {
                expected: self.num_media,
                got,
            });
        }
        Ok(())
    }

    fn voxel(&self, coord: &Coord) -> Result<usize, GridError> {
        let resolved = self.resolve(coord)?;
        self.shape
            .index_of(&resolved)
            .ok_or_else(|| GridError::Bounds {
                coord: coord.clone(),
            })
    }

    fn media_range(&self, voxel: usize) -> std::ops::Range<usize> {
        voxel * self.num_media..(voxel + 1) * self.num_media
    }

    // ── Barriers ────────────────────────────────────────────────

    /// Whether `coord` is a barrier. Coordinates that do not resolve to a
    /// voxel always are.
    pub fn is_barrier(&self, coord: &Coord) -> bool {
        match self.voxel(coord) {
            Ok(v) => self.barrier[v],
            Err(_) => true,
        }
    }

    /// Set or clear the barrier flag at `coord`.
    pub fn set_barrier(&mut self, coord: &Coord, barrier: bool) -> Result<(), GridError> {
        let v = self.voxel(coord)?;
        self.barrier[v] = barrier;
        Ok(())
    }

    /// The barrier mask in flat-index order.
    pub fn barrier_data(&self) -> &[bool] {
        &self.barrier
    }

    // ── Media ───────────────────────────────────────────────────

    /// Media concentrations at `coord`.
    pub fn media(&self, coord: &Coord) -> Result<&[f64], GridError> {
        let v = self.voxel(coord)?;
        Ok(&self.media[self.media_range(v)])
    }

    /// Add `delta` to the media at `coord`, flooring each component at 0.
    ///
    /// # Errors
    ///
    /// [`GridError::Params`] if `delta` does not have one entry per
    /// medium, [`GridError::Bounds`] if `coord` is off the grid.
    pub fn change_media(&mut self, coord: &Coord, delta: &[f64]) -> Result<(), GridError> {
        self.check_media_len(delta.len())?;
        let v = self.voxel(coord)?;
        let range = self.media_range(v);
        add_clamped(&mut self.media[range], delta);
        Ok(())
    }

    /// Assign the media at `coord`, flooring each component at 0.
    ///
    /// Validates like [`change_media`](Self::change_media).
    pub fn set_media(&mut self, coord: &Coord, values: &[f64]) -> Result<(), GridError> {
        self.check_media_len(values.len())?;
        let v = self.voxel(coord)?;
        let range = self.media_range(v);
        for (m, &val) in self.media[range].iter_mut().zip(values) {
            *m = val.max(0.0);
        }
        Ok(())
    }

    /// The whole media tensor, `num_media` entries per voxel in
    /// flat-index order.
    pub fn media_data(&self) -> &[f64] {
        &self.media
    }

    /// Replace the whole media tensor, as a diffusion solver does after
    /// computing the next state. Negative entries are floored at 0.
    pub fn replace_media(&mut self, mut data: Vec<f64>) -> Result<(), GridError> {
        if data.len() != self.media.len() {
            return Err(GridError::Params {
                expected: self.media.len(),
                got: data.len(),
            });
        }
        for m in &mut data {
            *m = m.max(0.0);
        }
        self.media = data;
        Ok(())
    }

    /// Multiply every media entry by `factor`, flooring at 0.
    pub fn scale_media(&mut self, factor: f64) {
        for m in &mut self.media {
            *m = (*m * factor).max(0.0);
        }
    }

    /// Per-medium sum over all voxels.
    pub fn total_media(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.num_media];
        if self.num_media == 0 {
            return totals;
        }
        for voxel in self.media.chunks_exact(self.num_media) {
            for (t, &m) in totals.iter_mut().zip(voxel) {
                *t += m;
            }
        }
        totals
    }

    // ── Refresh and static rules ────────────────────────────────

    /// The grid-wide per-cycle refresh vector.
    pub fn global_refresh(&self) -> &[f64] {
        &self.global_refresh
    }

    /// Set the grid-wide per-cycle refresh vector.
    pub fn set_global_refresh(&mut self, amounts: Vec<f64>) -> Result<(), GridError> {
        self.check_media_len(amounts.len())?;
        self.global_refresh = amounts;
        Ok(())
    }

    /// The grid-wide static media.
    pub fn global_static(&self) -> &StaticMedia {
        &self.global_static
    }

    /// Pin the masked media to `values` in every voxel.
    pub fn set_global_static(&mut self, values: Vec<f64>, mask: Vec<bool>) -> Result<(), GridError> {
        self.check_media_len(values.len())?;
        self.check_media_len(mask.len())?;
        self.global_static = StaticMedia { values, mask };
        Ok(())
    }

    /// Register (or replace) the refresh rule at `coord`.
    ///
    /// The stored rule is keyed by the resolved coordinate.
    pub fn set_refresh_point(&mut self, coord: &Coord, amounts: Vec<f64>) -> Result<(), GridError> {
        self.check_media_len(amounts.len())?;
        let coord = self.resolve(coord)?;
        self.refresh_points
            .insert(coord.clone(), RefreshPoint { coord, amounts });
        Ok(())
    }

    /// Remove the refresh rule at `coord`, returning it.
    pub fn remove_refresh_point(&mut self, coord: &Coord) -> Option<RefreshPoint> {
        let coord = self.resolve(coord).ok()?;
        self.refresh_points.shift_remove(&coord)
    }

    /// The refresh rule at `coord`, if any.
    pub fn refresh_point(&self, coord: &Coord) -> Option<&RefreshPoint> {
        let coord = self.resolve(coord).ok()?;
        self.refresh_points.get(&coord)
    }

    /// All refresh rules in insertion order.
    pub fn refresh_points(&self) -> impl Iterator<Item = &RefreshPoint> {
        self.refresh_points.values()
    }

    /// Register (or replace) the static rule at `coord`.
    pub fn set_static_point(
        &mut self,
        coord: &Coord,
        values: Vec<f64>,
        mask: Vec<bool>,
    ) -> Result<(), GridError> {
        self.check_media_len(values.len())?;
        self.check_media_len(mask.len())?;
        let coord = self.resolve(coord)?;
        self.static_points.insert(
            coord.clone(),
            StaticPoint {
                coord,
                values,
                mask,
            },
        );
        Ok(())
    }

    /// Remove the static rule at `coord`, returning it.
    pub fn remove_static_point(&mut self, coord: &Coord) -> Option<StaticPoint> {
        let coord = self.resolve(coord).ok()?;
        self.static_points.shift_remove(&coord)
    }

    /// The static rule at `coord`, if any.
    pub fn static_point(&self, coord: &Coord) -> Option<&StaticPoint> {
        let coord = self.resolve(coord).ok()?;
        self.static_points.get(&coord)
    }

    /// All static rules in insertion order.
    pub fn static_points(&self) -> impl Iterator<Item = &StaticPoint> {
        self.static_points.values()
    }

    /// Apply one cycle of refresh: the global vector to every voxel, then
    /// each refresh point on top at its voxel. Every step floors at 0.
    pub fn refresh_media(&mut self) {
        if self.num_media == 0 {
            return;
        }
        if self.global_refresh.iter().any(|&a| a != 0.0) {
            for voxel in self.media.chunks_exact_mut(self.num_media) {
                add_clamped(voxel, &self.global_refresh);
            }
        }
        for point in self.refresh_points.values() {
            if let Some(v) = self.shape.index_of(&point.coord) {
                let range = v * self.num_media..(v + 1) * self.num_media;
                add_clamped(&mut self.media[range], &point.amounts);
            }
        }
    }

    /// Pin every static medium: the global mask in every voxel, then each
    /// static point's mask at its voxel.
    ///
    /// Run after [`refresh_media`](Self::refresh_media) so pinned values
    /// win for the cycle.
    pub fn apply_static_media(&mut self) {
        if self.num_media == 0 {
            return;
        }
        if self.global_static.is_active() {
            for voxel in self.media.chunks_exact_mut(self.num_media) {
                pin(voxel, &self.global_static.values, &self.global_static.mask);
            }
        }
        for point in self.static_points.values() {
            if let Some(v) = self.shape.index_of(&point.coord) {
                let range = v * self.num_media..(v + 1) * self.num_media;
                pin(&mut self.media[range], &point.values, &point.mask);
            }
        }
    }

    // ── Occupancy ───────────────────────────────────────────────

    /// The cell at `coord`, if any.
    pub fn cell_at(&self, coord: &Coord) -> Option<CellId> {
        let v = self.voxel(coord).ok()?;
        self.occupancy[v]
    }

    /// Place cell `id` at `coord` and return the voxel it landed on.
    ///
    /// Under a toroidal edge the coordinate is wrapped first. Placing a
    /// cell where it already is succeeds.
    ///
    /// # Errors
    ///
    /// [`GridError::Bounds`] off-grid, [`GridError::Occupied`] if a
    /// different cell holds the voxel.
    pub fn put_cell(&mut self, coord: &Coord, id: CellId) -> Result<Coord, GridError> {
        let resolved = self.resolve(coord)?;
        let v = self.voxel(&resolved)?;
        match self.occupancy[v] {
            Some(occupant) if occupant != id => Err(GridError::Occupied {
                coord: resolved,
                occupant,
            }),
            _ => {
                self.occupancy[v] = Some(id);
                Ok(resolved)
            }
        }
    }

    /// Clear the voxel at `coord`, returning the cell that was there.
    pub fn remove_cell(&mut self, coord: &Coord) -> Option<CellId> {
        let v = self.voxel(coord).ok()?;
        self.occupancy[v].take()
    }

    /// Move whatever is at `from` to `to`, returning the resolved
    /// destination. Fails without changing anything if `to` is off-grid
    /// or occupied.
    pub fn move_cell(&mut self, from: &Coord, to: &Coord) -> Result<Coord, GridError> {
        let src = self.voxel(from)?;
        let id = self.occupancy[src].ok_or_else(|| GridError::Bounds {
            coord: from.clone(),
        })?;
        let dest = self.resolve(to)?;
        let dst = self.voxel(&dest)?;
        if src == dst {
            return Ok(dest);
        }
        if let Some(occupant) = self.occupancy[dst] {
            return Err(GridError::Occupied {
                coord: dest,
                occupant,
            });
        }
        self.occupancy[src] = None;
        self.occupancy[dst] = Some(id);
        Ok(dest)
    }

    /// Every occupied voxel with its cell, in flat-index order.
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, CellId)> + '_ {
        self.occupancy
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|id| (self.shape.coord_of(i), id)))
    }

    /// Number of occupied voxels.
    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|s| s.is_some()).count()
    }

    // ── Resize ──────────────────────────────────────────────────

    /// Reallocate every tensor at `new_shape`.
    ///
    /// Voxels inside both the old and new shape keep their media, barrier
    /// flag, and occupant. New voxels start empty. Refresh and static
    /// rules outside the new shape are dropped.
    ///
    /// Returns the cells that stood outside the new bounds, in flat-index
    /// order of the old grid. They are no longer on the grid; the caller
    /// must remove them from its cell collection.
    ///
    /// # Errors
    ///
    /// [`GridError::Params`] if `new_shape` has a different rank.
    pub fn resize(&mut self, new_shape: Shape) -> Result<Vec<CellId>, GridError> {
        self.check_rank(new_shape.rank())?;

        let voxels = new_shape.voxel_count();
        let mut media = vec![0.0; voxels * self.num_media];
        let mut barrier = vec![false; voxels];
        let mut occupancy = vec![None; voxels];
        let mut evicted = Vec::new();

        for old in 0..self.shape.voxel_count() {
            let coord = self.shape.coord_of(old);
            match new_shape.index_of(&coord) {
                Some(new) => {
                    let n = self.num_media;
                    media[new * n..(new + 1) * n].copy_from_slice(&self.media[old * n..(old + 1) * n]);
                    barrier[new] = self.barrier[old];
                    occupancy[new] = self.occupancy[old];
                }
                None => {
                    if let Some(id) = self.occupancy[old] {
                        evicted.push(id);
                    }
                }
            }
        }

        self.refresh_points.retain(|c, _| new_shape.contains(c));
        self.static_points.retain(|c, _| new_shape.contains(c));
        self.media = media;
        self.barrier = barrier;
        self.occupancy = occupancy;
        self.shape = new_shape;
        Ok(evicted)
    }

    // ── Sampling ────────────────────────────────────────────────

    /// Draw an event count from the grid's RNG; see
    /// [`sample_population`].
    pub fn sample_population(&mut self, population: u64, prob: f64) -> u64 {
        sample_population(&mut self.rng, population, prob)
    }

    /// Mutable access to the grid's RNG for package-level draws.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Restart the RNG stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

impl Backup for Grid {
    fn backup(&self) -> Self {
        self.clone()
    }
}

/// Equality over world content: shape, edge, media, barriers, occupancy,
/// and rules. RNG position is not compared.
impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.edge == other.edge
            && self.num_media == other.num_media
            && self.media == other.media
            && self.barrier == other.barrier
            && self.occupancy == other.occupancy
            && self.refresh_points == other.refresh_points
            && self.static_points == other.static_points
            && self.global_refresh == other.global_refresh
            && self.global_static == other.global_static
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("shape", &self.shape)
            .field("edge", &self.edge)
            .field("num_media", &self.num_media)
            .field("occupied", &self.occupied_count())
            .field("refresh_points", &self.refresh_points.len())
            .field("static_points", &self.static_points.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use smallvec::smallvec;

    fn grid(edge: EdgeBehavior) -> Grid {
        Grid::new(Shape::square(10, 10).unwrap(), 2, edge, 7)
    }

    #[test]
    fn off_grid_is_barrier_and_bounds_error_when_clamped() {
        let mut g = grid(EdgeBehavior::Clamp);
        let off: Coord = smallvec![10, 3];
        assert!(!g.is_on_grid(&off));
        assert!(g.is_barrier(&off));
        assert_eq!(
            g.change_media(&off, &[1.0, 1.0]),
            Err(GridError::Bounds { coord: off.clone() })
        );
        assert!(matches!(g.set_media(&off, &[1.0, 1.0]), Err(GridError::Bounds { .. })));
        assert!(matches!(g.put_cell(&off, CellId(1)), Err(GridError::Bounds { .. })));
        assert!(matches!(g.set_barrier(&off, true), Err(GridError::Bounds { .. })));
    }

    #[test]
    fn toroidal_mutators_wrap() {
        let mut g = grid(EdgeBehavior::Wrap);
        g.change_media(&smallvec![-1, 10], &[2.0, 0.0]).unwrap();
        assert_eq!(g.media(&smallvec![9, 0]).unwrap(), &[2.0, 0.0]);
        let placed = g.put_cell(&smallvec![10, -1], CellId(4)).unwrap();
        assert_eq!(placed.as_slice(), &[0, 9]);
        assert_eq!(g.cell_at(&smallvec![0, 9]), Some(CellId(4)));
    }

    #[test]
    fn wrong_length_is_params_error_at_valid_coord() {
        let mut g = grid(EdgeBehavior::Clamp);
        let c: Coord = smallvec![1, 1];
        assert_eq!(
            g.change_media(&c, &[1.0]),
            Err(GridError::Params {
                expected: 2,
                got: 1
            })
        );
        assert!(matches!(
            g.set_media(&c, &[1.0, 2.0, 3.0]),
            Err(GridError::Params { .. })
        ));
        assert!(matches!(
            g.media(&smallvec![1, 1, 1]),
            Err(GridError::Params { .. })
        ));
    }

    #[test]
    fn change_media_clamps_at_zero() {
        let mut g = grid(EdgeBehavior::Clamp);
        let c: Coord = smallvec![2, 2];
        g.set_media(&c, &[1.0, 1.0]).unwrap();
        g.change_media(&c, &[-5.0, 0.5]).unwrap();
        assert_eq!(g.media(&c).unwrap(), &[0.0, 1.5]);
        g.set_media(&c, &[-1.0, 3.0]).unwrap();
        assert_eq!(g.media(&c).unwrap(), &[0.0, 3.0]);
    }

    #[test]
    fn refresh_adds_global_then_point() {
        let mut g = grid(EdgeBehavior::Clamp);
        g.set_global_refresh(vec![0.5, 0.0]).unwrap();
        g.set_refresh_point(&smallvec![3, 4], vec![1.0, 2.0]).unwrap();
        g.refresh_media();
        assert_eq!(g.media(&smallvec![3, 4]).unwrap(), &[1.5, 2.0]);
        assert_eq!(g.media(&smallvec![0, 0]).unwrap(), &[0.5, 0.0]);
    }

    #[test]
    fn static_pin_wins_over_refresh() {
        let mut g = grid(EdgeBehavior::Clamp);
        let c: Coord = smallvec![1, 1];
        g.set_refresh_point(&c, vec![5.0, 5.0]).unwrap();
        g.set_static_point(&c, vec![2.0, 0.0], vec![true, false])
            .unwrap();
        g.set_global_static(vec![0.0, 7.0], vec![false, true]).unwrap();
        g.refresh_media();
        g.apply_static_media();
        assert_eq!(g.media(&c).unwrap(), &[2.0, 7.0]);
        assert_eq!(g.media(&smallvec![0, 0]).unwrap(), &[0.0, 7.0]);
    }

    #[test]
    fn occupancy_is_single_cell() {
        let mut g = grid(EdgeBehavior::Clamp);
        let c: Coord = smallvec![5, 5];
        g.put_cell(&c, CellId(1)).unwrap();
        g.put_cell(&c, CellId(1)).unwrap();
        assert_eq!(
            g.put_cell(&c, CellId(2)),
            Err(GridError::Occupied {
                coord: c.clone(),
                occupant: CellId(1)
            })
        );
        assert_eq!(g.remove_cell(&c), Some(CellId(1)));
        assert_eq!(g.cell_at(&c), None);
    }

    #[test]
    fn move_cell_refuses_occupied_destination() {
        let mut g = grid(EdgeBehavior::Clamp);
        g.put_cell(&smallvec![0, 0], CellId(1)).unwrap();
        g.put_cell(&smallvec![0, 1], CellId(2)).unwrap();
        assert!(matches!(
            g.move_cell(&smallvec![0, 0], &smallvec![0, 1]),
            Err(GridError::Occupied { .. })
        ));
        let dest = g.move_cell(&smallvec![0, 0], &smallvec![4, 4]).unwrap();
        assert_eq!(dest.as_slice(), &[4, 4]);
        assert_eq!(g.cell_at(&smallvec![0, 0]), None);
        assert_eq!(g.cell_at(&smallvec![4, 4]), Some(CellId(1)));
    }

    #[test]
    fn backup_is_independent() {
        let mut g = grid(EdgeBehavior::Clamp);
        g.set_media(&smallvec![1, 1], &[1.0, 1.0]).unwrap();
        let mut snap = g.backup();
        g.set_media(&smallvec![1, 1], &[3.0, 3.0]).unwrap();
        g.set_barrier(&smallvec![2, 2], true).unwrap();
        assert_eq!(snap.media(&smallvec![1, 1]).unwrap(), &[1.0, 1.0]);
        assert!(!snap.is_barrier(&smallvec![2, 2]));
        snap.set_media(&smallvec![0, 0], &[9.0, 9.0]).unwrap();
        assert_eq!(g.media(&smallvec![0, 0]).unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn backup_replays_the_same_draws() {
        let mut g = grid(EdgeBehavior::Clamp);
        let mut snap = g.backup();
        let a: Vec<u64> = (0..8).map(|_| g.sample_population(1_000, 0.3)).collect();
        let b: Vec<u64> = (0..8).map(|_| snap.sample_population(1_000, 0.3)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn resize_rejects_rank_change() {
        let mut g = grid(EdgeBehavior::Clamp);
        assert!(matches!(
            g.resize(Shape::cube(10, 10, 2).unwrap()),
            Err(GridError::Params { .. })
        ));
    }

    #[test]
    fn three_d_grid_indexes_layers() {
        let mut g = Grid::new(Shape::cube(4, 4, 3).unwrap(), 1, EdgeBehavior::Wrap, 0);
        g.change_media(&smallvec![1, 2, -1], &[4.0]).unwrap();
        assert_eq!(g.media(&smallvec![1, 2, 2]).unwrap(), &[4.0]);
        assert_eq!(g.total_media(), vec![4.0]);
    }

    proptest! {
        #[test]
        fn media_never_negative(ops in prop::collection::vec(
            (0i32..10, 0i32..10, -5.0f64..5.0, -5.0f64..5.0, 0u8..4), 1..60)
        ) {
            let mut g = grid(EdgeBehavior::Clamp);
            g.set_global_refresh(vec![-0.5, 0.25]).unwrap();
            for (x, y, a, b, op) in ops {
                let c: Coord = smallvec![x, y];
                match op {
                    0 => g.change_media(&c, &[a, b]).unwrap(),
                    1 => g.set_media(&c, &[a, b]).unwrap(),
                    2 => g.refresh_media(),
                    _ => g.scale_media(a),
                }
                prop_assert!(g.media_data().iter().all(|&m| m >= 0.0));
            }
        }
    }
}
