//! Capability traits the core requires from simulation packages.
//!
//! The core never looks inside a cell or a model. It needs exactly three
//! capabilities: something it can [`run`](Runnable::run) once per cycle,
//! something that carries a per-model [`Biomass`] vector, and something
//! it can [`backup`](Backup::backup) into an independent deep copy.

use std::fmt;

use crate::error::PackageError;
use crate::id::{CellId, Coord, CycleId};

/// A behavior unit advanced once per cycle.
///
/// Implemented by simulation packages; the engine fixes `State` to its
/// world type.
pub trait Runnable {
    /// The state this unit mutates when it runs.
    type State: ?Sized;

    /// Advance `state` by one cycle.
    ///
    /// A returned error is reported for this cycle only; it does not stop
    /// the caller from running the next cycle.
    fn run(&mut self, state: &mut Self::State, cycle: CycleId) -> Result<(), PackageError>;
}

/// Per-model biomass carried by a cell.
///
/// The vector is index-aligned with the world's model array: entry `i`
/// is the biomass of the species described by model `i`.
pub trait Biomass {
    /// Current biomass, one entry per model.
    fn biomass(&self) -> &[f64];

    /// Mutable access to the biomass entries. Length is fixed; use
    /// [`set_biomass`](Self::set_biomass) to change it.
    fn biomass_mut(&mut self) -> &mut [f64];

    /// Replace the biomass vector, possibly with a different length.
    ///
    /// Only the world's model-change operation calls this, so that every
    /// cell's vector changes length in lock-step with the model array.
    fn set_biomass(&mut self, biomass: Vec<f64>);

    /// Sum over all models.
    fn total_biomass(&self) -> f64 {
        self.biomass().iter().sum()
    }

    /// Multiply every entry by `factor`, flooring at zero.
    fn scale_biomass(&mut self, factor: f64) {
        for b in self.biomass_mut() {
            *b = (*b * factor).max(0.0);
        }
    }
}

/// Independent deep copy.
///
/// Unlike `Clone`, a backup promises that no interior storage is shared
/// with the source: mutating either side never shows through the other.
pub trait Backup: Sized {
    /// Produce the deep copy.
    fn backup(&self) -> Self;
}

/// A spatially placed population of one or more species.
///
/// Overlapping species at one voxel live inside a single cell's biomass
/// vector; the grid never holds two cells at the same voxel.
pub trait Cell: Biomass + Send + fmt::Debug {
    /// The cell's unique id.
    fn id(&self) -> CellId;

    /// The voxel the cell occupies.
    fn coord(&self) -> &Coord;

    /// Move the cell's recorded position. The world keeps the grid's
    /// occupancy in sync; packages should go through it.
    fn set_coord(&mut self, coord: Coord);

    /// Boxed deep copy, used by [`Backup`] for `Box<dyn Cell>`.
    fn duplicate(&self) -> Box<dyn Cell>;
}

impl Backup for Box<dyn Cell> {
    fn backup(&self) -> Self {
        self.duplicate()
    }
}

/// Opaque per-species behavior description.
///
/// Models are immutable once loaded and shared by `Arc` between the live
/// world and its snapshots. Only their position in the model array is
/// meaningful to the core.
pub trait Model: Send + Sync + fmt::Debug {
    /// Display name, used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[derive(Debug, Clone)]
    struct Blob {
        id: CellId,
        coord: Coord,
        biomass: Vec<f64>,
    }

    impl Biomass for Blob {
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

    impl Cell for Blob {
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

    #[test]
    fn boxed_backup_is_independent() {
        let original: Box<dyn Cell> = Box::new(Blob {
            id: CellId(3),
            coord: smallvec![1, 2],
            biomass: vec![1.0, 2.0],
        });
        let mut copy = original.backup();
        copy.biomass_mut()[0] = 9.0;
        assert_eq!(original.biomass(), &[1.0, 2.0]);
        assert_eq!(copy.biomass(), &[9.0, 2.0]);
        assert_eq!(copy.id(), CellId(3));
    }

    #[test]
    fn scale_biomass_floors_at_zero() {
        let mut b = Blob {
            id: CellId(0),
            coord: smallvec![0, 0],
            biomass: vec![2.0, 4.0],
        };
        b.scale_biomass(0.5);
        assert_eq!(b.biomass(), &[1.0, 2.0]);
        b.scale_biomass(-1.0);
        assert_eq!(b.biomass(), &[0.0, 0.0]);
        assert_eq!(b.total_biomass(), 0.0);
    }
}
