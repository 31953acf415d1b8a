//! Strongly-typed identifiers and the [`Coord`] type alias.

use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a cell within a simulation world.
///
/// Issued by a [`CellIdAllocator`]; never reused within the lifetime of
/// that allocator, even after the cell it named has been removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CellId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Monotonic issuer of [`CellId`] values.
///
/// One allocator is owned by each simulation context and handed to
/// whatever creates cells (layout loaders, packages spawning daughter
/// cells). Thread-safe, so it can be shared behind an `Arc` with the
/// cycle worker.
#[derive(Debug)]
pub struct CellIdAllocator {
    next: AtomicU64,
}

impl CellIdAllocator {
    /// Create an allocator whose first issued id is `CellId(0)`.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create an allocator whose first issued id is `CellId(first)`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Issue a fresh id. Each call returns a value never returned before
    /// by this allocator.
    pub fn next_id(&self) -> CellId {
        CellId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> CellId {
        CellId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for CellIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Discrete simulation cycle counter.
///
/// Cycle 0 is the state before the first step; the controller's first
/// step is cycle 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CycleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A voxel coordinate, `[x, y]` on 2D grids and `[x, y, z]` on 3D grids.
///
/// Uses `SmallVec<[i32; 3]>` so both ranks stay on the stack. Components
/// are signed because callers routinely probe neighbours at `-1` and at
/// `dim`; the grid decides what those mean under its edge behavior.
pub type Coord = SmallVec<[i32; 3]>;
