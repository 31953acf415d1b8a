//! Grid extents and voxel indexing.

use std::error::Error;
use std::fmt;

use colony_core::Coord;
use smallvec::SmallVec;

/// Errors arising from shape construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// Only 2D and 3D grids exist.
    InvalidRank {
        /// The rank that was requested.
        rank: usize,
    },
    /// An axis had zero extent.
    EmptyAxis {
        /// Index of the empty axis.
        axis: usize,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRank { rank } => write!(f, "grid rank must be 2 or 3, got {rank}"),
            Self::EmptyAxis { axis } => write!(f, "grid axis {axis} has zero extent"),
        }
    }
}

impl Error for ShapeError {}

/// Extents of a 2D `(cols, rows)` or 3D `(cols, rows, layers)` grid.
///
/// Voxels are laid out x-major: the flat index of `[x, y, z]` is
/// `(x * rows + y) * layers + z`, with `layers = 1` in 2D.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    extents: SmallVec<[u32; 3]>,
}

impl Shape {
    /// Build a shape from per-axis extents.
    pub fn new(extents: &[u32]) -> Result<Self, ShapeError> {
        if !(2..=3).contains(&extents.len()) {
            return Err(ShapeError::InvalidRank {
                rank: extents.len(),
            });
        }
        if let Some(axis) = extents.iter().position(|&e| e == 0) {
            return Err(ShapeError::EmptyAxis { axis });
        }
        Ok(Self {
            extents: SmallVec::from_slice(extents),
        })
    }

    /// A 2D shape.
    pub fn square(cols: u32, rows: u32) -> Result<Self, ShapeError> {
        Self::new(&[cols, rows])
    }

    /// A 3D shape.
    pub fn cube(cols: u32, rows: u32, layers: u32) -> Result<Self, ShapeError> {
        Self::new(&[cols, rows, layers])
    }

    /// Number of axes (2 or 3).
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Per-axis extents.
    pub fn extents(&self) -> &[u32] {
        &self.extents
    }

    /// Extent along x.
    pub fn cols(&self) -> u32 {
        self.extents[0]
    }

    /// Extent along y.
    pub fn rows(&self) -> u32 {
        self.extents[1]
    }

    /// Extent along z; 1 for 2D shapes.
    pub fn layers(&self) -> u32 {
        self.extents.get(2).copied().unwrap_or(1)
    }

    /// Total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.extents.iter().map(|&e| e as usize).product()
    }

    /// Whether `coord` has this shape's rank and lies inside it.
    pub fn contains(&self, coord: &Coord) -> bool {
        coord.len() == self.rank()
            && coord
                .iter()
                .zip(self.extents.iter())
                .all(|(&c, &e)| c >= 0 && c < e as i32)
    }

    /// Flat voxel index of an in-bounds coordinate.
    pub fn index_of(&self, coord: &Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        Some(
            coord
                .iter()
                .zip(self.extents.iter())
                .fold(0usize, |acc, (&c, &e)| acc * e as usize + c as usize),
        )
    }

    /// Coordinate of a flat voxel index. `index` must be below
    /// [`voxel_count`](Self::voxel_count).
    pub fn coord_of(&self, mut index: usize) -> Coord {
        let mut coord: Coord = SmallVec::from_elem(0, self.rank());
        for axis in (0..self.rank()).rev() {
            let e = self.extents[axis] as usize;
            coord[axis] = (index % e) as i32;
            index /= e;
        }
        coord
    }

    /// All coordinates in flat-index order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.voxel_count()).map(move |i| self.coord_of(i))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.extents.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("x"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn rejects_bad_rank_and_empty_axis() {
        assert_eq!(Shape::new(&[4]), Err(ShapeError::InvalidRank { rank: 1 }));
        assert_eq!(
            Shape::new(&[1, 2, 3, 4]),
            Err(ShapeError::InvalidRank { rank: 4 })
        );
        assert_eq!(Shape::square(3, 0), Err(ShapeError::EmptyAxis { axis: 1 }));
    }

    #[test]
    fn index_round_trips_in_3d() {
        let s = Shape::cube(3, 4, 5).unwrap();
        assert_eq!(s.voxel_count(), 60);
        for i in 0..s.voxel_count() {
            assert_eq!(s.index_of(&s.coord_of(i)), Some(i));
        }
        assert_eq!(s.index_of(&smallvec![1, 2, 3]), Some((4 + 2) * 5 + 3));
    }

    #[test]
    fn contains_checks_rank() {
        let s = Shape::square(5, 5).unwrap();
        assert!(s.contains(&smallvec![4, 4]));
        assert!(!s.contains(&smallvec![4, 4, 0]));
        assert!(!s.contains(&smallvec![5, 0]));
        assert_eq!(s.layers(), 1);
        assert_eq!(format!("{s}"), "5x5");
    }
}
