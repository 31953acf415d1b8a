//! Integration test: grid resize preserves the overlap and reports
//! evicted cells.

use colony_core::{Backup, CellId, Coord};
use colony_grid::{EdgeBehavior, Grid, Shape};
use smallvec::smallvec;

/// A 10x10 grid with distinct media per voxel, a barrier diagonal, and a
/// cell on every voxel whose x and y are both even.
fn populated_grid() -> Grid {
    let mut g = Grid::new(Shape::square(10, 10).unwrap(), 2, EdgeBehavior::Clamp, 1);
    for x in 0..10 {
        for y in 0..10 {
            let c: Coord = smallvec![x, y];
            g.set_media(&c, &[f64::from(x * 10 + y), 1.0]).unwrap();
            if x == y {
                g.set_barrier(&c, true).unwrap();
            }
            if x % 2 == 0 && y % 2 == 0 {
                g.put_cell(&c, CellId((x * 10 + y) as u64)).unwrap();
            }
        }
    }
    g
}

#[test]
fn shrink_preserves_overlap_and_evicts_outside_cells() {
    let mut g = populated_grid();
    let before = g.backup();
    g.set_refresh_point(&smallvec![7, 7], vec![1.0, 1.0]).unwrap();
    g.set_refresh_point(&smallvec![2, 2], vec![1.0, 1.0]).unwrap();

    let evicted = g.resize(Shape::square(5, 5).unwrap()).unwrap();

    for x in 0..5 {
        for y in 0..5 {
            let c: Coord = smallvec![x, y];
            assert_eq!(g.media(&c).unwrap(), before.media(&c).unwrap());
            assert_eq!(g.is_barrier(&c), before.is_barrier(&c));
            assert_eq!(g.cell_at(&c), before.cell_at(&c));
        }
    }

    let mut expected: Vec<CellId> = before
        .occupied()
        .filter(|(c, _)| c[0] >= 5 || c[1] >= 5)
        .map(|(_, id)| id)
        .collect();
    expected.sort();
    let mut got = evicted.clone();
    got.sort();
    assert_eq!(got, expected);
    assert_eq!(g.occupied_count(), 9);
    assert!(g.refresh_point(&smallvec![2, 2]).is_some());
    assert_eq!(g.refresh_points().count(), 1);
    assert!(!g.is_on_grid(&smallvec![5, 0]));
}

#[test]
fn grow_preserves_everything_and_defaults_new_voxels() {
    let mut g = populated_grid();
    let before = g.backup();

    let evicted = g.resize(Shape::square(15, 15).unwrap()).unwrap();
    assert!(evicted.is_empty());

    for x in 0..15 {
        for y in 0..15 {
            let c: Coord = smallvec![x, y];
            if x < 10 && y < 10 {
                assert_eq!(g.media(&c).unwrap(), before.media(&c).unwrap());
                assert_eq!(g.is_barrier(&c), before.is_barrier(&c));
                assert_eq!(g.cell_at(&c), before.cell_at(&c));
            } else {
                assert_eq!(g.media(&c).unwrap(), &[0.0, 0.0]);
                assert!(!g.is_barrier(&c));
                assert_eq!(g.cell_at(&c), None);
            }
        }
    }
}
