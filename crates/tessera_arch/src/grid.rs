//! The device grid: which kind of block sits at each location.

use crate::types::BlockKind;
use serde::{Deserialize, Serialize};
use tessera_common::GridLoc;

/// The rectangular device grid.
///
/// Logic clusters occupy the interior `(1..=nx, 1..=ny)`; the four edges are
/// IO locations; the four corners hold nothing. Channel `x` at row `j` runs
/// above the blocks at `y == j`, channel `y` at column `i` runs to the right
/// of the blocks at `x == i`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid {
    nx: i32,
    ny: i32,
}

impl Grid {
    /// Creates a grid with `nx` cluster columns and `ny` cluster rows.
    pub fn new(nx: i32, ny: i32) -> Self {
        assert!(nx >= 1 && ny >= 1, "grid must hold at least one cluster");
        Self { nx, ny }
    }

    /// Number of cluster columns.
    pub fn nx(&self) -> i32 {
        self.nx
    }

    /// Number of cluster rows.
    pub fn ny(&self) -> i32 {
        self.ny
    }

    /// The larger of the two cluster dimensions (long lines span this).
    pub fn max_dim(&self) -> i32 {
        self.nx.max(self.ny)
    }

    /// Returns `true` if `loc` lies inside the bordered grid
    /// `(0..=nx+1, 0..=ny+1)`.
    pub fn contains(&self, loc: GridLoc) -> bool {
        (0..=self.nx + 1).contains(&loc.x) && (0..=self.ny + 1).contains(&loc.y)
    }

    /// The kind of block at `loc`.
    ///
    /// Locations outside the bordered grid are reported as
    /// [`BlockKind::Illegal`], as are the four corners.
    pub fn block_kind_at(&self, loc: GridLoc) -> BlockKind {
        if !self.contains(loc) {
            return BlockKind::Illegal;
        }
        let x_edge = loc.x == 0 || loc.x == self.nx + 1;
        let y_edge = loc.y == 0 || loc.y == self.ny + 1;
        match (x_edge, y_edge) {
            (true, true) => BlockKind::Illegal,
            (false, false) => BlockKind::Clb,
            _ => BlockKind::Io,
        }
    }

    /// Iterates over every location of the bordered grid in column-major
    /// order, matching the node-index ordering of the RR-graph.
    pub fn locations(&self) -> impl Iterator<Item = GridLoc> + '_ {
        (0..=self.nx + 1)
            .flat_map(move |x| (0..=self.ny + 1).map(move |y| GridLoc::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_is_clb() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.block_kind_at(GridLoc::new(1, 1)), BlockKind::Clb);
        assert_eq!(grid.block_kind_at(GridLoc::new(4, 3)), BlockKind::Clb);
    }

    #[test]
    fn edges_are_io() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.block_kind_at(GridLoc::new(0, 2)), BlockKind::Io);
        assert_eq!(grid.block_kind_at(GridLoc::new(5, 1)), BlockKind::Io);
        assert_eq!(grid.block_kind_at(GridLoc::new(2, 0)), BlockKind::Io);
        assert_eq!(grid.block_kind_at(GridLoc::new(3, 4)), BlockKind::Io);
    }

    #[test]
    fn corners_are_illegal() {
        let grid = Grid::new(4, 3);
        for loc in [
            GridLoc::new(0, 0),
            GridLoc::new(0, 4),
            GridLoc::new(5, 0),
            GridLoc::new(5, 4),
        ] {
            assert_eq!(grid.block_kind_at(loc), BlockKind::Illegal);
        }
    }

    #[test]
    fn outside_is_illegal() {
        let grid = Grid::new(2, 2);
        assert_eq!(grid.block_kind_at(GridLoc::new(-1, 1)), BlockKind::Illegal);
        assert_eq!(grid.block_kind_at(GridLoc::new(1, 9)), BlockKind::Illegal);
    }

    #[test]
    fn location_count() {
        let grid = Grid::new(3, 2);
        assert_eq!(grid.locations().count(), 5 * 4);
    }

    #[test]
    fn max_dim() {
        assert_eq!(Grid::new(3, 7).max_dim(), 7);
        assert_eq!(Grid::new(9, 2).max_dim(), 9);
    }
}
