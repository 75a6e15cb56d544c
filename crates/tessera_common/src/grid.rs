//! Integer grid coordinates for the device fabric.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in the device grid.
///
/// The grid is laid out with `(0, 0)` at the bottom-left corner. Columns
/// grow to the right, rows grow upward. IO locations sit on the periphery
/// (`x == 0`, `y == 0`, `x == nx + 1` or `y == ny + 1`); logic clusters
/// occupy the interior.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct GridLoc {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl GridLoc {
    /// Creates a grid location from column and row indices.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the Manhattan distance to another location.
    pub fn manhattan(self, other: GridLoc) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for GridLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
