//! The four sides of a tile or switch-block junction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a logic cluster or switch-block junction.
///
/// Pin locations are recorded per side, and switch-block track pairing is
/// defined between pairs of distinct sides. Horizontal channels meet a
/// junction on its `Left`/`Right` sides, vertical channels on `Top`/`Bottom`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Side {
    /// The top side (towards increasing y).
    Top,
    /// The bottom side (towards decreasing y).
    Bottom,
    /// The left side (towards decreasing x).
    Left,
    /// The right side (towards increasing x).
    Right,
}

impl Side {
    /// All four sides, in the canonical iteration order.
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// Returns the opposite side.
    ///
    /// A pin that faces a channel on its `Top` is seen by that channel on the
    /// channel's `Bottom`, so converting between the two perspectives is an
    /// `opposite` call.
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Returns a stable small index for table lookups.
    pub fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Bottom => 1,
            Side::Left => 2,
            Side::Right => 3,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
            assert_ne!(side.opposite(), side);
        }
    }

    #[test]
    fn indices_are_distinct() {
        let mut seen = [false; 4];
        for side in Side::ALL {
            assert!(!seen[side.index()]);
            seen[side.index()] = true;
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("{}", Side::Top), "top");
        assert_eq!(format!("{}", Side::Right), "right");
    }

    #[test]
    fn serde_roundtrip() {
        for side in Side::ALL {
            let json = serde_json::to_string(&side).unwrap();
            let restored: Side = serde_json::from_str(&json).unwrap();
            assert_eq!(side, restored);
        }
    }
}
