//! Switch-block track pairing.
//!
//! A switch block is the junction where up to four channel segments meet:
//!
//! ```text
//!                 TOP (CHANY)
//!                 | | | | | |
//!                +-----------+
//!              --|           |--
//!        LEFT  --|           |--  RIGHT
//!       (CHANX)--|           |--(CHANX)
//!              --|           |--
//!                +-----------+
//!                 | | | | | |
//!                BOTTOM (CHANY)
//! ```
//!
//! The pairing function answers which track a given track connects to when
//! crossing the junction from one side to another. All three topologies are
//! permutations per `(from_side, to_side)`, so exactly one destination track
//! exists for every crossing; same-side pairs have no connection.

use serde::{Deserialize, Serialize};
use tessera_common::Side;

/// The switch-block topology used when building the RR-graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SwitchBlockKind {
    /// Every crossing preserves the track number. Also used for global
    /// routing.
    Subset,
    /// Wilton's topology: straight-throughs preserve the track, turns
    /// permute by fixed modular formulas (S. Wilton, PhD thesis, U of T,
    /// 1996, p. 103).
    Wilton,
    /// The universal switch block: straight-throughs preserve the track,
    /// turns mirror across the channel (Chang et al., 1996).
    Universal,
}

/// Returns the track reached when `from_track` crosses the junction from
/// `from_side` to `to_side` in a channel of `w` tracks.
///
/// `None` means no connection exists (`from_side == to_side`).
pub fn track_pair(
    kind: SwitchBlockKind,
    from_side: Side,
    to_side: Side,
    from_track: u32,
    w: u32,
) -> Option<u32> {
    if from_side == to_side {
        return None;
    }
    let t = from_track;
    let paired = match kind {
        SwitchBlockKind::Subset => t,
        SwitchBlockKind::Wilton => match (from_side, to_side) {
            (Side::Left, Side::Right) | (Side::Right, Side::Left) => t,
            (Side::Top, Side::Bottom) | (Side::Bottom, Side::Top) => t,
            (Side::Left, Side::Top) => (w - t) % w,
            (Side::Left, Side::Bottom) => (w + t - 1) % w,
            (Side::Right, Side::Top) => (w + t - 1) % w,
            (Side::Right, Side::Bottom) => (2 * w - 2 - t) % w,
            (Side::Bottom, Side::Left) => (t + 1) % w,
            (Side::Bottom, Side::Right) => (2 * w - 2 - t) % w,
            (Side::Top, Side::Left) => (w - t) % w,
            (Side::Top, Side::Right) => (t + 1) % w,
            _ => unreachable!("same-side pairs are handled above"),
        },
        SwitchBlockKind::Universal => match (from_side, to_side) {
            (Side::Left, Side::Right) | (Side::Right, Side::Left) => t,
            (Side::Top, Side::Bottom) | (Side::Bottom, Side::Top) => t,
            (Side::Left, Side::Top) => w - 1 - t,
            (Side::Left, Side::Bottom) => t,
            (Side::Right, Side::Top) => t,
            (Side::Right, Side::Bottom) => w - 1 - t,
            (Side::Bottom, Side::Left) => t,
            (Side::Bottom, Side::Right) => w - 1 - t,
            (Side::Top, Side::Left) => w - 1 - t,
            (Side::Top, Side::Right) => t,
            _ => unreachable!("same-side pairs are handled above"),
        },
    };
    Some(paired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_self_side_pairing() {
        for kind in [
            SwitchBlockKind::Subset,
            SwitchBlockKind::Wilton,
            SwitchBlockKind::Universal,
        ] {
            for side in Side::ALL {
                assert_eq!(track_pair(kind, side, side, 0, 4), None);
            }
        }
    }

    #[test]
    fn subset_preserves_track() {
        for t in 0..6 {
            assert_eq!(
                track_pair(SwitchBlockKind::Subset, Side::Left, Side::Top, t, 6),
                Some(t)
            );
        }
    }

    #[test]
    fn wilton_reference_values() {
        // Known crossings of a width-4 Wilton block.
        assert_eq!(
            track_pair(SwitchBlockKind::Wilton, Side::Left, Side::Top, 0, 4),
            Some(0)
        );
        assert_eq!(
            track_pair(SwitchBlockKind::Wilton, Side::Left, Side::Bottom, 1, 4),
            Some(0)
        );
        assert_eq!(
            track_pair(SwitchBlockKind::Wilton, Side::Bottom, Side::Right, 2, 4),
            Some(0)
        );
    }

    #[test]
    fn wilton_straight_through_preserves_track() {
        for t in 0..4 {
            assert_eq!(
                track_pair(SwitchBlockKind::Wilton, Side::Left, Side::Right, t, 4),
                Some(t)
            );
            assert_eq!(
                track_pair(SwitchBlockKind::Wilton, Side::Bottom, Side::Top, t, 4),
                Some(t)
            );
        }
    }

    #[test]
    fn wilton_turns_are_injective() {
        let w = 8;
        for from_side in Side::ALL {
            for to_side in Side::ALL {
                if from_side == to_side {
                    continue;
                }
                let mut seen = std::collections::HashSet::new();
                for t in 0..w {
                    let to =
                        track_pair(SwitchBlockKind::Wilton, from_side, to_side, t, w).unwrap();
                    assert!(to < w);
                    assert!(seen.insert(to), "duplicate target track {to}");
                }
            }
        }
    }

    #[test]
    fn universal_mirrors_turns() {
        let w = 4;
        for t in 0..w {
            assert_eq!(
                track_pair(SwitchBlockKind::Universal, Side::Left, Side::Top, t, w),
                Some(w - 1 - t)
            );
            assert_eq!(
                track_pair(SwitchBlockKind::Universal, Side::Right, Side::Bottom, t, w),
                Some(w - 1 - t)
            );
            assert_eq!(
                track_pair(SwitchBlockKind::Universal, Side::Left, Side::Right, t, w),
                Some(t)
            );
        }
    }

    #[test]
    fn universal_turns_are_injective() {
        let w = 5;
        for from_side in Side::ALL {
            for to_side in Side::ALL {
                if from_side == to_side {
                    continue;
                }
                let mut seen = std::collections::HashSet::new();
                for t in 0..w {
                    let to = track_pair(SwitchBlockKind::Universal, from_side, to_side, t, w)
                        .unwrap();
                    assert!(seen.insert(to));
                }
            }
        }
    }
}
