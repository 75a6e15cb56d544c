//! NoC routing algorithms.
//!
//! All algorithms find *minimal* routes: every hop reduces the Manhattan
//! distance to the destination. The turn-model algorithms guarantee deadlock
//! freedom by forbidding a subset of turns; where several directions remain
//! legal, the choice is pseudo-random with probability proportional to the
//! remaining distance along each axis, seeded by a hash of the endpoints so
//! rerouting is reproducible.

pub mod bfs;
pub mod negative_first;
pub mod north_last;
pub mod odd_even;
pub mod west_first;
pub mod xy;

pub use bfs::BfsRouting;
pub use negative_first::NegativeFirstRouting;
pub use north_last::NorthLastRouting;
pub use odd_even::OddEvenRouting;
pub use west_first::WestFirstRouting;
pub use xy::XyRouting;

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::storage::NocStorage;
use std::collections::HashSet;

/// A travel direction in the NoC mesh.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    /// Towards increasing y.
    North,
    /// Towards decreasing y.
    South,
    /// Towards increasing x.
    East,
    /// Towards decreasing x.
    West,
}

impl Direction {
    /// Returns `true` for the two vertical directions.
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

/// A NoC routing algorithm.
pub trait RoutingAlgorithm {
    /// Finds a route for `flow` from `src` to `dst`, writing the traversed
    /// links into `route` (cleared first).
    fn route_flow(
        &mut self,
        src: NocRouterId,
        dst: NocRouterId,
        flow: TrafficFlowId,
        route: &mut Vec<NocLinkId>,
        noc: &NocStorage,
    ) -> Result<(), NocError>;
}

/// Creates a routing algorithm by name.
///
/// Recognised names: `xy`, `bfs`, `west_first`, `north_last`,
/// `negative_first`, `odd_even`.
pub fn create_routing_algorithm(name: &str) -> Result<Box<dyn RoutingAlgorithm>, NocError> {
    match name {
        "xy" => Ok(Box::new(XyRouting)),
        "bfs" => Ok(Box::new(BfsRouting)),
        "west_first" => Ok(Box::new(WestFirstRouting)),
        "north_last" => Ok(Box::new(NorthLastRouting)),
        "negative_first" => Ok(Box::new(NegativeFirstRouting)),
        "odd_even" => Ok(Box::new(OddEvenRouting)),
        other => Err(NocError::UnknownAlgorithm {
            name: other.to_string(),
        }),
    }
}

/// The turn-model interface: a policy names the legal minimal directions at
/// each router; the shared walker does the rest.
pub(crate) trait TurnModel {
    /// Minimal-route directions the policy allows at `curr`.
    fn legal_directions(
        &self,
        src: NocRouterId,
        curr: NocRouterId,
        dst: NocRouterId,
        noc: &NocStorage,
    ) -> Vec<Direction>;

    /// Picks one of the legal directions.
    ///
    /// The default flips a biased coin seeded by the endpoints: the chance
    /// of moving along an axis is proportional to the remaining distance
    /// along it.
    fn select_direction(
        &self,
        legal: &[Direction],
        src: NocRouterId,
        dst: NocRouterId,
        curr: NocRouterId,
        flow: TrafficFlowId,
        noc: &NocStorage,
    ) -> Option<Direction> {
        match legal {
            [] => None,
            [only] => Some(*only),
            _ => {
                let curr_loc = noc.router(curr).loc;
                let dst_loc = noc.router(dst).loc;
                let delta_x = dst_loc.x.abs_diff(curr_loc.x) as u64;
                let delta_y = dst_loc.y.abs_diff(curr_loc.y) as u64;
                let hash = route_hash(src, dst, curr, flow) as u64;
                let vertical_probability =
                    delta_y * (u32::MAX as u64 / (delta_x + delta_y).max(1));
                let want_vertical = hash < vertical_probability;
                legal
                    .iter()
                    .copied()
                    .find(|d| d.is_vertical() == want_vertical)
                    .or_else(|| legal.first().copied())
            }
        }
    }
}

/// Deterministic 32-bit hash of a routing decision point.
///
/// Rerouting the same flow through the same router always makes the same
/// choice, so incremental reroutes are reproducible.
pub(crate) fn route_hash(
    src: NocRouterId,
    dst: NocRouterId,
    curr: NocRouterId,
    flow: TrafficFlowId,
) -> u32 {
    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&src.as_raw().to_le_bytes());
    bytes[4..8].copy_from_slice(&dst.as_raw().to_le_bytes());
    bytes[8..12].copy_from_slice(&curr.as_raw().to_le_bytes());
    bytes[12..16].copy_from_slice(&flow.as_raw().to_le_bytes());
    xxhash_rust::xxh3::xxh3_64(&bytes) as u32
}

/// The shared turn-model walker: repeatedly asks the policy for a direction
/// and follows a link that way until the destination is reached.
pub(crate) fn route_with_turn_model(
    model: &dyn TurnModel,
    src: NocRouterId,
    dst: NocRouterId,
    flow: TrafficFlowId,
    route: &mut Vec<NocLinkId>,
    noc: &NocStorage,
) -> Result<(), NocError> {
    route.clear();
    for router in [src, dst] {
        if router.index() >= noc.num_routers() {
            return Err(NocError::UnknownRouter { router });
        }
    }

    // Breaks loops on irregular (non-mesh) topologies.
    let mut visited: HashSet<NocRouterId> = HashSet::new();
    visited.insert(src);

    let mut curr = src;
    while curr != dst {
        let legal = model.legal_directions(src, curr, dst, noc);
        let Some(direction) = model.select_direction(&legal, src, dst, curr, flow, noc) else {
            return Err(NocError::NoRouteFound { src, dst });
        };
        let Some((link, next)) = follow_direction(noc, curr, direction, &visited) else {
            return Err(NocError::NoRouteFound { src, dst });
        };
        visited.insert(next);
        route.push(link);
        curr = next;
    }
    Ok(())
}

/// Finds an outgoing link of `curr` travelling in `direction` whose far
/// router has not been visited yet.
fn follow_direction(
    noc: &NocStorage,
    curr: NocRouterId,
    direction: Direction,
    visited: &HashSet<NocRouterId>,
) -> Option<(NocLinkId, NocRouterId)> {
    let curr_loc = noc.router(curr).loc;
    for &link_id in noc.outgoing(curr) {
        let next = noc.link(link_id).sink;
        let next_loc = noc.router(next).loc;
        let matches = match direction {
            Direction::North => next_loc.y > curr_loc.y,
            Direction::South => next_loc.y < curr_loc.y,
            Direction::East => next_loc.x > curr_loc.x,
            Direction::West => next_loc.x < curr_loc.x,
        };
        if matches && !visited.contains(&next) {
            return Some((link_id, next));
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod test_mesh {
    use super::*;
    use tessera_common::GridLoc;

    /// Builds an `n` by `n` mesh with bidirectional links between
    /// orthogonal neighbours.
    pub(crate) fn mesh(n: i32) -> NocStorage {
        let mut noc = NocStorage::new();
        let mut ids = Vec::new();
        for y in 0..n {
            for x in 0..n {
                ids.push(
                    noc.add_router((y * n + x) as u32, GridLoc::new(x, y), 1.0e-9)
                        .unwrap(),
                );
            }
        }
        let at = |x: i32, y: i32| ids[(y * n + x) as usize];
        for y in 0..n {
            for x in 0..n {
                if x + 1 < n {
                    noc.add_link(at(x, y), at(x + 1, y), 1.0e9, 1.0e-9).unwrap();
                    noc.add_link(at(x + 1, y), at(x, y), 1.0e9, 1.0e-9).unwrap();
                }
                if y + 1 < n {
                    noc.add_link(at(x, y), at(x, y + 1), 1.0e9, 1.0e-9).unwrap();
                    noc.add_link(at(x, y + 1), at(x, y), 1.0e9, 1.0e-9).unwrap();
                }
            }
        }
        noc.finished_building();
        noc
    }

    /// Route a flow between two mesh coordinates, panicking on failure.
    pub(crate) fn route(
        algo: &mut dyn RoutingAlgorithm,
        noc: &NocStorage,
        src: (i32, i32),
        dst: (i32, i32),
        flow: u32,
    ) -> Vec<NocLinkId> {
        let src = noc.router_at(GridLoc::new(src.0, src.1)).unwrap();
        let dst = noc.router_at(GridLoc::new(dst.0, dst.1)).unwrap();
        let mut out = Vec::new();
        algo.route_flow(src, dst, TrafficFlowId::from_raw(flow), &mut out, noc)
            .unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_knows_all_algorithms() {
        for name in [
            "xy",
            "bfs",
            "west_first",
            "north_last",
            "negative_first",
            "odd_even",
        ] {
            assert!(create_routing_algorithm(name).is_ok(), "{name}");
        }
        assert!(matches!(
            create_routing_algorithm("left_handed"),
            Err(NocError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn route_hash_is_deterministic() {
        let a = route_hash(
            NocRouterId::from_raw(1),
            NocRouterId::from_raw(2),
            NocRouterId::from_raw(3),
            TrafficFlowId::from_raw(4),
        );
        let b = route_hash(
            NocRouterId::from_raw(1),
            NocRouterId::from_raw(2),
            NocRouterId::from_raw(3),
            TrafficFlowId::from_raw(4),
        );
        assert_eq!(a, b);
        let c = route_hash(
            NocRouterId::from_raw(1),
            NocRouterId::from_raw(2),
            NocRouterId::from_raw(3),
            TrafficFlowId::from_raw(5),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn direction_verticality() {
        assert!(Direction::North.is_vertical());
        assert!(Direction::South.is_vertical());
        assert!(!Direction::East.is_vertical());
        assert!(!Direction::West.is_vertical());
    }
}
