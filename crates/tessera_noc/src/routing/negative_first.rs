//! Negative-first turn-model routing.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::{route_with_turn_model, Direction, RoutingAlgorithm, TurnModel};
use crate::storage::NocStorage;

/// Negative-first routing: travel in the negative directions (west, south)
/// for as long as they make progress; only then switch to the positive ones
/// (east, north). No transition from a positive direction back to a negative
/// one ever occurs.
#[derive(Debug, Default)]
pub struct NegativeFirstRouting;

impl TurnModel for NegativeFirstRouting {
    fn legal_directions(
        &self,
        _src: NocRouterId,
        curr: NocRouterId,
        dst: NocRouterId,
        noc: &NocStorage,
    ) -> Vec<Direction> {
        let curr_loc = noc.router(curr).loc;
        let dst_loc = noc.router(dst).loc;
        let mut legal = Vec::with_capacity(2);
        if dst_loc.x < curr_loc.x {
            legal.push(Direction::West);
        }
        if dst_loc.y < curr_loc.y {
            legal.push(Direction::South);
        }
        if !legal.is_empty() {
            return legal;
        }
        if dst_loc.x > curr_loc.x {
            legal.push(Direction::East);
        }
        if dst_loc.y > curr_loc.y {
            legal.push(Direction::North);
        }
        legal
    }
}

impl RoutingAlgorithm for NegativeFirstRouting {
    fn route_flow(
        &mut self,
        src: NocRouterId,
        dst: NocRouterId,
        flow: TrafficFlowId,
        route: &mut Vec<NocLinkId>,
        noc: &NocStorage,
    ) -> Result<(), NocError> {
        route_with_turn_model(self, src, dst, flow, route, noc)
    }
}
