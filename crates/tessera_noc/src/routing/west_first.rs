//! West-first turn-model routing.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::{route_with_turn_model, Direction, RoutingAlgorithm, TurnModel};
use crate::storage::NocStorage;

/// West-first routing: all westward travel happens before anything else, so
/// the two turns *into* the west direction never occur. Eastbound traffic
/// adapts freely among east, north and south.
#[derive(Debug, Default)]
pub struct WestFirstRouting;

impl TurnModel for WestFirstRouting {
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
            // Still west of us: go west exclusively until column-aligned.
            legal.push(Direction::West);
        } else {
            if dst_loc.x > curr_loc.x {
                legal.push(Direction::East);
            }
            if dst_loc.y > curr_loc.y {
                legal.push(Direction::North);
            } else if dst_loc.y < curr_loc.y {
                legal.push(Direction::South);
            }
        }
        legal
    }
}

impl RoutingAlgorithm for WestFirstRouting {
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
