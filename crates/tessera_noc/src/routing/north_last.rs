//! North-last turn-model routing.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::{route_with_turn_model, Direction, RoutingAlgorithm, TurnModel};
use crate::storage::NocStorage;

/// North-last routing: once a packet starts moving north it can no longer
/// turn, so north is taken only when it is the sole remaining direction.
/// East, west and south are used adaptively until then.
#[derive(Debug, Default)]
pub struct NorthLastRouting;

impl TurnModel for NorthLastRouting {
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
        } else if dst_loc.x > curr_loc.x {
            legal.push(Direction::East);
        }
        if dst_loc.y < curr_loc.y {
            legal.push(Direction::South);
        }
        // North only when nothing else makes progress.
        if legal.is_empty() && dst_loc.y > curr_loc.y {
            legal.push(Direction::North);
        }
        legal
    }
}

impl RoutingAlgorithm for NorthLastRouting {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::test_mesh::{mesh, route};

    #[test]
    fn north_hops_form_a_suffix() {
        let noc = mesh(4);
        let mut algo = NorthLastRouting;
        let links = route(&mut algo, &noc, (0, 0), (3, 3), 2);
        assert_eq!(links.len(), 6);
        let mut gone_north = false;
        for &l in &links {
            let link = noc.link(l);
            let went_north =
                noc.router(link.sink).loc.y > noc.router(link.source).loc.y;
            if gone_north {
                assert!(went_north, "left the north direction after entering it");
            }
            gone_north |= went_north;
        }
    }

    #[test]
    fn southbound_traffic_is_adaptive_but_minimal() {
        let noc = mesh(4);
        let mut algo = NorthLastRouting;
        for flow in 0..8 {
            let links = route(&mut algo, &noc, (0, 3), (3, 0), flow);
            assert_eq!(links.len(), 6);
        }
    }
}
