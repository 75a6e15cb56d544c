//! Dimension-ordered XY routing.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::{route_with_turn_model, Direction, RoutingAlgorithm, TurnModel};
use crate::storage::NocStorage;

/// Dimension-ordered routing: travel along x until column-aligned with the
/// destination, then along y. Fully deterministic, trivially deadlock-free.
#[derive(Debug, Default)]
pub struct XyRouting;

impl TurnModel for XyRouting {
    fn legal_directions(
        &self,
        _src: NocRouterId,
        curr: NocRouterId,
        dst: NocRouterId,
        noc: &NocStorage,
    ) -> Vec<Direction> {
        let curr_loc = noc.router(curr).loc;
        let dst_loc = noc.router(dst).loc;
        if dst_loc.x > curr_loc.x {
            vec![Direction::East]
        } else if dst_loc.x < curr_loc.x {
            vec![Direction::West]
        } else if dst_loc.y > curr_loc.y {
            vec![Direction::North]
        } else if dst_loc.y < curr_loc.y {
            vec![Direction::South]
        } else {
            Vec::new()
        }
    }

    fn select_direction(
        &self,
        legal: &[Direction],
        _src: NocRouterId,
        _dst: NocRouterId,
        _curr: NocRouterId,
        _flow: TrafficFlowId,
        _noc: &NocStorage,
    ) -> Option<Direction> {
        // There is never a choice in dimension-ordered routing.
        legal.first().copied()
    }
}

impl RoutingAlgorithm for XyRouting {
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
    fn westbound_row_route() {
        let noc = mesh(4);
        let mut algo = XyRouting;
        let links = route(&mut algo, &noc, (3, 1), (0, 1), 0);
        assert_eq!(links.len(), 3);
        // The route marches through columns 2, 1, 0 along row 1.
        let cols: Vec<i32> = links
            .iter()
            .map(|&l| noc.router(noc.link(l).sink).loc.x)
            .collect();
        assert_eq!(cols, vec![2, 1, 0]);
        for &l in &links {
            assert_eq!(noc.router(noc.link(l).sink).loc.y, 1);
        }
    }

    #[test]
    fn x_before_y() {
        let noc = mesh(4);
        let mut algo = XyRouting;
        let links = route(&mut algo, &noc, (1, 0), (3, 3), 0);
        assert_eq!(links.len(), 5);
        // First the two eastward hops, then three northward ones.
        let dirs: Vec<(i32, i32)> = links
            .iter()
            .map(|&l| {
                let link = noc.link(l);
                let from = noc.router(link.source).loc;
                let to = noc.router(link.sink).loc;
                (to.x - from.x, to.y - from.y)
            })
            .collect();
        assert_eq!(dirs, vec![(1, 0), (1, 0), (0, 1), (0, 1), (0, 1)]);
    }

    #[test]
    fn same_router_yields_empty_route() {
        let noc = mesh(3);
        let mut algo = XyRouting;
        let links = route(&mut algo, &noc, (1, 1), (1, 1), 0);
        assert!(links.is_empty());
    }

    #[test]
    fn consecutive_links_share_routers() {
        let noc = mesh(4);
        let mut algo = XyRouting;
        let links = route(&mut algo, &noc, (0, 3), (3, 0), 7);
        for pair in links.windows(2) {
            assert_eq!(noc.link(pair[0]).sink, noc.link(pair[1]).source);
        }
    }
}
