//! Breadth-first-search routing.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::RoutingAlgorithm;
use crate::storage::NocStorage;
use std::collections::{HashMap, HashSet, VecDeque};

/// Shortest-hop routing by breadth-first search.
///
/// Works on any topology but makes no deadlock-freedom guarantee; routes it
/// produces should be vetted with the channel-dependency-graph check.
#[derive(Debug, Default)]
pub struct BfsRouting;

impl RoutingAlgorithm for BfsRouting {
    fn route_flow(
        &mut self,
        src: NocRouterId,
        dst: NocRouterId,
        _flow: TrafficFlowId,
        route: &mut Vec<NocLinkId>,
        noc: &NocStorage,
    ) -> Result<(), NocError> {
        route.clear();
        for router in [src, dst] {
            if router.index() >= noc.num_routers() {
                return Err(NocError::UnknownRouter { router });
            }
        }
        if src == dst {
            return Ok(());
        }

        // Link used to first reach each router, for the backtrace.
        let mut parent_link: HashMap<NocRouterId, NocLinkId> = HashMap::new();
        let mut visited: HashSet<NocRouterId> = HashSet::new();
        let mut queue: VecDeque<NocRouterId> = VecDeque::new();
        visited.insert(src);
        queue.push_back(src);

        let mut found = false;
        'search: while let Some(at) = queue.pop_front() {
            for &link_id in noc.outgoing(at) {
                let next = noc.link(link_id).sink;
                if visited.insert(next) {
                    parent_link.insert(next, link_id);
                    queue.push_back(next);
                    if next == dst {
                        found = true;
                        break 'search;
                    }
                }
            }
        }
        if !found {
            return Err(NocError::NoRouteFound { src, dst });
        }

        // Trace parents back from the destination, then flip.
        let mut at = dst;
        while let Some(&link_id) = parent_link.get(&at) {
            route.push(link_id);
            at = noc.link(link_id).source;
        }
        route.reverse();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::test_mesh::{mesh, route};
    use tessera_common::GridLoc;

    #[test]
    fn finds_shortest_hop_route() {
        let noc = mesh(4);
        let mut algo = BfsRouting;
        let links = route(&mut algo, &noc, (0, 0), (3, 2), 0);
        assert_eq!(links.len(), 5);
        assert_eq!(
            noc.router(noc.link(*links.last().unwrap()).sink).loc,
            GridLoc::new(3, 2)
        );
    }

    #[test]
    fn empty_route_for_same_router() {
        let noc = mesh(3);
        let mut algo = BfsRouting;
        let links = route(&mut algo, &noc, (2, 2), (2, 2), 0);
        assert!(links.is_empty());
    }

    #[test]
    fn fails_on_disconnected_routers() {
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(0, 0), 0.0).unwrap();
        let b = noc.add_router(1, GridLoc::new(1, 0), 0.0).unwrap();
        // One-way link b -> a only.
        noc.add_link(b, a, 1.0, 0.0).unwrap();
        noc.finished_building();
        let mut algo = BfsRouting;
        let mut out = Vec::new();
        assert!(matches!(
            algo.route_flow(a, b, TrafficFlowId::from_raw(0), &mut out, &noc),
            Err(NocError::NoRouteFound { .. })
        ));
    }

    #[test]
    fn works_on_irregular_topologies() {
        // A ring of three routers, one direction only.
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(0, 0), 0.0).unwrap();
        let b = noc.add_router(1, GridLoc::new(1, 0), 0.0).unwrap();
        let c = noc.add_router(2, GridLoc::new(1, 1), 0.0).unwrap();
        noc.add_link(a, b, 1.0, 0.0).unwrap();
        noc.add_link(b, c, 1.0, 0.0).unwrap();
        noc.add_link(c, a, 1.0, 0.0).unwrap();
        noc.finished_building();
        let mut algo = BfsRouting;
        let mut out = Vec::new();
        algo.route_flow(c, b, TrafficFlowId::from_raw(0), &mut out, &noc)
            .unwrap();
        assert_eq!(out.len(), 2); // c -> a -> b
    }
}
