//! Channel-dependency-graph deadlock check.
//!
//! The CDG has one vertex per NoC link; every pair of consecutive links on
//! any route contributes a directed edge. A cycle in this graph means a set
//! of flows can each be waiting on a channel held by the next — a deadlock.
//! The turn-model algorithms produce acyclic CDGs by construction; this
//! check is the safety net for externally supplied routes.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::storage::NocStorage;
use crate::traffic::TrafficFlows;

/// The channel-dependency graph of a set of routed flows.
#[derive(Clone, Debug)]
pub struct ChannelDependencyGraph {
    /// Outgoing CDG neighbours per NoC link.
    adjacency: Vec<Vec<NocLinkId>>,
}

impl ChannelDependencyGraph {
    /// Builds the CDG from one route per traffic flow.
    ///
    /// Validates that every route is non-empty, continuous, and starts and
    /// ends at its flow's routers before extracting dependencies.
    pub fn new(
        noc: &NocStorage,
        flows: &TrafficFlows,
        routes: &[Vec<NocLinkId>],
    ) -> Result<Self, NocError> {
        if routes.len() != flows.num_flows() {
            return Err(NocError::RouteCountMismatch {
                actual: routes.len(),
                expected: flows.num_flows(),
            });
        }

        for (flow_id, flow) in flows.flows() {
            let route = &routes[flow_id.index()];
            check_route_shape(noc, flow_id, flow.source_router, flow.sink_router, route)?;
        }

        let mut adjacency: Vec<Vec<NocLinkId>> = vec![Vec::new(); noc.num_links()];
        for route in routes {
            for pair in route.windows(2) {
                adjacency[pair[0].index()].push(pair[1]);
            }
        }
        for neighbours in &mut adjacency {
            neighbours.sort_unstable();
            neighbours.dedup();
        }
        Ok(Self { adjacency })
    }

    /// Returns `true` if the CDG contains a cycle.
    ///
    /// Iterative DFS with an on-stack mark: any edge back into the active
    /// path is a cycle. No cycle proves the routes deadlock-free.
    pub fn has_cycles(&self) -> bool {
        let n = self.adjacency.len();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();

        for root in 0..n {
            if visited[root] {
                continue;
            }
            stack.push(root);
            while let Some(&vertex) = stack.last() {
                if !visited[vertex] {
                    visited[vertex] = true;
                    on_stack[vertex] = true;
                } else {
                    // All descendants processed.
                    stack.pop();
                    on_stack[vertex] = false;
                    continue;
                }
                for neighbour in &self.adjacency[vertex] {
                    if !visited[neighbour.index()] {
                        stack.push(neighbour.index());
                    } else if on_stack[neighbour.index()] {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Endpoint and continuity sanity of a single route.
fn check_route_shape(
    noc: &NocStorage,
    flow: TrafficFlowId,
    source: NocRouterId,
    sink: NocRouterId,
    route: &[NocLinkId],
) -> Result<(), NocError> {
    if source == sink {
        return Ok(());
    }
    let Some((&first, &last)) = route.first().zip(route.last()) else {
        return Err(NocError::EmptyRoute { flow });
    };
    if noc.link(first).source != source || noc.link(last).sink != sink {
        return Err(NocError::RouteEndpointMismatch { flow });
    }
    for pair in route.windows(2) {
        if noc.link(pair[0]).sink != noc.link(pair[1]).source {
            return Err(NocError::RouteDiscontinuity {
                flow,
                link: pair[1],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NocRouterId;
    use crate::traffic::TrafficFlow;
    use tessera_common::GridLoc;

    fn flow(src: NocRouterId, dst: NocRouterId) -> TrafficFlow {
        TrafficFlow {
            source_router: src,
            sink_router: dst,
            bandwidth: 1.0e8,
            max_latency: 1.0e-7,
            priority: 1,
        }
    }

    /// A unidirectional 2x2 ring: a -> b -> c -> d -> a.
    fn ring() -> (NocStorage, Vec<NocRouterId>, Vec<NocLinkId>) {
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(0, 0), 0.0).unwrap();
        let b = noc.add_router(1, GridLoc::new(1, 0), 0.0).unwrap();
        let c = noc.add_router(2, GridLoc::new(1, 1), 0.0).unwrap();
        let d = noc.add_router(3, GridLoc::new(0, 1), 0.0).unwrap();
        let ab = noc.add_link(a, b, 1.0, 0.0).unwrap();
        let bc = noc.add_link(b, c, 1.0, 0.0).unwrap();
        let cd = noc.add_link(c, d, 1.0, 0.0).unwrap();
        let da = noc.add_link(d, a, 1.0, 0.0).unwrap();
        noc.finished_building();
        (noc, vec![a, b, c, d], vec![ab, bc, cd, da])
    }

    #[test]
    fn straight_routes_have_no_cycles() {
        let (noc, routers, links) = ring();
        let mut flows = TrafficFlows::new();
        flows.add_flow(flow(routers[0], routers[2]));
        let routes = vec![vec![links[0], links[1]]];
        let cdg = ChannelDependencyGraph::new(&noc, &flows, &routes).unwrap();
        assert!(!cdg.has_cycles());
    }

    #[test]
    fn full_ring_of_flows_deadlocks() {
        let (noc, routers, links) = ring();
        let mut flows = TrafficFlows::new();
        // Four flows, each turning two corners of the ring: together their
        // link dependencies close the cycle ab -> bc -> cd -> da -> ab.
        flows.add_flow(flow(routers[0], routers[2]));
        flows.add_flow(flow(routers[1], routers[3]));
        flows.add_flow(flow(routers[2], routers[0]));
        flows.add_flow(flow(routers[3], routers[1]));
        let routes = vec![
            vec![links[0], links[1]],
            vec![links[1], links[2]],
            vec![links[2], links[3]],
            vec![links[3], links[0]],
        ];
        let cdg = ChannelDependencyGraph::new(&noc, &flows, &routes).unwrap();
        assert!(cdg.has_cycles());
    }

    #[test]
    fn empty_route_is_rejected() {
        let (noc, routers, _) = ring();
        let mut flows = TrafficFlows::new();
        flows.add_flow(flow(routers[0], routers[1]));
        let routes = vec![Vec::new()];
        assert!(matches!(
            ChannelDependencyGraph::new(&noc, &flows, &routes),
            Err(NocError::EmptyRoute { .. })
        ));
    }

    #[test]
    fn discontinuous_route_is_rejected() {
        let (noc, routers, links) = ring();
        let mut flows = TrafficFlows::new();
        flows.add_flow(flow(routers[0], routers[3]));
        // ab followed by cd skips bc.
        let routes = vec![vec![links[0], links[2]]];
        assert!(matches!(
            ChannelDependencyGraph::new(&noc, &flows, &routes),
            Err(NocError::RouteDiscontinuity { .. })
        ));
    }

    #[test]
    fn endpoint_mismatch_is_rejected() {
        let (noc, routers, links) = ring();
        let mut flows = TrafficFlows::new();
        flows.add_flow(flow(routers[0], routers[2]));
        let routes = vec![vec![links[1], links[2]]]; // starts at b, not a
        assert!(matches!(
            ChannelDependencyGraph::new(&noc, &flows, &routes),
            Err(NocError::RouteEndpointMismatch { .. })
        ));
    }

    #[test]
    fn route_count_must_match_flows() {
        let (noc, routers, _) = ring();
        let mut flows = TrafficFlows::new();
        flows.add_flow(flow(routers[0], routers[1]));
        assert!(matches!(
            ChannelDependencyGraph::new(&noc, &flows, &[]),
            Err(NocError::RouteCountMismatch { .. })
        ));
    }
}
