//! Network-on-chip modelling and deadlock-free routing for the Tessera
//! FPGA back-end.
//!
//! [`NocStorage`] models the embedded NoC's routers and links; append-only
//! while ingesting the device description, frozen afterwards. Traffic flows
//! are routed by one of the [`routing`] algorithms — dimension-ordered XY,
//! the west-first / north-last / negative-first / odd-even turn models, or
//! plain breadth-first search — and a set of routes can be proven
//! deadlock-free with the [`ChannelDependencyGraph`].

pub mod cdg;
pub mod error;
pub mod ids;
pub mod routing;
pub mod storage;
pub mod traffic;

pub use cdg::ChannelDependencyGraph;
pub use error::NocError;
pub use ids::{NocLinkId, NocRouterId, TrafficFlowId};
pub use routing::{
    create_routing_algorithm, BfsRouting, Direction, NegativeFirstRouting, NorthLastRouting,
    OddEvenRouting, RoutingAlgorithm, WestFirstRouting, XyRouting,
};
pub use storage::{NocLink, NocRouter, NocStorage};
pub use traffic::{TrafficFlow, TrafficFlows};

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::GridLoc;

    /// Builds an `n` by `n` mesh with bidirectional links.
    fn mesh(n: i32) -> NocStorage {
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

    /// Routes every ordered router pair of the mesh with the named
    /// algorithm and returns the flow set and routes.
    fn route_all_pairs(
        noc: &NocStorage,
        algorithm: &str,
    ) -> (TrafficFlows, Vec<Vec<NocLinkId>>) {
        let mut algo = create_routing_algorithm(algorithm).unwrap();
        let mut flows = TrafficFlows::new();
        let mut routes = Vec::new();
        let routers: Vec<NocRouterId> = noc.routers().map(|(id, _)| id).collect();
        for &src in &routers {
            for &dst in &routers {
                if src == dst {
                    continue;
                }
                let flow_id = flows.add_flow(TrafficFlow {
                    source_router: src,
                    sink_router: dst,
                    bandwidth: 1.0e8,
                    max_latency: 1.0e-7,
                    priority: 1,
                });
                let mut route = Vec::new();
                algo.route_flow(src, dst, flow_id, &mut route, noc).unwrap();
                routes.push(route);
            }
        }
        (flows, routes)
    }

    #[test]
    fn turn_model_routes_are_minimal_and_monotone() {
        let noc = mesh(4);
        for algorithm in ["xy", "west_first", "north_last", "negative_first", "odd_even"] {
            let (flows, routes) = route_all_pairs(&noc, algorithm);
            for (flow_id, flow) in flows.flows() {
                let route = &routes[flow_id.index()];
                let src = noc.router(flow.source_router).loc;
                let dst = noc.router(flow.sink_router).loc;
                assert_eq!(route.len() as u32, src.manhattan(dst), "{algorithm}");

                // Distance to the destination decreases at every hop.
                let mut remaining = src.manhattan(dst);
                for &link in route {
                    let next = noc.router(noc.link(link).sink).loc;
                    let next_remaining = next.manhattan(dst);
                    assert_eq!(next_remaining, remaining - 1, "{algorithm}");
                    remaining = next_remaining;
                }
                assert_eq!(remaining, 0, "{algorithm}");
            }
        }
    }

    #[test]
    fn turn_model_cdgs_are_acyclic() {
        let noc = mesh(4);
        for algorithm in ["xy", "west_first", "north_last", "negative_first", "odd_even"] {
            let (flows, routes) = route_all_pairs(&noc, algorithm);
            let cdg = ChannelDependencyGraph::new(&noc, &flows, &routes).unwrap();
            assert!(!cdg.has_cycles(), "{algorithm} produced a cyclic CDG");
        }
    }

    #[test]
    fn routes_connect_flow_endpoints() {
        let noc = mesh(4);
        let (flows, routes) = route_all_pairs(&noc, "west_first");
        for (flow_id, flow) in flows.flows() {
            let route = &routes[flow_id.index()];
            assert_eq!(noc.link(route[0]).source, flow.source_router);
            assert_eq!(
                noc.link(*route.last().unwrap()).sink,
                flow.sink_router
            );
            for pair in route.windows(2) {
                assert_eq!(noc.link(pair[0]).sink, noc.link(pair[1]).source);
            }
        }
    }

    #[test]
    fn bfs_routes_survive_the_cdg_shape_checks() {
        let noc = mesh(3);
        let (flows, routes) = route_all_pairs(&noc, "bfs");
        // BFS makes no deadlock guarantee, but on an all-pairs mesh workload
        // the shape checks must still pass and the result is a plain bool.
        let cdg = ChannelDependencyGraph::new(&noc, &flows, &routes).unwrap();
        let _ = cdg.has_cycles();
    }

    #[test]
    fn rerouting_is_deterministic_across_algorithms() {
        let noc = mesh(5);
        for algorithm in ["west_first", "north_last", "negative_first", "odd_even"] {
            let (_, first) = route_all_pairs(&noc, algorithm);
            let (_, second) = route_all_pairs(&noc, algorithm);
            assert_eq!(first, second, "{algorithm}");
        }
    }
}
