//! Routing-resource graph for the Tessera FPGA back-end.
//!
//! This crate builds and validates the typed directed graph over which nets
//! are routed: per-class SOURCE/SINK aggregates, physical pins, and channel
//! wire segments, connected by switched edges. It also carries the
//! switch-block pairing policies, the channel segmentation machinery, and
//! the trace-walk checker that validates a produced routing.
//!
//! Construction follows a fixed pipeline: segmentation and the spatial node
//! index first (fixing every node's id), then per-location node and edge
//! emission, then electrical roll-up and the cost-profile table, then a full
//! structural re-check of the result.

pub mod build;
pub mod check;
pub mod error;
pub mod graph;
pub mod ids;
pub mod index;
pub mod node;
pub mod route_check;
pub mod sbox;
pub mod seg;

pub use build::{build_rr_graph, DetailedRoutingArch, FcSpec};
pub use check::check_rr_graph;
pub use error::RrError;
pub use graph::{RouteKind, RrGraph, RrGraphSlot};
pub use ids::RrNodeId;
pub use node::{BaseCostKind, RrEdge, RrIndexedData, RrKind, RrNode};
pub use route_check::{check_route, LocalOpin, RouteCheckError, Trace, TraceStep};
pub use sbox::{track_pair, SwitchBlockKind};
pub use seg::{build_seg_details, SegDetails};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use tessera_arch::{uniform_k4, Architecture, BlockKind, SwitchId, TimingParams};
    use tessera_common::GridLoc;
    use tessera_diagnostics::DiagnosticSink;
    use tessera_netlist::{check_netlist, Netlist, NetId, PinRef, Subblock};

    fn det_arch(switch_block: SwitchBlockKind) -> DetailedRoutingArch {
        DetailedRoutingArch {
            switch_block,
            fc_output: FcSpec::Fractional(1.0),
            fc_input: FcSpec::Fractional(1.0),
            fc_pad: FcSpec::Fractional(1.0),
            delayless_switch: SwitchId::from_raw(0),
            wire_to_ipin_switch: SwitchId::from_raw(2),
        }
    }

    /// One input pad driving a cluster that drives one output pad.
    fn small_design() -> (Architecture, Netlist) {
        let arch = uniform_k4(2, 2);
        let mut nl = Netlist::new();
        let ipad = nl.add_block("in0", BlockKind::InPad, GridLoc::new(0, 1), 1);
        let clb = nl.add_block("clb0", BlockKind::Clb, GridLoc::new(1, 1), 6);
        let opad = nl.add_block("out0", BlockKind::OutPad, GridLoc::new(3, 1), 1);
        let n_in = nl.add_net("n_in", false);
        nl.connect(n_in, ipad, None);
        nl.connect(n_in, clb, Some(0));
        let n_out = nl.add_net("n_out", false);
        nl.connect(n_out, clb, Some(4));
        nl.connect(n_out, opad, None);
        nl.add_subblock(
            clb,
            Subblock {
                name: "ble0".into(),
                inputs: vec![Some(PinRef::ClusterPin(0)), None, None, None],
                output: Some(4),
                clock: None,
            },
        );
        (arch, nl)
    }

    fn build(
        arch: &Architecture,
        netlist: &Netlist,
        kind: RouteKind,
        sb: SwitchBlockKind,
        w: u32,
    ) -> RrGraph {
        let sink = DiagnosticSink::new();
        check_netlist(netlist, arch, &sink).unwrap();
        build_rr_graph(
            arch,
            netlist,
            kind,
            &det_arch(sb),
            w,
            &TimingParams::zeroed(),
            BaseCostKind::DemandOnly,
            &sink,
        )
        .unwrap()
    }

    #[test]
    fn detailed_graph_builds_and_checks() {
        let (arch, nl) = small_design();
        for sb in [
            SwitchBlockKind::Subset,
            SwitchBlockKind::Wilton,
            SwitchBlockKind::Universal,
        ] {
            let graph = build(&arch, &nl, RouteKind::Detailed, sb, 4);
            assert!(graph.num_nodes() > 0);
            let sink = DiagnosticSink::new();
            check_rr_graph(&graph, &arch, &sink).unwrap();
        }
    }

    #[test]
    fn global_graph_builds_with_single_track() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Global, SwitchBlockKind::Subset, 6);
        assert_eq!(graph.channel_width(), 1);
        // Wires carry channel-wide capacity in global mode.
        let wide = graph
            .nodes()
            .filter(|(_, n)| n.kind.is_wire())
            .all(|(_, n)| n.capacity == 6);
        assert!(wide);
    }

    #[test]
    fn net_terminals_anchor_sources_and_sinks() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        for (net_id, net) in nl.nets() {
            let terminals = graph.net_terminals(net_id);
            assert_eq!(terminals.len(), net.num_pins());
            assert_eq!(graph.node(terminals[0]).kind, RrKind::Source);
            for &sink_node in &terminals[1..] {
                assert_eq!(graph.node(sink_node).kind, RrKind::Sink);
            }
        }
    }

    #[test]
    fn every_edge_kind_pair_is_legal() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Wilton, 4);
        for (_, node) in graph.nodes() {
            for edge in &node.edges {
                let to = graph.node(edge.to);
                assert!(
                    node.kind.may_connect_to(to.kind),
                    "{} -> {}",
                    node.kind,
                    to.kind
                );
            }
        }
    }

    #[test]
    fn keyed_lookup_round_trips() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        for (id, node) in graph.nodes() {
            let loc = GridLoc::new(node.xlow, node.ylow);
            assert_eq!(graph.rr_node_index(loc, node.kind, node.ptc).unwrap(), id);
        }
    }

    #[test]
    fn wires_accumulate_switch_capacitance() {
        let (arch, nl) = small_design();
        let sink = DiagnosticSink::new();
        let mut timing = TimingParams::zeroed();
        timing.c_ipin_cblock = 1.0e-15;
        let graph = build_rr_graph(
            &arch,
            &nl,
            RouteKind::Detailed,
            &det_arch(SwitchBlockKind::Subset),
            4,
            &timing,
            BaseCostKind::DemandOnly,
            &sink,
        )
        .unwrap();
        let (_, wire) = graph
            .nodes()
            .find(|(_, n)| n.kind.is_wire() && !n.edges.is_empty())
            .unwrap();
        let bare = wire.span_length() as f64 * arch.segments()[0].c_metal;
        assert!(wire.c > bare, "roll-up must add switch loading");
    }

    #[test]
    fn indexed_data_pairs_orthogonal_channels() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let data = graph.indexed_data();
        assert_eq!(data.len(), 4 + 2 * arch.segments().len());
        let chanx = &data[4];
        let ortho = chanx.ortho_cost_index.unwrap() as usize;
        assert_eq!(data[ortho].ortho_cost_index, Some(4));
    }

    #[test]
    fn slot_rejects_second_graph() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let second = graph.clone();
        let mut slot = RrGraphSlot::new();
        slot.install(graph).unwrap();
        assert!(matches!(
            slot.install(second),
            Err(RrError::GraphAlreadyBuilt)
        ));
        slot.free();
        assert!(slot.graph().is_none());
    }

    /// Finds a trace from a net's SOURCE to each of its SINK terminals by
    /// breadth-first search over the graph's own edges.
    fn route_net(graph: &RrGraph, net: NetId) -> Trace {
        let terminals = graph.net_terminals(net);
        let source = terminals[0];
        let mut trace: Trace = Vec::new();
        let mut in_tree: Vec<RrNodeId> = vec![source];

        for &target in &terminals[1..] {
            // BFS from any node already in the tree.
            let mut parents: HashMap<RrNodeId, (RrNodeId, SwitchId)> = HashMap::new();
            let mut queue: VecDeque<RrNodeId> = in_tree.iter().copied().collect();
            let mut seen: std::collections::HashSet<RrNodeId> =
                in_tree.iter().copied().collect();
            while let Some(at) = queue.pop_front() {
                if at == target {
                    break;
                }
                for edge in &graph.node(at).edges {
                    if seen.insert(edge.to) {
                        parents.insert(edge.to, (at, edge.switch));
                        queue.push_back(edge.to);
                    }
                }
            }
            // Walk back from the target to the tree.
            let mut rev = vec![target];
            let mut at = target;
            while let Some(&(parent, _)) = parents.get(&at) {
                rev.push(parent);
                at = parent;
                if in_tree.contains(&at) {
                    break;
                }
            }
            rev.reverse();
            if !trace.is_empty() {
                // Branch restart: repeat the attachment node after the sink.
                let attach = rev[0];
                trace.push(TraceStep {
                    node: attach,
                    switch: None,
                });
                // Overwrite its switch by the edge used to leave it.
            }
            for window in rev.windows(2) {
                let (from, to) = (window[0], window[1]);
                let switch = graph
                    .node(from)
                    .edges
                    .iter()
                    .find(|e| e.to == to)
                    .map(|e| e.switch);
                if trace.last().map(|s| s.node) == Some(from) {
                    let last = trace.last_mut().unwrap();
                    last.switch = switch;
                } else {
                    trace.push(TraceStep { node: from, switch });
                }
            }
            trace.push(TraceStep {
                node: target,
                switch: None,
            });
            for step in &rev {
                if !in_tree.contains(step) {
                    in_tree.push(*step);
                }
            }
        }
        trace
    }

    fn all_routes(graph: &RrGraph, netlist: &Netlist) -> Vec<Trace> {
        netlist
            .nets()
            .map(|(net_id, net)| {
                if net.is_global {
                    Vec::new()
                } else {
                    route_net(graph, net_id)
                }
            })
            .collect()
    }

    #[test]
    fn bfs_routes_pass_the_route_checker() {
        let (arch, nl) = small_design();
        let mut graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let traces = all_routes(&graph, &nl);
        check_route(&mut graph, &arch, &nl, &traces, &[]).unwrap();
    }

    #[test]
    fn route_checker_rejects_nonadjacent_jump() {
        let (arch, nl) = small_design();
        let mut graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let mut traces = all_routes(&graph, &nl);

        // Splice a far-away wire into the middle of the first trace.
        let (stranger, _) = graph
            .nodes()
            .find(|(id, n)| {
                n.kind == RrKind::Chanx && !traces[0].iter().any(|s| s.node == *id)
            })
            .unwrap();
        traces[0].insert(
            1,
            TraceStep {
                node: stranger,
                switch: Some(SwitchId::from_raw(1)),
            },
        );
        let err = check_route(&mut graph, &arch, &nl, &traces, &[]).unwrap_err();
        assert!(err
            .to_string()
            .contains("non-adjacent segments in traceback"));
    }

    #[test]
    fn route_checker_rejects_missing_sink() {
        let (arch, nl) = small_design();
        let mut graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let mut traces = all_routes(&graph, &nl);
        traces[0].pop(); // drop the final SINK
        let err = check_route(&mut graph, &arch, &nl, &traces, &[]).unwrap_err();
        assert!(matches!(
            err,
            RouteCheckError::TraceEndsEarly { .. } | RouteCheckError::PinNotReached { .. }
        ));
    }

    #[test]
    fn route_checker_rejects_overuse() {
        let (arch, nl) = small_design();
        let mut graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let mut traces = all_routes(&graph, &nl);
        // Route the second net straight through the first net's wires by
        // rerouting it identically; the shared wire goes over capacity.
        traces[1] = traces[0].clone();
        let err = check_route(&mut graph, &arch, &nl, &traces, &[]).unwrap_err();
        assert!(matches!(
            err,
            RouteCheckError::Overused { .. } | RouteCheckError::BadSource { .. }
        ));
    }

    #[test]
    fn local_opin_reservations_are_validated() {
        let (arch, nl) = small_design();
        let mut graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let traces = all_routes(&graph, &nl);
        let clb = nl.cluster_at(GridLoc::new(1, 1)).unwrap();

        // A SINK node is not an OPIN: the reservation must be rejected.
        let (sink_node, _) = graph
            .nodes()
            .find(|(_, n)| n.kind == RrKind::Sink)
            .unwrap();
        let bad = LocalOpin {
            block: clb,
            class: arch.class_of_pin(4),
            node: sink_node,
        };
        let err = check_route(&mut graph, &arch, &nl, &traces, &[bad]).unwrap_err();
        assert!(matches!(err, RouteCheckError::LocalOpinMismatch { .. }));
    }

    #[test]
    fn graph_serde_roundtrip() {
        let (arch, nl) = small_design();
        let graph = build(&arch, &nl, RouteKind::Detailed, SwitchBlockKind::Subset, 4);
        let json = serde_json::to_string(&graph).unwrap();
        let restored: RrGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.num_nodes(), graph.num_nodes());
        let sink = DiagnosticSink::new();
        check_rr_graph(&restored, &arch, &sink).unwrap();
    }
}
