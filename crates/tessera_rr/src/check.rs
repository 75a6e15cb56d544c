//! Structural and semantic validation of a built RR-graph.
//!
//! Every check here re-derives a property the builder already guaranteed;
//! redundancy is the point. The checker fails on the first violation, with
//! node ids in the error.

use crate::error::RrError;
use crate::graph::{RouteKind, RrGraph};
use crate::ids::RrNodeId;
use crate::node::{
    RrKind, IPIN_COST_INDEX, OPIN_COST_INDEX, SINK_COST_INDEX, SOURCE_COST_INDEX,
};
use tessera_arch::{Architecture, BlockKind, ClassId, ClassKind};
use tessera_common::GridLoc;
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Validates every node and edge of the graph against the architecture.
pub fn check_rr_graph(
    graph: &RrGraph,
    arch: &Architecture,
    sink: &DiagnosticSink,
) -> Result<(), RrError> {
    let mut in_degree = vec![0usize; graph.num_nodes()];
    for (id, node) in graph.nodes() {
        check_edges(graph, arch, id, node.kind, &mut in_degree)?;
    }

    for (id, node) in graph.nodes() {
        check_coords(graph, arch, id)?;
        check_ptc_and_capacity(graph, arch, id)?;

        if node.occ > node.capacity {
            return Err(RrError::OverCapacity {
                node: id,
                occ: node.occ,
                capacity: node.capacity,
            });
        }

        // Degree checks: a SOURCE fans out to exactly its class's driver
        // pins, a SINK collects exactly its class's receiver pins.
        let loc = GridLoc::new(node.xlow, node.ylow);
        let at_clb = arch.grid().block_kind_at(loc) == BlockKind::Clb;
        match node.kind {
            RrKind::Source => {
                let expected = if at_clb {
                    arch.class(ClassId::from_raw(node.ptc)).pins.len()
                } else {
                    1
                };
                if node.edges.len() != expected {
                    return Err(RrError::WrongClassDegree {
                        node: id,
                        kind: node.kind,
                        class: node.ptc,
                        actual: node.edges.len(),
                        expected,
                    });
                }
            }
            RrKind::Sink => {
                let expected = if at_clb {
                    arch.class(ClassId::from_raw(node.ptc)).pins.len()
                } else {
                    1
                };
                if in_degree[id.index()] != expected {
                    return Err(RrError::WrongClassDegree {
                        node: id,
                        kind: node.kind,
                        class: node.ptc,
                        actual: in_degree[id.index()],
                        expected,
                    });
                }
            }
            RrKind::Ipin => {
                if node.edges.len() != 1 {
                    return Err(RrError::WrongClassDegree {
                        node: id,
                        kind: node.kind,
                        class: node.ptc,
                        actual: node.edges.len(),
                        expected: 1,
                    });
                }
            }
            RrKind::Opin => {
                if node.edges.is_empty() {
                    return Err(RrError::OpinUnconnected {
                        loc,
                        ptc: node.ptc,
                    });
                }
            }
            RrKind::Chanx | RrKind::Chany => {
                if node.edges.is_empty() {
                    sink.emit(Diagnostic::warning(
                        DiagnosticCode::new(Category::Routing, 3),
                        format!("wire {} has no fanout", graph.describe_node(id)),
                    ));
                }
            }
        }

        // Round trip through the keyed lookup.
        let found = graph.rr_node_index(loc, node.kind, node.ptc)?;
        if found != id {
            return Err(RrError::NoSuchNode {
                loc,
                kind: node.kind,
                ptc: node.ptc,
            });
        }
    }
    Ok(())
}

/// Coordinate sanity: spans lie inside the device, wires are straight and
/// within the channel ranges, everything else occupies one location.
fn check_coords(graph: &RrGraph, arch: &Architecture, id: RrNodeId) -> Result<(), RrError> {
    let node = graph.node(id);
    let grid = arch.grid();
    let (nx, ny) = (grid.nx(), grid.ny());
    let bad = || RrError::NodeOutOfBounds {
        node: id,
        kind: node.kind,
        xlow: node.xlow,
        ylow: node.ylow,
        xhigh: node.xhigh,
        yhigh: node.yhigh,
    };

    if node.xlow > node.xhigh || node.ylow > node.yhigh {
        return Err(bad());
    }
    match node.kind {
        RrKind::Chanx => {
            if node.ylow != node.yhigh
                || node.xlow < 1
                || node.xhigh > nx
                || node.ylow < 0
                || node.ylow > ny
            {
                return Err(bad());
            }
        }
        RrKind::Chany => {
            if node.xlow != node.xhigh
                || node.ylow < 1
                || node.yhigh > ny
                || node.xlow < 0
                || node.xlow > nx
            {
                return Err(bad());
            }
        }
        _ => {
            if node.xlow != node.xhigh || node.ylow != node.yhigh {
                return Err(bad());
            }
            let host = grid.block_kind_at(GridLoc::new(node.xlow, node.ylow));
            if !matches!(host, BlockKind::Clb | BlockKind::Io) {
                return Err(bad());
            }
        }
    }
    Ok(())
}

/// Ptc ranges, ptc-to-class mapping, cost indices and capacities.
fn check_ptc_and_capacity(
    graph: &RrGraph,
    arch: &Architecture,
    id: RrNodeId,
) -> Result<(), RrError> {
    let node = graph.node(id);
    let loc = GridLoc::new(node.xlow, node.ylow);
    let at_clb = arch.grid().block_kind_at(loc) == BlockKind::Clb;
    let w = graph.channel_width();

    let ptc_limit = match (node.kind, at_clb) {
        (RrKind::Chanx | RrKind::Chany, _) => w,
        (RrKind::Source | RrKind::Sink, true) => arch.num_classes() as u32,
        (RrKind::Ipin | RrKind::Opin, true) => arch.pins_per_clb() as u32,
        (_, false) => arch.io_rat() as u32,
    };
    if node.ptc >= ptc_limit {
        return Err(RrError::PtcOutOfRange {
            node: id,
            kind: node.kind,
            ptc: node.ptc,
            limit: ptc_limit,
        });
    }

    if at_clb {
        let class_kind = match node.kind {
            RrKind::Source | RrKind::Sink => {
                Some(arch.class(ClassId::from_raw(node.ptc)).kind)
            }
            RrKind::Ipin | RrKind::Opin => Some(arch.pin_kind(node.ptc as u16)),
            _ => None,
        };
        let expected = match node.kind {
            RrKind::Source | RrKind::Opin => Some(ClassKind::Driver),
            RrKind::Sink | RrKind::Ipin => Some(ClassKind::Receiver),
            _ => None,
        };
        if class_kind != expected && expected.is_some() {
            return Err(RrError::PtcClassMismatch {
                node: id,
                kind: node.kind,
                ptc: node.ptc,
            });
        }
    }

    let expected_capacity = match node.kind {
        RrKind::Source | RrKind::Sink if at_clb => {
            arch.class(ClassId::from_raw(node.ptc)).pins.len() as u32
        }
        RrKind::Source | RrKind::Sink => 1,
        RrKind::Ipin | RrKind::Opin => 1,
        RrKind::Chanx | RrKind::Chany => match graph.route_kind() {
            RouteKind::Detailed => 1,
            RouteKind::Global => node.capacity.max(1),
        },
    };
    if node.capacity != expected_capacity {
        return Err(RrError::WrongCapacity {
            node: id,
            kind: node.kind,
            actual: node.capacity,
            expected: expected_capacity,
        });
    }

    let expected_cost = match node.kind {
        RrKind::Source => Some(SOURCE_COST_INDEX),
        RrKind::Sink => Some(SINK_COST_INDEX),
        RrKind::Opin => Some(OPIN_COST_INDEX),
        RrKind::Ipin => Some(IPIN_COST_INDEX),
        _ => None,
    };
    if let Some(expected) = expected_cost {
        if node.cost_index != expected {
            return Err(RrError::PtcClassMismatch {
                node: id,
                kind: node.kind,
                ptc: node.ptc,
            });
        }
    } else if node.cost_index as usize >= graph.indexed_data().len() {
        return Err(RrError::PtcOutOfRange {
            node: id,
            kind: node.kind,
            ptc: node.cost_index,
            limit: graph.indexed_data().len() as u32,
        });
    }
    Ok(())
}

/// Edge targets, switch ids and kind-pair legality; accumulates in-degrees.
fn check_edges(
    graph: &RrGraph,
    arch: &Architecture,
    id: RrNodeId,
    from_kind: RrKind,
    in_degree: &mut [usize],
) -> Result<(), RrError> {
    for edge in &graph.node(id).edges {
        if edge.to.index() >= graph.num_nodes() {
            return Err(RrError::DanglingEdge { from: id, to: edge.to });
        }
        if edge.switch.index() >= arch.switches().len() {
            return Err(RrError::UnknownSwitch {
                from: id,
                switch: edge.switch,
            });
        }
        let to_kind = graph.node(edge.to).kind;
        if !from_kind.may_connect_to(to_kind) {
            return Err(RrError::IllegalEdgeKinds {
                from: id,
                from_kind,
                to: edge.to,
                to_kind,
            });
        }
        in_degree[edge.to.index()] += 1;
    }
    Ok(())
}
