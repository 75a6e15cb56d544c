//! Trace-walk validation of a produced routing.
//!
//! A routing is a per-net sequence of `(node, switch)` steps. The checker
//! re-derives every node's occupancy from the traces, then walks each trace
//! verifying that it starts at the net's SOURCE, forms a tree, only ever
//! crosses physically adjacent resources, and reaches every sink pin exactly
//! once.

use crate::error::RrError;
use crate::graph::RrGraph;
use crate::ids::RrNodeId;
use crate::node::RrKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_arch::{Architecture, BlockKind, ClassId, SwitchId};
use tessera_common::{GridLoc, Side};
use tessera_netlist::{BlockId, NetId, Netlist};
use thiserror::Error;

/// One step of a routed net's trace.
///
/// `switch` names the switch used to leave this node towards the next step;
/// it is `None` on SINK steps and on the final step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TraceStep {
    /// The resource visited.
    pub node: RrNodeId,
    /// Switch used to leave it, if any.
    pub switch: Option<SwitchId>,
}

/// The full trace of one net, driver to last sink.
pub type Trace = Vec<TraceStep>;

/// An OPIN reserved to feed a purely cluster-internal path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LocalOpin {
    /// The cluster the OPIN belongs to.
    pub block: BlockId,
    /// The class the reservation was made for.
    pub class: ClassId,
    /// The reserved OPIN node.
    pub node: RrNodeId,
}

/// A violation found while checking a routing.
#[derive(Debug, Error)]
pub enum RouteCheckError {
    /// The trace table does not cover every net.
    #[error("got traces for {actual} nets, netlist has {expected}")]
    TraceCountMismatch {
        /// Traces supplied.
        actual: usize,
        /// Nets in the netlist.
        expected: usize,
    },
    /// A non-global net has no routing.
    #[error("net {net} has no routing")]
    EmptyRoute {
        /// The unrouted net.
        net: NetId,
    },
    /// A trace names a node outside the graph.
    #[error("net {net} visits nonexistent node {node}")]
    BadNodeId {
        /// The offending net.
        net: NetId,
        /// The out-of-range node.
        node: RrNodeId,
    },
    /// A routing resource is used beyond its capacity.
    #[error("{description} is overused")]
    Overused {
        /// Description of the overused node.
        description: String,
    },
    /// A trace step carries the wrong kind of switch annotation.
    #[error("net {net}: node {node} leaves via invalid switch")]
    BadSwitch {
        /// The offending net.
        net: NetId,
        /// The node with the bad annotation.
        node: RrNodeId,
    },
    /// The first node of a trace is not the net's SOURCE.
    #[error("net {net} does not begin at its SOURCE (starts at node {node})")]
    BadSource {
        /// The offending net.
        net: NetId,
        /// The first node of the trace.
        node: RrNodeId,
    },
    /// Two successive trace nodes are not connected in the fabric.
    #[error("net {net}: non-adjacent segments in traceback ({from} -> {to})")]
    NonAdjacent {
        /// The offending net.
        net: NetId,
        /// The earlier node.
        from: RrNodeId,
        /// The unreachable successor.
        to: RrNodeId,
    },
    /// The graph and the physical rules disagree about an adjacency.
    #[error("net {net}: adjacency of {from} -> {to} is ambiguous")]
    AdjacencyOvercount {
        /// The offending net.
        net: NetId,
        /// The earlier node.
        from: RrNodeId,
        /// The successor.
        to: RrNodeId,
    },
    /// A branch of the trace does not reconnect to the routed tree.
    #[error("net {net}: node {node} does not link into the existing routing")]
    DisconnectedBranch {
        /// The offending net.
        net: NetId,
        /// The disconnected node.
        node: RrNodeId,
    },
    /// The route revisits a non-SINK node.
    #[error("net {net}: routing is not a tree (node {node} revisited)")]
    NotATree {
        /// The offending net.
        net: NetId,
        /// The revisited node.
        node: RrNodeId,
    },
    /// A visited SINK matches no outstanding terminal of the net.
    #[error("net {net}: node {node} is not a terminal of the net")]
    SinkNotATerminal {
        /// The offending net.
        net: NetId,
        /// The stray sink.
        node: RrNodeId,
    },
    /// A visited SINK matches several terminals at once.
    #[error("net {net}: sink {node} matches {count} terminals")]
    SinkOvermatched {
        /// The offending net.
        net: NetId,
        /// The ambiguous sink.
        node: RrNodeId,
        /// Terminals matched.
        count: usize,
    },
    /// The trace ends somewhere other than a SINK.
    #[error("net {net} does not end at a SINK")]
    TraceEndsEarly {
        /// The offending net.
        net: NetId,
    },
    /// Some net pin was never reached.
    #[error("net {net} does not connect to pin {pin}")]
    PinNotReached {
        /// The offending net.
        net: NetId,
        /// The unreached pin index.
        pin: usize,
    },
    /// A reserved local OPIN is not an OPIN of the expected class.
    #[error("block {block}: local OPIN reservation {node} is not an OPIN of class {class}")]
    LocalOpinMismatch {
        /// The reserving block.
        block: BlockId,
        /// The expected class.
        class: ClassId,
        /// The offending node.
        node: RrNodeId,
    },
    /// A structural error surfaced while walking the graph.
    #[error(transparent)]
    Graph(#[from] RrError),
}

/// Validates a complete routing against the graph and netlist.
///
/// Recomputes occupancy from scratch (including locally-used OPINs), then
/// walks every non-global net's trace. Fails fast on the first violation.
pub fn check_route(
    graph: &mut RrGraph,
    arch: &Architecture,
    netlist: &Netlist,
    traces: &[Trace],
    local_opins: &[LocalOpin],
) -> Result<(), RouteCheckError> {
    if traces.len() != netlist.num_nets() {
        return Err(RouteCheckError::TraceCountMismatch {
            actual: traces.len(),
            expected: netlist.num_nets(),
        });
    }

    recompute_occupancy(graph, netlist, traces, local_opins)?;
    for (id, node) in graph.nodes() {
        if node.occ > node.capacity {
            return Err(RouteCheckError::Overused {
                description: graph.describe_node(id),
            });
        }
    }
    check_local_opins(graph, arch, local_opins)?;

    for (net_id, net) in netlist.nets() {
        if net.is_global {
            continue;
        }
        check_net_trace(graph, arch, netlist, net_id, &traces[net_id.index()])?;
    }
    Ok(())
}

/// Recomputes every node's occupancy from the traces.
///
/// Each visit adds one, except the step immediately after a SINK, which
/// re-enters a node already counted (the start of a new branch).
fn recompute_occupancy(
    graph: &mut RrGraph,
    netlist: &Netlist,
    traces: &[Trace],
    local_opins: &[LocalOpin],
) -> Result<(), RouteCheckError> {
    graph.clear_occupancy();
    for (net_id, net) in netlist.nets() {
        if net.is_global {
            continue;
        }
        let trace = &traces[net_id.index()];
        let mut idx = 0;
        while idx < trace.len() {
            let node = trace[idx].node;
            if node.index() >= graph.num_nodes() {
                return Err(RouteCheckError::BadNodeId { net: net_id, node });
            }
            graph.node_mut(node).occ += 1;
            idx += if graph.node(node).kind == RrKind::Sink {
                2
            } else {
                1
            };
        }
    }
    for reserved in local_opins {
        if reserved.node.index() >= graph.num_nodes() {
            return Err(RouteCheckError::LocalOpinMismatch {
                block: reserved.block,
                class: reserved.class,
                node: reserved.node,
            });
        }
        graph.node_mut(reserved.node).occ += 1;
    }
    Ok(())
}

/// Verifies that each reserved local OPIN really is an OPIN of the class it
/// was reserved for.
fn check_local_opins(
    graph: &RrGraph,
    arch: &Architecture,
    local_opins: &[LocalOpin],
) -> Result<(), RouteCheckError> {
    for reserved in local_opins {
        let node = graph.node(reserved.node);
        let matches = node.kind == RrKind::Opin
            && arch.class_of_pin(node.ptc as u16) == reserved.class;
        if !matches {
            return Err(RouteCheckError::LocalOpinMismatch {
                block: reserved.block,
                class: reserved.class,
                node: reserved.node,
            });
        }
    }
    Ok(())
}

fn check_net_trace(
    graph: &RrGraph,
    arch: &Architecture,
    netlist: &Netlist,
    net_id: NetId,
    trace: &Trace,
) -> Result<(), RouteCheckError> {
    let net = netlist.net(net_id);
    let Some(first) = trace.first() else {
        return Err(RouteCheckError::EmptyRoute { net: net_id });
    };

    let mut pin_done = vec![false; net.num_pins()];
    let mut connected: HashSet<RrNodeId> = HashSet::new();

    check_step_switch(graph, arch, net_id, first)?;
    if first.node != graph.net_terminals(net_id)[0] {
        return Err(RouteCheckError::BadSource {
            net: net_id,
            node: first.node,
        });
    }
    check_source(graph, netlist, net_id, first.node)?;
    connected.insert(first.node);
    pin_done[0] = true;

    let mut prev = first.node;
    for step in &trace[1..] {
        if step.node.index() >= graph.num_nodes() {
            return Err(RouteCheckError::BadNodeId {
                net: net_id,
                node: step.node,
            });
        }
        check_step_switch(graph, arch, net_id, step)?;

        if graph.node(prev).kind == RrKind::Sink {
            // A new branch must begin somewhere on the already-routed tree.
            if !connected.contains(&step.node) {
                return Err(RouteCheckError::DisconnectedBranch {
                    net: net_id,
                    node: step.node,
                });
            }
        } else {
            if !check_adjacent(graph, arch, net_id, prev, step.node)? {
                return Err(RouteCheckError::NonAdjacent {
                    net: net_id,
                    from: prev,
                    to: step.node,
                });
            }
            let kind = graph.node(step.node).kind;
            if connected.contains(&step.node) && kind != RrKind::Sink {
                return Err(RouteCheckError::NotATree {
                    net: net_id,
                    node: step.node,
                });
            }
            connected.insert(step.node);
            if kind == RrKind::Sink {
                check_sink(graph, netlist, arch, net_id, step.node, &mut pin_done)?;
            }
        }
        prev = step.node;
    }

    if graph.node(prev).kind != RrKind::Sink {
        return Err(RouteCheckError::TraceEndsEarly { net: net_id });
    }
    if let Some(pin) = pin_done.iter().position(|done| !done) {
        return Err(RouteCheckError::PinNotReached { net: net_id, pin });
    }
    Ok(())
}

/// A SINK step carries no switch; every other step names a real switch.
fn check_step_switch(
    graph: &RrGraph,
    arch: &Architecture,
    net: NetId,
    step: &TraceStep,
) -> Result<(), RouteCheckError> {
    let is_sink = graph.node(step.node).kind == RrKind::Sink;
    let valid = match step.switch {
        None => is_sink,
        Some(switch) => !is_sink && switch.index() < arch.switches().len(),
    };
    if valid {
        Ok(())
    } else {
        Err(RouteCheckError::BadSwitch {
            net,
            node: step.node,
        })
    }
}

/// The first node must be the SOURCE of the net's driver block.
fn check_source(
    graph: &RrGraph,
    netlist: &Netlist,
    net_id: NetId,
    node_id: RrNodeId,
) -> Result<(), RouteCheckError> {
    let node = graph.node(node_id);
    let bad = || RouteCheckError::BadSource {
        net: net_id,
        node: node_id,
    };
    if node.kind != RrKind::Source {
        return Err(bad());
    }
    let driver = netlist.net(net_id).driver();
    let block = netlist.block(driver.block);
    if block.loc != GridLoc::new(node.xlow, node.ylow) {
        return Err(bad());
    }
    match driver.pin {
        Some(_) => Ok(()), // class match established against net_terminals
        None => {
            let loc = block.loc;
            let pads = netlist.blocks_at(loc);
            if pads.get(node.ptc as usize) != Some(&driver.block) {
                return Err(bad());
            }
            Ok(())
        }
    }
}

/// Matches a visited SINK against one outstanding terminal of the net.
fn check_sink(
    graph: &RrGraph,
    netlist: &Netlist,
    arch: &Architecture,
    net_id: NetId,
    node_id: RrNodeId,
    pin_done: &mut [bool],
) -> Result<(), RouteCheckError> {
    let node = graph.node(node_id);
    let loc = GridLoc::new(node.xlow, node.ylow);
    let net = netlist.net(net_id);
    let mut matched = 0;

    if let Some(cluster) = netlist.cluster_at(loc) {
        for (ipin, terminal) in net.pins.iter().enumerate().skip(1) {
            if terminal.block != cluster {
                continue;
            }
            let Some(pin) = terminal.pin else { continue };
            if arch.class_of_pin(pin).as_raw() == node.ptc && !pin_done[ipin] {
                // Several logically-equivalent terminals may share a class;
                // take the first outstanding one.
                pin_done[ipin] = true;
                matched += 1;
                break;
            }
        }
    } else {
        let pads = netlist.blocks_at(loc);
        let Some(&pad_block) = pads.get(node.ptc as usize) else {
            return Err(RouteCheckError::SinkNotATerminal {
                net: net_id,
                node: node_id,
            });
        };
        for (ipin, terminal) in net.pins.iter().enumerate() {
            if terminal.block == pad_block {
                pin_done[ipin] = true;
                matched += 1;
            }
        }
    }

    match matched {
        0 => Err(RouteCheckError::SinkNotATerminal {
            net: net_id,
            node: node_id,
        }),
        1 => Ok(()),
        count => Err(RouteCheckError::SinkOvermatched {
            net: net_id,
            node: node_id,
            count,
        }),
    }
}

/// Verifies both that the graph has an edge `from -> to` and that the two
/// resources are physically adjacent.
fn check_adjacent(
    graph: &RrGraph,
    arch: &Architecture,
    net_id: NetId,
    from: RrNodeId,
    to: RrNodeId,
) -> Result<bool, RouteCheckError> {
    let from_node = graph.node(from);
    if !from_node.edges.iter().any(|e| e.to == to) {
        return Ok(false);
    }

    let to_node = graph.node(to);
    let same_loc = from_node.xlow == to_node.xlow && from_node.ylow == to_node.ylow;
    let num_adj = match (from_node.kind, to_node.kind) {
        (RrKind::Source, RrKind::Opin) if same_loc => {
            let at_clb = arch.grid().block_kind_at(GridLoc::new(to_node.xlow, to_node.ylow))
                == BlockKind::Clb;
            if at_clb {
                (arch.class_of_pin(to_node.ptc as u16).as_raw() == from_node.ptc) as u32
            } else {
                (to_node.ptc == from_node.ptc) as u32
            }
        }
        (RrKind::Sink, RrKind::Source) if same_loc => {
            // Feedthrough through a cluster; accepted but never built.
            (arch.grid().block_kind_at(GridLoc::new(to_node.xlow, to_node.ylow))
                == BlockKind::Clb) as u32
        }
        (RrKind::Ipin, RrKind::Sink) if same_loc => {
            let at_clb = arch.grid().block_kind_at(GridLoc::new(from_node.xlow, from_node.ylow))
                == BlockKind::Clb;
            if at_clb {
                (arch.class_of_pin(from_node.ptc as u16).as_raw() == to_node.ptc) as u32
            } else {
                (from_node.ptc == to_node.ptc) as u32
            }
        }
        (RrKind::Opin, RrKind::Chanx | RrKind::Chany) => {
            pin_chan_adjacent(arch, graph, from, to)
        }
        (RrKind::Chanx | RrKind::Chany, RrKind::Ipin) => {
            pin_chan_adjacent(arch, graph, to, from)
        }
        (RrKind::Chanx, RrKind::Chanx) => {
            if from_node.ylow == to_node.ylow
                && (to_node.xhigh == from_node.xlow - 1 || from_node.xhigh == to_node.xlow - 1)
            {
                1
            } else {
                0
            }
        }
        (RrKind::Chany, RrKind::Chany) => {
            if from_node.xlow == to_node.xlow
                && (to_node.yhigh == from_node.ylow - 1 || from_node.yhigh == to_node.ylow - 1)
            {
                1
            } else {
                0
            }
        }
        (RrKind::Chanx, RrKind::Chany) => chanx_chany_adjacent(graph, from, to),
        (RrKind::Chany, RrKind::Chanx) => chanx_chany_adjacent(graph, to, from),
        _ => 0,
    };

    match num_adj {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(RouteCheckError::AdjacencyOvercount {
            net: net_id,
            from,
            to,
        }),
    }
}

/// Physical adjacency of a CHANX/CHANY pair: spans intersect within one
/// unit at the crossing.
fn chanx_chany_adjacent(graph: &RrGraph, chanx: RrNodeId, chany: RrNodeId) -> u32 {
    let x = graph.node(chanx);
    let y = graph.node(chany);
    if y.ylow > x.ylow + 1 || y.yhigh < x.ylow {
        return 0;
    }
    if x.xlow > y.xlow + 1 || x.xhigh < y.xlow {
        return 0;
    }
    1
}

/// Physical adjacency of a pin (OPIN or IPIN) and a channel segment: the
/// pin's block faces the channel on that side and the pin's coordinate
/// falls within the wire's span.
fn pin_chan_adjacent(
    arch: &Architecture,
    graph: &RrGraph,
    pin: RrNodeId,
    chan: RrNodeId,
) -> u32 {
    let pin_node = graph.node(pin);
    let chan_node = graph.node(chan);
    let (pin_x, pin_y) = (pin_node.xlow, pin_node.ylow);
    let grid = arch.grid();
    let (nx, ny) = (grid.nx(), grid.ny());
    let mut num_adj = 0;

    if grid.block_kind_at(GridLoc::new(pin_x, pin_y)) == BlockKind::Clb {
        let ptc = pin_node.ptc as u16;
        match chan_node.kind {
            RrKind::Chanx => {
                let in_span = pin_x >= chan_node.xlow && pin_x <= chan_node.xhigh;
                if chan_node.ylow == pin_y && arch.pin_on_side(ptc, Side::Top) && in_span {
                    num_adj += 1;
                } else if chan_node.ylow == pin_y - 1
                    && arch.pin_on_side(ptc, Side::Bottom)
                    && in_span
                {
                    num_adj += 1;
                }
            }
            RrKind::Chany => {
                let in_span = pin_y >= chan_node.ylow && pin_y <= chan_node.yhigh;
                if chan_node.xlow == pin_x && arch.pin_on_side(ptc, Side::Right) && in_span {
                    num_adj += 1;
                } else if chan_node.xlow == pin_x - 1
                    && arch.pin_on_side(ptc, Side::Left)
                    && in_span
                {
                    num_adj += 1;
                }
            }
            _ => {}
        }
    } else {
        // Pads face their single adjacent channel.
        let adj = match (pin_y, pin_x) {
            (0, _) => {
                chan_node.kind == RrKind::Chanx
                    && chan_node.ylow == 0
                    && pin_x >= chan_node.xlow
                    && pin_x <= chan_node.xhigh
            }
            (y, _) if y == ny + 1 => {
                chan_node.kind == RrKind::Chanx
                    && chan_node.ylow == ny
                    && pin_x >= chan_node.xlow
                    && pin_x <= chan_node.xhigh
            }
            (_, 0) => {
                chan_node.kind == RrKind::Chany
                    && chan_node.xlow == 0
                    && pin_y >= chan_node.ylow
                    && pin_y <= chan_node.yhigh
            }
            (_, x) if x == nx + 1 => {
                chan_node.kind == RrKind::Chany
                    && chan_node.xlow == nx
                    && pin_y >= chan_node.ylow
                    && pin_y <= chan_node.yhigh
            }
            _ => false,
        };
        if adj {
            num_adj += 1;
        }
    }
    num_adj
}
