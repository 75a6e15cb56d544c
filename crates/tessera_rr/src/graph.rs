//! The routing-resource graph container.

use crate::error::RrError;
use crate::ids::RrNodeId;
use crate::index::RrSpatialIndex;
use crate::node::{RrIndexedData, RrKind, RrNode};
use crate::seg::SegDetails;
use serde::{Deserialize, Serialize};
use tessera_common::GridLoc;
use tessera_netlist::{BlockId, NetId};

/// Whether the graph models global or detailed routing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RouteKind {
    /// One aggregate track per channel; wires have channel-wide capacity.
    Global,
    /// One node per physical track; every wire has capacity 1.
    Detailed,
}

/// The routing-resource graph: a contiguous arena of typed nodes with
/// inline switched edges, plus the lookup tables routers and checkers need.
///
/// Teardown is dropping the value; [`RrGraphSlot`] models the one-graph-at-
/// a-time lifecycle of the surrounding flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrGraph {
    pub(crate) nodes: Vec<RrNode>,
    pub(crate) indexed_data: Vec<RrIndexedData>,
    pub(crate) index: RrSpatialIndex,
    /// Per net: the SOURCE of the driver followed by one SINK per net sink.
    pub(crate) net_terminals: Vec<Vec<RrNodeId>>,
    /// Per block and class: the SOURCE (driver classes) or SINK (receiver
    /// classes) aggregate in that block's cluster; `None` for pads.
    pub(crate) clb_source: Vec<Vec<Option<RrNodeId>>>,
    pub(crate) route_kind: RouteKind,
    pub(crate) channel_width: u32,
    pub(crate) seg_x: Vec<SegDetails>,
    pub(crate) seg_y: Vec<SegDetails>,
}

impl RrGraph {
    /// Number of nodes in the graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// One node.
    pub fn node(&self, id: RrNodeId) -> &RrNode {
        &self.nodes[id.index()]
    }

    /// Mutable access to one node (occupancy updates).
    pub fn node_mut(&mut self, id: RrNodeId) -> &mut RrNode {
        &mut self.nodes[id.index()]
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (RrNodeId, &RrNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (RrNodeId::from_raw(i as u32), n))
    }

    /// The cost-profile table.
    pub fn indexed_data(&self) -> &[RrIndexedData] {
        &self.indexed_data
    }

    /// Whether this graph models global or detailed routing.
    pub fn route_kind(&self) -> RouteKind {
        self.route_kind
    }

    /// Tracks per channel the graph was built with.
    pub fn channel_width(&self) -> u32 {
        self.channel_width
    }

    /// The keyed lookup: the unique node of `kind` with `ptc` at `loc`.
    pub fn rr_node_index(&self, loc: GridLoc, kind: RrKind, ptc: u32) -> Result<RrNodeId, RrError> {
        self.index.node_at(loc, kind, ptc)
    }

    /// The RR terminals of a net: its SOURCE followed by one SINK per sink.
    pub fn net_terminals(&self, net: NetId) -> &[RrNodeId] {
        &self.net_terminals[net.index()]
    }

    /// The SOURCE (driver class) or SINK (receiver class) aggregate of a
    /// block; `None` for pads.
    pub fn clb_source(&self, block: BlockId, class: u32) -> Option<RrNodeId> {
        self.clb_source[block.index()][class as usize]
    }

    /// Segmentation details of the horizontal channels.
    pub fn seg_details_x(&self) -> &[SegDetails] {
        &self.seg_x
    }

    /// Segmentation details of the vertical channels.
    pub fn seg_details_y(&self) -> &[SegDetails] {
        &self.seg_y
    }

    /// Sets every node's occupancy to zero.
    pub fn clear_occupancy(&mut self) {
        for node in &mut self.nodes {
            node.occ = 0;
        }
    }

    /// A human-readable one-node summary for error paths and debugging.
    pub fn describe_node(&self, id: RrNodeId) -> String {
        let node = self.node(id);
        let span = if node.xlow == node.xhigh && node.ylow == node.yhigh {
            format!("({}, {})", node.xlow, node.ylow)
        } else {
            format!(
                "({}, {})..({}, {})",
                node.xlow, node.ylow, node.xhigh, node.yhigh
            )
        };
        format!(
            "node {id}: {kind} {span} ptc {ptc}, {edges} edge(s), occ {occ}/{cap}",
            kind = node.kind,
            ptc = node.ptc,
            edges = node.edges.len(),
            occ = node.occ,
            cap = node.capacity,
        )
    }
}

/// Holds at most one RR-graph at a time.
///
/// The flow keeps a single slot; building into an occupied slot is the
/// duplicated-graph error, matching the one-graph lifecycle of the rest of
/// the tooling.
#[derive(Default)]
pub struct RrGraphSlot {
    graph: Option<RrGraph>,
}

impl RrGraphSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly-built graph.
    pub fn install(&mut self, graph: RrGraph) -> Result<&RrGraph, RrError> {
        if self.graph.is_some() {
            return Err(RrError::GraphAlreadyBuilt);
        }
        Ok(self.graph.insert(graph))
    }

    /// The held graph, if any.
    pub fn graph(&self) -> Option<&RrGraph> {
        self.graph.as_ref()
    }

    /// Mutable access to the held graph, if any.
    pub fn graph_mut(&mut self) -> Option<&mut RrGraph> {
        self.graph.as_mut()
    }

    /// Tears down the held graph. Safe to call on an empty slot.
    pub fn free(&mut self) {
        self.graph = None;
    }
}
