//! Timing graph data structures.
//!
//! Every used pin of the placed netlist becomes a timing node; delays live
//! on the edges, never on the nodes. Pads contribute a source/sink pair so
//! their fixed delays have an edge to sit on, sequential subblocks
//! contribute a clock-driven source and a data sink, and constant
//! generators contribute a dummy source whose huge negative edge delay makes
//! their outputs available before any real signal.

use crate::ids::TimingNodeId;
use serde::{Deserialize, Serialize};
use tessera_netlist::{BlockId, NetId};

/// Delay used on a constant generator's dummy input edge: far enough below
/// any realistic path delay to behave as minus infinity.
pub const T_CONSTANT_GENERATOR: f64 = -1.0e3;

/// The role a timing node plays.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TimingNodeKind {
    /// Off-chip side of an input pad; a graph source.
    InpadSource,
    /// The output an input pad drives into the fabric.
    InpadOpin,
    /// The input an output pad receives from the fabric.
    OutpadIpin,
    /// Off-chip side of an output pad; a graph sink.
    OutpadSink,
    /// A used cluster input pin.
    ClbIpin,
    /// A used cluster output pin.
    ClbOpin,
    /// A used subblock LUT input.
    SubblkIpin,
    /// A used subblock output.
    SubblkOpin,
    /// The clock entry of a sequential subblock; releases its output.
    FfSource,
    /// The data capture point of a sequential subblock; a graph sink.
    FfSink,
    /// The dummy input of a constant generator; a graph source.
    ConstantGenSource,
}

impl TimingNodeKind {
    /// Returns `true` for kinds that never have in-edges.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            TimingNodeKind::InpadSource | TimingNodeKind::ConstantGenSource
        )
    }

    /// Returns `true` for kinds that never have out-edges.
    pub fn is_sink(self) -> bool {
        matches!(self, TimingNodeKind::OutpadSink | TimingNodeKind::FfSink)
    }
}

/// A delay-annotated edge of the timing graph.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TimingEdge {
    /// The downstream node.
    pub to: TimingNodeId,
    /// Propagation delay along the edge, in seconds.
    pub delay: f64,
}

/// One timing node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tnode {
    /// The node's role.
    pub kind: TimingNodeKind,
    /// The block that owns the pin.
    pub block: BlockId,
    /// The cluster (or pad) pin index, where meaningful.
    pub pin: Option<u16>,
    /// The subblock index, for subblock-owned nodes.
    pub subblock: Option<u16>,
    /// Out-edges with their delays.
    pub edges: Vec<TimingEdge>,
    /// Arrival time computed by the forward pass.
    pub t_arr: f64,
    /// Required time computed by the backward pass.
    pub t_req: f64,
}

impl Tnode {
    pub(crate) fn new(kind: TimingNodeKind, block: BlockId) -> Self {
        Self {
            kind,
            block,
            pin: None,
            subblock: None,
            edges: Vec::new(),
            t_arr: 0.0,
            t_req: 0.0,
        }
    }
}

/// The timing graph over a placed netlist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingGraph {
    pub(crate) tnodes: Vec<Tnode>,
    /// The timing node driving each net.
    pub(crate) net_to_driver: Vec<TimingNodeId>,
    /// Topological levels; `levels[0]` holds every source.
    pub(crate) levels: Vec<Vec<TimingNodeId>>,
    /// Nodes with no out-edges.
    pub(crate) num_sinks: usize,
}

impl TimingGraph {
    /// Number of timing nodes.
    pub fn num_nodes(&self) -> usize {
        self.tnodes.len()
    }

    /// One node.
    pub fn node(&self, id: TimingNodeId) -> &Tnode {
        &self.tnodes[id.index()]
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (TimingNodeId, &Tnode)> {
        self.tnodes
            .iter()
            .enumerate()
            .map(|(i, n)| (TimingNodeId::from_raw(i as u32), n))
    }

    /// The timing node driving a net.
    pub fn net_driver(&self, net: NetId) -> TimingNodeId {
        self.net_to_driver[net.index()]
    }

    /// The topological levelisation; every edge goes from a lower level to
    /// a higher one.
    pub fn levels(&self) -> &[Vec<TimingNodeId>] {
        &self.levels
    }

    /// Number of sink nodes (no out-edges).
    pub fn num_sinks(&self) -> usize {
        self.num_sinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_sink_kind_partition() {
        assert!(TimingNodeKind::InpadSource.is_source());
        assert!(TimingNodeKind::ConstantGenSource.is_source());
        assert!(!TimingNodeKind::FfSource.is_source());
        assert!(TimingNodeKind::FfSink.is_sink());
        assert!(TimingNodeKind::OutpadSink.is_sink());
        assert!(!TimingNodeKind::ClbOpin.is_sink());
    }

    #[test]
    fn constant_generator_delay_is_far_negative() {
        assert!(T_CONSTANT_GENERATOR < -1.0);
    }

    #[test]
    fn tnode_serde_roundtrip() {
        let mut node = Tnode::new(TimingNodeKind::ClbIpin, BlockId::from_raw(3));
        node.pin = Some(2);
        node.edges.push(TimingEdge {
            to: TimingNodeId::from_raw(7),
            delay: 1.5e-10,
        });
        let json = serde_json::to_string(&node).unwrap();
        let restored: Tnode = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.kind, TimingNodeKind::ClbIpin);
        assert_eq!(restored.edges.len(), 1);
    }
}
