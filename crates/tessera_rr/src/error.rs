//! Fatal conditions raised while building or validating the RR-graph.

use crate::ids::RrNodeId;
use crate::node::RrKind;
use tessera_arch::SwitchId;
use tessera_common::GridLoc;
use tessera_netlist::NetId;
use thiserror::Error;

/// A fatal condition detected during RR-graph construction or checking.
#[derive(Debug, Error)]
pub enum RrError {
    /// A graph is already held by the slot being built into.
    #[error("an RR-graph already exists; free it before building another")]
    GraphAlreadyBuilt,
    /// The channel width must be at least one track.
    #[error("channel width {width} is not routable")]
    BadChannelWidth {
        /// The requested width.
        width: u32,
    },
    /// An output pin reaches no track in any adjacent channel.
    #[error("output pin {ptc} at {loc} connects to no tracks")]
    OpinUnconnected {
        /// Location of the pin.
        loc: GridLoc,
        /// Pin (or pad slot) index.
        ptc: u32,
    },
    /// A keyed node lookup named a node that cannot exist.
    #[error("no {kind} node with ptc {ptc} exists at {loc}")]
    NoSuchNode {
        /// Requested location.
        loc: GridLoc,
        /// Requested kind.
        kind: RrKind,
        /// Requested ptc.
        ptc: u32,
    },
    /// A node's coordinates fall outside the device.
    #[error("node {node} ({kind}) spans ({xlow},{ylow})..({xhigh},{yhigh}), outside the device")]
    NodeOutOfBounds {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrKind,
        /// Span low x.
        xlow: i32,
        /// Span low y.
        ylow: i32,
        /// Span high x.
        xhigh: i32,
        /// Span high y.
        yhigh: i32,
    },
    /// A node's ptc is outside the legal range for its kind.
    #[error("node {node} ({kind}) has ptc {ptc}, legal range is 0..{limit}")]
    PtcOutOfRange {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrKind,
        /// The out-of-range ptc.
        ptc: u32,
        /// Exclusive upper bound.
        limit: u32,
    },
    /// A node's ptc maps to a class of the wrong direction.
    #[error("node {node} ({kind}) has ptc {ptc}, which names a class of the wrong direction")]
    PtcClassMismatch {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrKind,
        /// The mismatched ptc.
        ptc: u32,
    },
    /// An edge joins two kinds that may never connect.
    #[error("illegal edge {from} ({from_kind}) -> {to} ({to_kind})")]
    IllegalEdgeKinds {
        /// Source node.
        from: RrNodeId,
        /// Source kind.
        from_kind: RrKind,
        /// Target node.
        to: RrNodeId,
        /// Target kind.
        to_kind: RrKind,
    },
    /// An edge points outside the node arena.
    #[error("node {from} has an edge to nonexistent node {to}")]
    DanglingEdge {
        /// Source node.
        from: RrNodeId,
        /// The out-of-range target.
        to: RrNodeId,
    },
    /// An edge uses a switch outside the switch table.
    #[error("node {from} leaves via unknown switch {switch}")]
    UnknownSwitch {
        /// Source node.
        from: RrNodeId,
        /// The unknown switch.
        switch: SwitchId,
    },
    /// A node's capacity disagrees with the architecture.
    #[error("node {node} ({kind}) has capacity {actual}, expected {expected}")]
    WrongCapacity {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrKind,
        /// Recorded capacity.
        actual: u32,
        /// Capacity required by the architecture.
        expected: u32,
    },
    /// A node is over capacity.
    #[error("node {node} has occupancy {occ} over capacity {capacity}")]
    OverCapacity {
        /// The offending node.
        node: RrNodeId,
        /// Recorded occupancy.
        occ: u32,
        /// Its capacity.
        capacity: u32,
    },
    /// A SOURCE or SINK aggregate has the wrong degree.
    #[error("node {node} ({kind}) has degree {actual}, expected {expected} for class {class}")]
    WrongClassDegree {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrKind,
        /// The class named by its ptc.
        class: u32,
        /// Observed degree.
        actual: usize,
        /// Degree required by the class's pin count.
        expected: usize,
    },
    /// A net has no routable terminals recorded.
    #[error("net {net} has no RR terminals")]
    MissingNetTerminals {
        /// The offending net.
        net: NetId,
    },
}
