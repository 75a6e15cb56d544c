//! Routing-resource node and cost-profile types.

use crate::ids::RrNodeId;
use serde::{Deserialize, Serialize};
use tessera_arch::{SegmentId, SwitchId};

/// The kind of a routing-resource node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RrKind {
    /// Per-class aggregate anchoring a net's driver side.
    Source,
    /// Per-class aggregate anchoring a net's sink side.
    Sink,
    /// A physical input pin of a cluster or pad.
    Ipin,
    /// A physical output pin of a cluster or pad.
    Opin,
    /// A horizontal wire segment.
    Chanx,
    /// A vertical wire segment.
    Chany,
}

impl RrKind {
    /// Returns `true` for the two wire kinds.
    pub fn is_wire(self) -> bool {
        matches!(self, RrKind::Chanx | RrKind::Chany)
    }

    /// Returns `true` if a directed edge of this kind-pair is legal.
    ///
    /// The legal pairs are: SOURCE→OPIN, IPIN→SINK, OPIN→wire, wire→IPIN and
    /// wire→wire. A SINK→SOURCE feedthrough is also admitted for route
    /// checking, although no builder emits one.
    pub fn may_connect_to(self, to: RrKind) -> bool {
        match self {
            RrKind::Source => to == RrKind::Opin,
            RrKind::Ipin => to == RrKind::Sink,
            RrKind::Opin => to.is_wire(),
            RrKind::Chanx | RrKind::Chany => to == RrKind::Ipin || to.is_wire(),
            RrKind::Sink => to == RrKind::Source,
        }
    }
}

impl std::fmt::Display for RrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RrKind::Source => "SOURCE",
            RrKind::Sink => "SINK",
            RrKind::Ipin => "IPIN",
            RrKind::Opin => "OPIN",
            RrKind::Chanx => "CHANX",
            RrKind::Chany => "CHANY",
        };
        write!(f, "{name}")
    }
}

/// A directed, switched connection between two routing-resource nodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RrEdge {
    /// The node reached through the switch.
    pub to: RrNodeId,
    /// The switch type used to make the hop.
    pub switch: SwitchId,
}

/// One routing resource: a pin, a class aggregate, or a wire segment.
///
/// Wires occupy a contiguous coordinate range; everything else has
/// `xlow == xhigh` and `ylow == yhigh`. `ptc` disambiguates co-located nodes
/// of the same kind (class index, pin index or track index).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrNode {
    /// The node kind.
    pub kind: RrKind,
    /// Low x coordinate of the span.
    pub xlow: i32,
    /// Low y coordinate of the span.
    pub ylow: i32,
    /// High x coordinate of the span.
    pub xhigh: i32,
    /// High y coordinate of the span.
    pub yhigh: i32,
    /// Class, pin or track index depending on `kind`.
    pub ptc: u32,
    /// Index into the graph's cost-profile table.
    pub cost_index: u32,
    /// Current occupancy, maintained by routers and checkers.
    pub occ: u32,
    /// Maximum legal occupancy.
    pub capacity: u32,
    /// Lumped resistance, in ohms.
    pub r: f64,
    /// Lumped capacitance, in farads.
    pub c: f64,
    /// Outgoing switched edges.
    pub edges: Vec<RrEdge>,
}

impl RrNode {
    /// A placeholder node overwritten during graph construction.
    pub(crate) fn placeholder() -> Self {
        Self {
            kind: RrKind::Sink,
            xlow: -1,
            ylow: -1,
            xhigh: -1,
            yhigh: -1,
            ptc: 0,
            cost_index: 0,
            occ: 0,
            capacity: 0,
            r: 0.0,
            c: 0.0,
            edges: Vec::new(),
        }
    }

    /// Number of unit-spans the node covers.
    pub fn span_length(&self) -> i32 {
        (self.xhigh - self.xlow) + (self.yhigh - self.ylow) + 1
    }
}

/// How wire base costs are derived.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BaseCostKind {
    /// Wire base costs scale with the per-span delay of the segment type,
    /// normalized so the cheapest segment type costs 1.
    DelayNormalized,
    /// Every wire costs 1; routing is driven purely by congestion.
    DemandOnly,
}

/// Cost profile shared by all nodes with the same `cost_index`.
///
/// `t_linear` and `t_quadratic` predict the delay of a chain of `k`
/// same-type segments as `k·t_linear + k²·t_quadratic`; buffered segments
/// have no quadratic term and no load coupling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrIndexedData {
    /// Cost of using one node of this profile, before congestion scaling.
    pub base_cost: f64,
    /// Profile of the orthogonal channel's equivalent segment, if any.
    pub ortho_cost_index: Option<u32>,
    /// The segment type behind this profile, for wires.
    pub seg_index: Option<SegmentId>,
    /// Reciprocal of the segment length, for wires.
    pub inv_length: f64,
    /// Linear delay per chained segment, in seconds.
    pub t_linear: f64,
    /// Quadratic delay per chained segment pair, in seconds.
    pub t_quadratic: f64,
    /// Capacitive load per unit-span seen by the driver of an unbuffered
    /// chain, in farads.
    pub c_load: f64,
}

/// Cost index of every SOURCE node.
pub const SOURCE_COST_INDEX: u32 = 0;
/// Cost index of every SINK node.
pub const SINK_COST_INDEX: u32 = 1;
/// Cost index of every OPIN node.
pub const OPIN_COST_INDEX: u32 = 2;
/// Cost index of every IPIN node.
pub const IPIN_COST_INDEX: u32 = 3;
/// First cost index used by horizontal wires; vertical wires follow after
/// one entry per segment type.
pub const CHANX_COST_INDEX_START: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_edge_pairs() {
        use RrKind::*;
        assert!(Source.may_connect_to(Opin));
        assert!(Ipin.may_connect_to(Sink));
        assert!(Opin.may_connect_to(Chanx));
        assert!(Opin.may_connect_to(Chany));
        assert!(Chanx.may_connect_to(Ipin));
        assert!(Chanx.may_connect_to(Chanx));
        assert!(Chanx.may_connect_to(Chany));
        assert!(Chany.may_connect_to(Chany));
        assert!(Chany.may_connect_to(Chanx));
        assert!(Chany.may_connect_to(Ipin));
    }

    #[test]
    fn illegal_edge_pairs() {
        use RrKind::*;
        assert!(!Source.may_connect_to(Chanx));
        assert!(!Source.may_connect_to(Sink));
        assert!(!Opin.may_connect_to(Ipin));
        assert!(!Opin.may_connect_to(Sink));
        assert!(!Ipin.may_connect_to(Chanx));
        assert!(!Chanx.may_connect_to(Opin));
        assert!(!Chany.may_connect_to(Source));
        assert!(!Sink.may_connect_to(Sink));
    }

    #[test]
    fn span_length() {
        let mut node = RrNode::placeholder();
        node.xlow = 2;
        node.xhigh = 5;
        node.ylow = 1;
        node.yhigh = 1;
        assert_eq!(node.span_length(), 4);
    }

    #[test]
    fn kind_display() {
        assert_eq!(format!("{}", RrKind::Chanx), "CHANX");
        assert_eq!(format!("{}", RrKind::Source), "SOURCE");
    }

    #[test]
    fn serde_roundtrip() {
        let mut node = RrNode::placeholder();
        node.kind = RrKind::Opin;
        node.edges.push(RrEdge {
            to: RrNodeId::from_raw(5),
            switch: SwitchId::from_raw(1),
        });
        let json = serde_json::to_string(&node).unwrap();
        let restored: RrNode = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.kind, RrKind::Opin);
        assert_eq!(restored.edges.len(), 1);
    }
}
