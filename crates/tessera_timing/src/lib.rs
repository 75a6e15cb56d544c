//! Timing graph and static timing analysis for the Tessera FPGA back-end.
//!
//! [`build_timing_graph`] maps every used pin of a placed netlist to a
//! timing node and wires the intra-cluster, pad and net edges between them.
//! Net edges carry no delay until the router's delay estimates are injected
//! with [`load_net_delays`]; [`load_slacks`] then runs the levelised
//! forward/backward analysis and back-annotates per-net slacks.

pub mod build;
pub mod error;
pub mod graph;
pub mod ids;
pub mod levels;
pub mod sta;

pub use build::{build_timing_graph, NetSlacks};
pub use error::TimingError;
pub use graph::{TimingEdge, TimingGraph, TimingNodeKind, Tnode, T_CONSTANT_GENERATOR};
pub use ids::TimingNodeId;
pub use sta::{critical_path, load_net_delays, load_slacks};

/// Holds at most one timing graph at a time.
///
/// Building into an occupied slot is the duplicated-graph error; freeing the
/// slot is the graph's single teardown entry point.
#[derive(Default)]
pub struct TimingGraphSlot {
    graph: Option<TimingGraph>,
}

impl TimingGraphSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly-built graph.
    pub fn install(&mut self, graph: TimingGraph) -> Result<&TimingGraph, TimingError> {
        if self.graph.is_some() {
            return Err(TimingError::GraphAlreadyBuilt);
        }
        Ok(self.graph.insert(graph))
    }

    /// The held graph, if any.
    pub fn graph(&self) -> Option<&TimingGraph> {
        self.graph.as_ref()
    }

    /// Mutable access to the held graph, if any.
    pub fn graph_mut(&mut self) -> Option<&mut TimingGraph> {
        self.graph.as_mut()
    }

    /// Tears down the held graph (and the slack storage should the caller
    /// drop it alongside). Safe to call on an empty slot.
    pub fn free(&mut self) {
        self.graph = None;
    }
}
