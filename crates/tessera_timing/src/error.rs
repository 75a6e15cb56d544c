//! Fatal conditions raised while building or analysing the timing graph.

use tessera_netlist::NetId;
use thiserror::Error;

/// A fatal condition in timing-graph construction or analysis.
#[derive(Debug, Error)]
pub enum TimingError {
    /// A timing graph is already held by the slot being built into.
    #[error("a timing graph already exists; free it before building another")]
    GraphAlreadyBuilt,
    /// The graph contains a combinational cycle and cannot be levelised.
    #[error("timing graph has a combinational loop ({unleveled} nodes cannot be levelised)")]
    CombinationalLoop {
        /// Nodes left without a level.
        unleveled: usize,
    },
    /// A net has no driving timing node.
    #[error("net {net} has no driving timing node")]
    NetDriverMissing {
        /// The offending net.
        net: NetId,
    },
    /// A supplied delay map does not match the net's fanout.
    #[error("net {net}: delay map has {actual} entries, net has {expected} sinks")]
    DelayMapShape {
        /// The offending net.
        net: NetId,
        /// Entries supplied.
        actual: usize,
        /// Sinks expected.
        expected: usize,
    },
    /// The delay (or slack) tables do not cover every net.
    #[error("table covers {actual} nets, netlist has {expected}")]
    TableShape {
        /// Entries supplied.
        actual: usize,
        /// Nets expected.
        expected: usize,
    },
    /// A declared source node has in-edges, or a sink has out-edges.
    #[error("timing node {node} violates its source/sink degree contract")]
    DegreeContract {
        /// The offending node, by raw id.
        node: u32,
    },
}
