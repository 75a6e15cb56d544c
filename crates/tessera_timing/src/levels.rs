//! Topological levelisation of the timing graph.

use crate::error::TimingError;
use crate::graph::{TimingGraph, Tnode};
use crate::ids::TimingNodeId;

/// Partitions the nodes into topological levels.
///
/// Level 0 holds every node with no in-edges; each later level holds the
/// nodes whose last in-edge comes from the previous levels. Returns the
/// levels and the number of sink nodes. A node left without a level means
/// the graph has a combinational loop.
pub(crate) fn levelize(
    tnodes: &[Tnode],
) -> Result<(Vec<Vec<TimingNodeId>>, usize), TimingError> {
    let mut remaining_in: Vec<usize> = vec![0; tnodes.len()];
    for node in tnodes {
        for edge in &node.edges {
            remaining_in[edge.to.index()] += 1;
        }
    }

    let mut current: Vec<TimingNodeId> = remaining_in
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| TimingNodeId::from_raw(i as u32))
        .collect();

    let mut levels = Vec::new();
    let mut leveled = 0usize;
    while !current.is_empty() {
        leveled += current.len();
        let mut next = Vec::new();
        for &id in &current {
            for edge in &tnodes[id.index()].edges {
                remaining_in[edge.to.index()] -= 1;
                if remaining_in[edge.to.index()] == 0 {
                    next.push(edge.to);
                }
            }
        }
        levels.push(std::mem::replace(&mut current, next));
    }

    if leveled != tnodes.len() {
        return Err(TimingError::CombinationalLoop {
            unleveled: tnodes.len() - leveled,
        });
    }

    let num_sinks = tnodes.iter().filter(|n| n.edges.is_empty()).count();
    Ok((levels, num_sinks))
}

/// Verifies the degree contracts of the special node kinds: pad and
/// constant-generator sources have no in-edges, FF and pad sinks have no
/// out-edges.
pub(crate) fn check_degree_contracts(graph: &TimingGraph) -> Result<(), TimingError> {
    let mut in_degree = vec![0usize; graph.num_nodes()];
    for (_, node) in graph.nodes() {
        for edge in &node.edges {
            in_degree[edge.to.index()] += 1;
        }
    }
    for (id, node) in graph.nodes() {
        if node.kind.is_source() && in_degree[id.index()] != 0 {
            return Err(TimingError::DegreeContract { node: id.as_raw() });
        }
        if node.kind.is_sink() && !node.edges.is_empty() {
            return Err(TimingError::DegreeContract { node: id.as_raw() });
        }
    }
    Ok(())
}
