//! Static timing analysis: arrival/required propagation, slack computation
//! and critical-path extraction.

use crate::error::TimingError;
use crate::graph::{TimingGraph, T_CONSTANT_GENERATOR};
use crate::ids::TimingNodeId;

/// Writes externally computed net delays onto the timing graph.
///
/// `delays[net][k]` is the delay from the net's driver to its `k`-th sink
/// (net pin `k + 1`). The driver node's out-edges are in net-sink order, so
/// the delay lands on edge `k` directly.
pub fn load_net_delays(graph: &mut TimingGraph, delays: &[Vec<f64>]) -> Result<(), TimingError> {
    if delays.len() != graph.net_to_driver.len() {
        return Err(TimingError::TableShape {
            actual: delays.len(),
            expected: graph.net_to_driver.len(),
        });
    }
    for (inet, per_sink) in delays.iter().enumerate() {
        let driver = graph.net_to_driver[inet];
        let edges = &mut graph.tnodes[driver.index()].edges;
        if edges.len() != per_sink.len() {
            return Err(TimingError::DelayMapShape {
                net: tessera_netlist::NetId::from_raw(inet as u32),
                actual: per_sink.len(),
                expected: edges.len(),
            });
        }
        for (edge, &delay) in edges.iter_mut().zip(per_sink) {
            edge.delay = delay;
        }
    }
    Ok(())
}

/// Runs the forward and backward passes and fills the per-net slacks.
///
/// Arrival times start effectively at minus infinity so constant-generator
/// outputs propagate as "always ready"; level-0 nodes then launch at T = 0.
/// The required-time pass anchors every sink at `target_cycle_time` when one
/// is given, else at the critical-path delay. Returns the critical-path
/// delay.
pub fn load_slacks(
    graph: &mut TimingGraph,
    slacks: &mut [Vec<f64>],
    target_cycle_time: f64,
) -> Result<f64, TimingError> {
    if slacks.len() != graph.net_to_driver.len() {
        return Err(TimingError::TableShape {
            actual: slacks.len(),
            expected: graph.net_to_driver.len(),
        });
    }

    for node in &mut graph.tnodes {
        node.t_arr = T_CONSTANT_GENERATOR;
    }
    if let Some(level0) = graph.levels.first() {
        for &id in level0 {
            graph.tnodes[id.index()].t_arr = 0.0;
        }
    }

    let mut t_crit = 0.0_f64;
    for ilevel in 0..graph.levels.len() {
        for i in 0..graph.levels[ilevel].len() {
            let id = graph.levels[ilevel][i];
            let t_arr = graph.tnodes[id.index()].t_arr;
            t_crit = t_crit.max(t_arr);
            for iedge in 0..graph.tnodes[id.index()].edges.len() {
                let edge = graph.tnodes[id.index()].edges[iedge];
                let to = &mut graph.tnodes[edge.to.index()];
                to.t_arr = to.t_arr.max(t_arr + edge.delay);
            }
        }
    }

    let t_cycle = if target_cycle_time > 0.0 {
        target_cycle_time
    } else {
        t_crit
    };

    for ilevel in (0..graph.levels.len()).rev() {
        for i in 0..graph.levels[ilevel].len() {
            let id = graph.levels[ilevel][i];
            let t_req = if graph.tnodes[id.index()].edges.is_empty() {
                t_cycle
            } else {
                let mut t_req = f64::INFINITY;
                for iedge in 0..graph.tnodes[id.index()].edges.len() {
                    let edge = graph.tnodes[id.index()].edges[iedge];
                    t_req = t_req.min(graph.tnodes[edge.to.index()].t_req - edge.delay);
                }
                t_req
            };
            graph.tnodes[id.index()].t_req = t_req;
        }
    }

    for (inet, per_sink) in slacks.iter_mut().enumerate() {
        let driver = graph.net_to_driver[inet];
        let t_arr = graph.tnodes[driver.index()].t_arr;
        let edges = &graph.tnodes[driver.index()].edges;
        if edges.len() != per_sink.len() {
            return Err(TimingError::DelayMapShape {
                net: tessera_netlist::NetId::from_raw(inet as u32),
                actual: per_sink.len(),
                expected: edges.len(),
            });
        }
        for (slack, edge) in per_sink.iter_mut().zip(edges) {
            *slack = graph.tnodes[edge.to.index()].t_req - t_arr - edge.delay;
        }
    }

    Ok(t_crit)
}

/// Extracts the critical path: start at the worst-slack source and follow
/// the worst-slack successor until a sink is reached.
///
/// Only meaningful after [`load_slacks`] has annotated the graph.
pub fn critical_path(graph: &TimingGraph) -> Vec<TimingNodeId> {
    let Some(level0) = graph.levels.first() else {
        return Vec::new();
    };
    let slack_of = |id: TimingNodeId| {
        let node = graph.node(id);
        node.t_req - node.t_arr
    };
    let Some(&start) = level0.iter().min_by(|&&a, &&b| {
        slack_of(a)
            .partial_cmp(&slack_of(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    while !graph.node(current).edges.is_empty() {
        let next = graph
            .node(current)
            .edges
            .iter()
            .map(|e| e.to)
            .min_by(|&a, &b| {
                slack_of(a)
                    .partial_cmp(&slack_of(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(current);
        path.push(next);
        current = next;
    }
    path
}
