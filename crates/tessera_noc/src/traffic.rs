//! Traffic flows: the communication demands routed over the NoC.

use crate::ids::{NocRouterId, TrafficFlowId};
use serde::{Deserialize, Serialize};

/// One communication demand between two routers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrafficFlow {
    /// The router the flow originates at.
    pub source_router: NocRouterId,
    /// The router the flow terminates at.
    pub sink_router: NocRouterId,
    /// Bandwidth demanded, in bits per second.
    pub bandwidth: f64,
    /// Latency constraint, in seconds.
    pub max_latency: f64,
    /// Relative criticality weight used by NoC-aware placement.
    pub priority: u32,
}

/// The set of traffic flows of a design.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrafficFlows {
    flows: Vec<TrafficFlow>,
}

impl TrafficFlows {
    /// Creates an empty flow set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flow and returns its id.
    pub fn add_flow(&mut self, flow: TrafficFlow) -> TrafficFlowId {
        let id = TrafficFlowId::from_raw(self.flows.len() as u32);
        self.flows.push(flow);
        id
    }

    /// One flow.
    pub fn flow(&self, id: TrafficFlowId) -> &TrafficFlow {
        &self.flows[id.index()]
    }

    /// All flows, in id order.
    pub fn flows(&self) -> impl Iterator<Item = (TrafficFlowId, &TrafficFlow)> {
        self.flows
            .iter()
            .enumerate()
            .map(|(i, f)| (TrafficFlowId::from_raw(i as u32), f))
    }

    /// Number of flows.
    pub fn num_flows(&self) -> usize {
        self.flows.len()
    }
}
