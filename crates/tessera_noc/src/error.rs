//! Fatal conditions in NoC modelling and routing.

use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use tessera_common::GridLoc;
use thiserror::Error;

/// A fatal NoC condition.
#[derive(Debug, Error)]
pub enum NocError {
    /// The NoC was declared built; no further routers or links may be added.
    #[error("the NoC model is frozen; routers and links cannot be added")]
    StorageFrozen,
    /// Two routers share one grid location.
    #[error("a router already occupies grid location {loc}")]
    DuplicateRouterLocation {
        /// The contested location.
        loc: GridLoc,
    },
    /// Two routers share one user id.
    #[error("a router with user id {user_id} already exists")]
    DuplicateRouterUserId {
        /// The duplicated user id.
        user_id: u32,
    },
    /// A link connects a router to itself.
    #[error("link endpoints must differ (router {router})")]
    SelfLoopLink {
        /// The offending router.
        router: NocRouterId,
    },
    /// A router id is outside the model.
    #[error("router {router} does not exist")]
    UnknownRouter {
        /// The unknown router id.
        router: NocRouterId,
    },
    /// No minimal route could be found between two routers.
    #[error("no route found from router {src} to router {dst}")]
    NoRouteFound {
        /// The source router.
        src: NocRouterId,
        /// The destination router.
        dst: NocRouterId,
    },
    /// The routing-algorithm factory was given an unknown name.
    #[error("unknown NoC routing algorithm \"{name}\"")]
    UnknownAlgorithm {
        /// The unrecognised name.
        name: String,
    },
    /// A route's first or last link does not touch the flow's endpoints.
    #[error("route of flow {flow} does not start and end at the flow's routers")]
    RouteEndpointMismatch {
        /// The offending flow.
        flow: TrafficFlowId,
    },
    /// Two consecutive links of a route do not share a router.
    #[error("route of flow {flow} is discontinuous at link {link}")]
    RouteDiscontinuity {
        /// The offending flow.
        flow: TrafficFlowId,
        /// The link that does not follow from its predecessor.
        link: NocLinkId,
    },
    /// A flow has no route.
    #[error("flow {flow} has an empty route")]
    EmptyRoute {
        /// The unrouted flow.
        flow: TrafficFlowId,
    },
    /// The route table does not cover every flow.
    #[error("got {actual} routes for {expected} traffic flows")]
    RouteCountMismatch {
        /// Routes supplied.
        actual: usize,
        /// Flows expected.
        expected: usize,
    },
}
