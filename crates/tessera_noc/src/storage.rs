//! The NoC model: routers, links and adjacency.
//!
//! Append-only while the device description is ingested; once
//! [`finished_building`](NocStorage::finished_building) is called the model
//! freezes and only link bandwidth usage may change.

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_common::GridLoc;

/// A hard router tile of the embedded NoC.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NocRouter {
    /// The identifier the device description uses for this router.
    pub user_id: u32,
    /// Grid location of the router tile.
    pub loc: GridLoc,
    /// Delay through the router, in seconds.
    pub latency: f64,
}

/// A directed link between two routers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NocLink {
    /// The router the link leaves.
    pub source: NocRouterId,
    /// The router the link enters.
    pub sink: NocRouterId,
    /// Usable bandwidth, in bits per second.
    pub bandwidth_capacity: f64,
    /// Traversal delay, in seconds.
    pub latency: f64,
    /// Bandwidth currently claimed by routed flows.
    pub bandwidth_usage: f64,
}

/// The NoC model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NocStorage {
    routers: Vec<NocRouter>,
    links: Vec<NocLink>,
    outgoing: Vec<Vec<NocLinkId>>,
    incoming: Vec<Vec<NocLinkId>>,
    #[serde(skip)]
    by_location: HashMap<GridLoc, NocRouterId>,
    #[serde(skip)]
    by_user_id: HashMap<u32, NocRouterId>,
    /// Sorted distinct router columns; index = compressed x coordinate.
    columns: Vec<i32>,
    /// Sorted distinct router rows; index = compressed y coordinate.
    rows: Vec<i32>,
    finished: bool,
}

impl NocStorage {
    /// Creates an empty NoC model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a router tile.
    pub fn add_router(
        &mut self,
        user_id: u32,
        loc: GridLoc,
        latency: f64,
    ) -> Result<NocRouterId, NocError> {
        if self.finished {
            return Err(NocError::StorageFrozen);
        }
        if self.by_location.contains_key(&loc) {
            return Err(NocError::DuplicateRouterLocation { loc });
        }
        if self.by_user_id.contains_key(&user_id) {
            return Err(NocError::DuplicateRouterUserId { user_id });
        }
        let id = NocRouterId::from_raw(self.routers.len() as u32);
        self.routers.push(NocRouter {
            user_id,
            loc,
            latency,
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.by_location.insert(loc, id);
        self.by_user_id.insert(user_id, id);
        Ok(id)
    }

    /// Adds a directed link.
    pub fn add_link(
        &mut self,
        source: NocRouterId,
        sink: NocRouterId,
        bandwidth_capacity: f64,
        latency: f64,
    ) -> Result<NocLinkId, NocError> {
        if self.finished {
            return Err(NocError::StorageFrozen);
        }
        for router in [source, sink] {
            if router.index() >= self.routers.len() {
                return Err(NocError::UnknownRouter { router });
            }
        }
        if source == sink {
            return Err(NocError::SelfLoopLink { router: source });
        }
        let id = NocLinkId::from_raw(self.links.len() as u32);
        self.links.push(NocLink {
            source,
            sink,
            bandwidth_capacity,
            latency,
            bandwidth_usage: 0.0,
        });
        self.outgoing[source.index()].push(id);
        self.incoming[sink.index()].push(id);
        Ok(id)
    }

    /// Declares the model complete and freezes it.
    ///
    /// Also derives the compressed coordinate space used by routing
    /// algorithms that care about column parity.
    pub fn finished_building(&mut self) {
        let mut columns: Vec<i32> = self.routers.iter().map(|r| r.loc.x).collect();
        let mut rows: Vec<i32> = self.routers.iter().map(|r| r.loc.y).collect();
        columns.sort_unstable();
        columns.dedup();
        rows.sort_unstable();
        rows.dedup();
        self.columns = columns;
        self.rows = rows;
        self.finished = true;
    }

    /// Whether the model has been frozen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rebuilds the lookup maps after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.by_location.clear();
        self.by_user_id.clear();
        for (i, router) in self.routers.iter().enumerate() {
            let id = NocRouterId::from_raw(i as u32);
            self.by_location.insert(router.loc, id);
            self.by_user_id.insert(router.user_id, id);
        }
    }

    /// Number of routers.
    pub fn num_routers(&self) -> usize {
        self.routers.len()
    }

    /// Number of links.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// One router.
    pub fn router(&self, id: NocRouterId) -> &NocRouter {
        &self.routers[id.index()]
    }

    /// One link.
    pub fn link(&self, id: NocLinkId) -> &NocLink {
        &self.links[id.index()]
    }

    /// All routers, in id order.
    pub fn routers(&self) -> impl Iterator<Item = (NocRouterId, &NocRouter)> {
        self.routers
            .iter()
            .enumerate()
            .map(|(i, r)| (NocRouterId::from_raw(i as u32), r))
    }

    /// All links, in id order.
    pub fn links(&self) -> impl Iterator<Item = (NocLinkId, &NocLink)> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, l)| (NocLinkId::from_raw(i as u32), l))
    }

    /// The router at a grid location, if any.
    pub fn router_at(&self, loc: GridLoc) -> Option<NocRouterId> {
        self.by_location.get(&loc).copied()
    }

    /// The router with a given user id, if any.
    pub fn router_by_user_id(&self, user_id: u32) -> Option<NocRouterId> {
        self.by_user_id.get(&user_id).copied()
    }

    /// Links leaving a router.
    pub fn outgoing(&self, router: NocRouterId) -> &[NocLinkId] {
        &self.outgoing[router.index()]
    }

    /// Links entering a router.
    pub fn incoming(&self, router: NocRouterId) -> &[NocLinkId] {
        &self.incoming[router.index()]
    }

    /// The link between two routers, if one exists. Linear scan; rarely
    /// called.
    pub fn link_between(&self, source: NocRouterId, sink: NocRouterId) -> Option<NocLinkId> {
        self.links()
            .find(|(_, link)| link.source == source && link.sink == sink)
            .map(|(id, _)| id)
    }

    /// Claims bandwidth on a link for a routed flow.
    pub fn use_link_bandwidth(&mut self, link: NocLinkId, bandwidth: f64) {
        self.links[link.index()].bandwidth_usage += bandwidth;
    }

    /// Releases bandwidth on a link when a flow is ripped up.
    pub fn release_link_bandwidth(&mut self, link: NocLinkId, bandwidth: f64) {
        self.links[link.index()].bandwidth_usage -= bandwidth;
    }

    /// The router's location in the compressed coordinate space (distinct
    /// columns and rows, densely renumbered).
    pub fn compressed_loc(&self, router: NocRouterId) -> (usize, usize) {
        let loc = self.routers[router.index()].loc;
        let cx = self.columns.partition_point(|&x| x < loc.x);
        let cy = self.rows.partition_point(|&y| y < loc.y);
        (cx, cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_router_noc() -> (NocStorage, NocRouterId, NocRouterId) {
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(0, 0), 1.0e-9).unwrap();
        let b = noc.add_router(1, GridLoc::new(1, 0), 1.0e-9).unwrap();
        noc.add_link(a, b, 1.0e9, 1.0e-9).unwrap();
        noc.add_link(b, a, 1.0e9, 1.0e-9).unwrap();
        noc.finished_building();
        (noc, a, b)
    }

    #[test]
    fn lookup_by_location_and_user_id() {
        let (noc, a, b) = two_router_noc();
        assert_eq!(noc.router_at(GridLoc::new(0, 0)), Some(a));
        assert_eq!(noc.router_by_user_id(1), Some(b));
        assert_eq!(noc.router_at(GridLoc::new(5, 5)), None);
    }

    #[test]
    fn adjacency_lists() {
        let (noc, a, b) = two_router_noc();
        assert_eq!(noc.outgoing(a).len(), 1);
        assert_eq!(noc.incoming(a).len(), 1);
        let ab = noc.link_between(a, b).unwrap();
        assert_eq!(noc.link(ab).sink, b);
        assert_eq!(noc.link_between(b, b), None);
    }

    #[test]
    fn frozen_storage_rejects_mutation() {
        let (mut noc, a, b) = two_router_noc();
        assert!(matches!(
            noc.add_router(9, GridLoc::new(2, 0), 0.0),
            Err(NocError::StorageFrozen)
        ));
        assert!(matches!(
            noc.add_link(a, b, 1.0, 0.0),
            Err(NocError::StorageFrozen)
        ));
    }

    #[test]
    fn duplicate_location_rejected() {
        let mut noc = NocStorage::new();
        noc.add_router(0, GridLoc::new(0, 0), 0.0).unwrap();
        assert!(matches!(
            noc.add_router(1, GridLoc::new(0, 0), 0.0),
            Err(NocError::DuplicateRouterLocation { .. })
        ));
    }

    #[test]
    fn duplicate_user_id_rejected() {
        let mut noc = NocStorage::new();
        noc.add_router(7, GridLoc::new(0, 0), 0.0).unwrap();
        assert!(matches!(
            noc.add_router(7, GridLoc::new(1, 0), 0.0),
            Err(NocError::DuplicateRouterUserId { user_id: 7 })
        ));
    }

    #[test]
    fn self_loop_link_rejected() {
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(0, 0), 0.0).unwrap();
        assert!(matches!(
            noc.add_link(a, a, 1.0, 0.0),
            Err(NocError::SelfLoopLink { .. })
        ));
    }

    #[test]
    fn bandwidth_usage_tracks_claims() {
        let (mut noc, a, b) = two_router_noc();
        let ab = noc.link_between(a, b).unwrap();
        noc.use_link_bandwidth(ab, 100.0);
        noc.use_link_bandwidth(ab, 50.0);
        assert_eq!(noc.link(ab).bandwidth_usage, 150.0);
        noc.release_link_bandwidth(ab, 100.0);
        assert_eq!(noc.link(ab).bandwidth_usage, 50.0);
    }

    #[test]
    fn compressed_coordinates_are_dense() {
        let mut noc = NocStorage::new();
        let a = noc.add_router(0, GridLoc::new(2, 10), 0.0).unwrap();
        let b = noc.add_router(1, GridLoc::new(7, 10), 0.0).unwrap();
        let c = noc.add_router(2, GridLoc::new(7, 20), 0.0).unwrap();
        noc.add_link(a, b, 1.0, 0.0).unwrap();
        noc.finished_building();
        assert_eq!(noc.compressed_loc(a), (0, 0));
        assert_eq!(noc.compressed_loc(b), (1, 0));
        assert_eq!(noc.compressed_loc(c), (1, 1));
    }

    #[test]
    fn serde_roundtrip_rebuilds_lookup() {
        let (noc, a, _) = two_router_noc();
        let json = serde_json::to_string(&noc).unwrap();
        let mut restored: NocStorage = serde_json::from_str(&json).unwrap();
        restored.rebuild_indices();
        assert_eq!(restored.num_routers(), 2);
        assert_eq!(restored.router_at(GridLoc::new(0, 0)), Some(a));
        assert!(restored.is_finished());
    }
}
