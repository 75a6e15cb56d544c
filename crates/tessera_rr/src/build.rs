//! RR-graph construction.
//!
//! Builds the full routing-resource graph for a placed netlist: per-location
//! SOURCE/SINK aggregates and pins, channel wire segments, and every switched
//! edge between them. The graph is assembled into a contiguous node arena;
//! the spatial index fixes each node's id before any edge is emitted, so
//! edges can name their targets directly.

use crate::error::RrError;
use crate::graph::{RouteKind, RrGraph};
use crate::ids::RrNodeId;
use crate::index::RrSpatialIndex;
use crate::node::{
    BaseCostKind, RrEdge, RrIndexedData, RrKind, RrNode, CHANX_COST_INDEX_START,
    IPIN_COST_INDEX, OPIN_COST_INDEX, SINK_COST_INDEX, SOURCE_COST_INDEX,
};
use crate::sbox::{track_pair, SwitchBlockKind};
use crate::seg::{build_seg_details, SegDetails};
use serde::{Deserialize, Serialize};
use tessera_arch::{Architecture, BlockKind, ClassKind, SegmentId, SwitchId, TimingParams};
use tessera_common::{GridLoc, Side};
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tessera_netlist::Netlist;

/// How many tracks each pin reaches in an adjacent channel.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum FcSpec {
    /// An absolute track count, clamped to the channel width.
    Absolute(u32),
    /// A fraction of the channel width.
    Fractional(f64),
}

/// Detailed-routing parameters of the target architecture.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetailedRoutingArch {
    /// Switch-block topology.
    pub switch_block: SwitchBlockKind,
    /// Fc for cluster output pins.
    pub fc_output: FcSpec,
    /// Fc for cluster input pins.
    pub fc_input: FcSpec,
    /// Fc for pads.
    pub fc_pad: FcSpec,
    /// The zero-delay switch used inside clusters and pads.
    pub delayless_switch: SwitchId,
    /// The switch from a wire into a connection-box input.
    pub wire_to_ipin_switch: SwitchId,
}

fn nint(x: f64) -> u32 {
    (x + 0.5) as u32
}

/// Resolves an Fc specification against the channel width.
///
/// Fractional output Fc rounds up (with a small epsilon) so every track is
/// driven when `Fc = W / N_equivalent_outputs`; inputs and pads round to
/// nearest. All results are at least 1.
fn resolve_fc(spec: FcSpec, w: u32, is_output: bool) -> u32 {
    match spec {
        FcSpec::Absolute(n) => n.min(w).max(1),
        FcSpec::Fractional(f) => {
            let fc = if is_output {
                (w as f64 * f - 0.005).ceil() as u32
            } else {
                nint(w as f64 * f)
            };
            fc.clamp(1, w)
        }
    }
}

/// Per-pin, per-side track lists; `None` when the pin is absent from the
/// side or of the other direction.
type PinTracks = Vec<[Option<Vec<u32>>; 4]>;

/// Builds the routing-resource graph.
///
/// For [`RouteKind::Global`] the channel collapses to a single track of
/// channel-wide capacity and every Fc resolves to 1; detailed routing uses
/// `channel_width` physical tracks of capacity 1.
pub fn build_rr_graph(
    arch: &Architecture,
    netlist: &Netlist,
    route_kind: RouteKind,
    det: &DetailedRoutingArch,
    channel_width: u32,
    timing: &TimingParams,
    base_cost: BaseCostKind,
    sink: &DiagnosticSink,
) -> Result<RrGraph, RrError> {
    if channel_width == 0 {
        return Err(RrError::BadChannelWidth { width: 0 });
    }
    let w = match route_kind {
        RouteKind::Global => 1,
        RouteKind::Detailed => channel_width,
    };
    let grid = arch.grid();
    let seg_x = build_seg_details(w, arch.segments(), grid.nx());
    let seg_y = build_seg_details(w, arch.segments(), grid.ny());
    let index = RrSpatialIndex::build(arch, w, &seg_x, &seg_y);

    let (fc_output, fc_input, fc_pad, switch_block) = match route_kind {
        RouteKind::Global => (1, 1, 1, SwitchBlockKind::Subset),
        RouteKind::Detailed => (
            resolve_fc(det.fc_output, w, true),
            resolve_fc(det.fc_input, w, false),
            resolve_fc(det.fc_pad, w, false),
            det.switch_block,
        ),
    };

    let opin_to_tracks = clb_pin_to_tracks(arch, ClassKind::Driver, w, fc_output, false, sink);

    // Perturb the input pattern when it would line up perfectly with the
    // output pattern, creating "pin domains" where certain outputs can only
    // reach certain inputs.
    let fc_ratio = if fc_input > fc_output {
        fc_input as f64 / fc_output as f64
    } else {
        fc_output as f64 / fc_input as f64
    };
    let perturb = fc_input <= w.saturating_sub(2)
        && (fc_ratio - fc_ratio.round()).abs() < 0.5 / w as f64;

    let ipin_to_tracks = clb_pin_to_tracks(arch, ClassKind::Receiver, w, fc_input, perturb, sink);
    if perturb {
        check_all_tracks_reach_pins(arch, &ipin_to_tracks, w, fc_input, sink);
    }
    let tracks_to_clb_ipin = invert_pin_tracks(arch, w, &ipin_to_tracks);
    let pads_to_tracks = load_pads_to_tracks(arch.io_rat() as u32, w, fc_pad);
    let tracks_to_pads = invert_pad_tracks(w, &pads_to_tracks);

    let num_nodes = index.num_nodes() as usize;
    let mut assembler = Assembler {
        arch,
        route_kind,
        switch_block,
        delayless_switch: det.delayless_switch,
        wire_to_ipin_switch: det.wire_to_ipin_switch,
        w,
        chan_capacity: channel_width,
        seg_x,
        seg_y,
        index,
        nodes: vec![RrNode::placeholder(); num_nodes],
        edge_done: vec![false; num_nodes],
        opin_to_tracks,
        tracks_to_clb_ipin,
        pads_to_tracks,
        tracks_to_pads,
        fc_output,
        fc_pad,
    };

    for loc in grid.locations() {
        match grid.block_kind_at(loc) {
            BlockKind::Clb => {
                assembler.build_clb(loc)?;
                assembler.build_xchan(loc)?;
                assembler.build_ychan(loc)?;
            }
            BlockKind::Io => {
                assembler.build_pads(loc)?;
                if loc.y == 0 {
                    assembler.build_xchan(loc)?;
                }
                if loc.x == 0 {
                    assembler.build_ychan(loc)?;
                }
            }
            _ => {}
        }
    }

    let net_terminals = load_net_terminals(netlist, &assembler.index, arch)?;
    let clb_source = load_clb_sources(netlist, &assembler.index, arch)?;

    let Assembler {
        mut nodes,
        index,
        seg_x,
        seg_y,
        ..
    } = assembler;

    roll_up_capacitance(arch, &mut nodes, timing.c_ipin_cblock);

    let indexed_data = build_indexed_data(arch, base_cost, grid.nx().max(grid.ny()));

    let graph = RrGraph {
        nodes,
        indexed_data,
        index,
        net_terminals,
        clb_source,
        route_kind,
        channel_width: w,
        seg_x,
        seg_y,
    };
    crate::check::check_rr_graph(&graph, arch, sink)?;
    Ok(graph)
}

struct Assembler<'a> {
    arch: &'a Architecture,
    route_kind: RouteKind,
    switch_block: SwitchBlockKind,
    delayless_switch: SwitchId,
    wire_to_ipin_switch: SwitchId,
    w: u32,
    chan_capacity: u32,
    seg_x: Vec<SegDetails>,
    seg_y: Vec<SegDetails>,
    index: RrSpatialIndex,
    nodes: Vec<RrNode>,
    edge_done: Vec<bool>,
    opin_to_tracks: PinTracks,
    tracks_to_clb_ipin: Vec<[Vec<u32>; 4]>,
    pads_to_tracks: Vec<Vec<u32>>,
    tracks_to_pads: Vec<Vec<u32>>,
    fc_output: u32,
    fc_pad: u32,
}

impl Assembler<'_> {
    fn id(&self, loc: GridLoc, kind: RrKind, ptc: u32) -> Result<RrNodeId, RrError> {
        self.index.node_at(loc, kind, ptc)
    }

    /// Finalizes one node, clearing the de-duplication marks its edge list
    /// left behind.
    fn commit_node(
        &mut self,
        id: RrNodeId,
        kind: RrKind,
        span: (i32, i32, i32, i32),
        ptc: u32,
        cost_index: u32,
        capacity: u32,
        r: f64,
        c: f64,
        edges: Vec<RrEdge>,
    ) {
        for edge in &edges {
            self.edge_done[edge.to.index()] = false;
        }
        let node = &mut self.nodes[id.index()];
        node.kind = kind;
        node.xlow = span.0;
        node.ylow = span.1;
        node.xhigh = span.2;
        node.yhigh = span.3;
        node.ptc = ptc;
        node.cost_index = cost_index;
        node.capacity = capacity;
        node.occ = 0;
        node.r = r;
        node.c = c;
        node.edges = edges;
    }

    /// Emits every node owned by the cluster at `loc`.
    fn build_clb(&mut self, loc: GridLoc) -> Result<(), RrError> {
        let point = (loc.x, loc.y, loc.x, loc.y);
        for (iclass, class) in self.arch.classes().iter().enumerate() {
            let ptc = iclass as u32;
            match class.kind {
                ClassKind::Driver => {
                    let id = self.id(loc, RrKind::Source, ptc)?;
                    let mut edges = Vec::with_capacity(class.pins.len());
                    for &pin in &class.pins {
                        edges.push(RrEdge {
                            to: self.id(loc, RrKind::Opin, pin as u32)?,
                            switch: self.delayless_switch,
                        });
                    }
                    let capacity = class.pins.len() as u32;
                    self.commit_node(
                        id,
                        RrKind::Source,
                        point,
                        ptc,
                        SOURCE_COST_INDEX,
                        capacity,
                        0.0,
                        0.0,
                        edges,
                    );
                }
                ClassKind::Receiver => {
                    let id = self.id(loc, RrKind::Sink, ptc)?;
                    let capacity = class.pins.len() as u32;
                    self.commit_node(
                        id,
                        RrKind::Sink,
                        point,
                        ptc,
                        SINK_COST_INDEX,
                        capacity,
                        0.0,
                        0.0,
                        Vec::new(),
                    );
                }
            }
        }

        for pin in 0..self.arch.pins_per_clb() {
            let iclass = self.arch.class_of_pin(pin);
            match self.arch.class(iclass).kind {
                ClassKind::Driver => {
                    let id = self.id(loc, RrKind::Opin, pin as u32)?;
                    let edges = self.clb_opin_edges(pin, loc)?;
                    if edges.is_empty() {
                        return Err(RrError::OpinUnconnected {
                            loc,
                            ptc: pin as u32,
                        });
                    }
                    self.commit_node(
                        id,
                        RrKind::Opin,
                        point,
                        pin as u32,
                        OPIN_COST_INDEX,
                        1,
                        0.0,
                        0.0,
                        edges,
                    );
                }
                ClassKind::Receiver => {
                    let id = self.id(loc, RrKind::Ipin, pin as u32)?;
                    let edges = vec![RrEdge {
                        to: self.id(loc, RrKind::Sink, iclass.as_raw())?,
                        switch: self.delayless_switch,
                    }];
                    self.commit_node(
                        id,
                        RrKind::Ipin,
                        point,
                        pin as u32,
                        IPIN_COST_INDEX,
                        1,
                        0.0,
                        0.0,
                        edges,
                    );
                }
            }
        }
        Ok(())
    }

    /// Tracks reachable from cluster output pin `pin` at `loc`, across all
    /// four sides, honouring each track's connection-box mask.
    fn clb_opin_edges(&self, pin: u16, loc: GridLoc) -> Result<Vec<RrEdge>, RrError> {
        let mut edges = Vec::new();
        for side in Side::ALL {
            let Some(tracks) = &self.opin_to_tracks[pin as usize][side.index()] else {
                continue;
            };
            // Channels above and to the right share the cluster's own
            // coordinates; the other two belong to the neighbours.
            let tr_j = if side == Side::Bottom { loc.y - 1 } else { loc.y };
            let tr_i = if side == Side::Left { loc.x - 1 } else { loc.x };
            let (kind, details) = match side {
                Side::Left | Side::Right => (RrKind::Chany, &self.seg_y),
                Side::Top | Side::Bottom => (RrKind::Chanx, &self.seg_x),
            };
            for (iconn, &track) in tracks.iter().enumerate() {
                if iconn >= self.fc_output as usize {
                    break;
                }
                let cbox = match kind {
                    RrKind::Chanx => details[track as usize].has_cbox(tr_i, tr_j),
                    _ => details[track as usize].has_cbox(tr_j, tr_i),
                };
                if cbox {
                    edges.push(RrEdge {
                        to: self.id(GridLoc::new(tr_i, tr_j), kind, track)?,
                        switch: details[track as usize].opin_switch,
                    });
                }
            }
        }
        Ok(edges)
    }

    /// Emits the `io_rat` pad node quartets at IO location `loc`.
    fn build_pads(&mut self, loc: GridLoc) -> Result<(), RrError> {
        let point = (loc.x, loc.y, loc.x, loc.y);
        for pad in 0..self.arch.io_rat() as u32 {
            let source = self.id(loc, RrKind::Source, pad)?;
            let opin = self.id(loc, RrKind::Opin, pad)?;
            let sink = self.id(loc, RrKind::Sink, pad)?;
            let ipin = self.id(loc, RrKind::Ipin, pad)?;

            self.commit_node(
                source,
                RrKind::Source,
                point,
                pad,
                SOURCE_COST_INDEX,
                1,
                0.0,
                0.0,
                vec![RrEdge {
                    to: opin,
                    switch: self.delayless_switch,
                }],
            );

            let opin_edges = self.pad_opin_edges(pad, loc)?;
            if opin_edges.is_empty() {
                return Err(RrError::OpinUnconnected { loc, ptc: pad });
            }
            self.commit_node(
                opin,
                RrKind::Opin,
                point,
                pad,
                OPIN_COST_INDEX,
                1,
                0.0,
                0.0,
                opin_edges,
            );

            self.commit_node(
                sink,
                RrKind::Sink,
                point,
                pad,
                SINK_COST_INDEX,
                1,
                0.0,
                0.0,
                Vec::new(),
            );
            self.commit_node(
                ipin,
                RrKind::Ipin,
                point,
                pad,
                IPIN_COST_INDEX,
                1,
                0.0,
                0.0,
                vec![RrEdge {
                    to: sink,
                    switch: self.delayless_switch,
                }],
            );
        }
        Ok(())
    }

    /// Tracks reachable from pad `pad` in the one channel adjacent to its
    /// IO location.
    fn pad_opin_edges(&self, pad: u32, loc: GridLoc) -> Result<Vec<RrEdge>, RrError> {
        let grid = self.arch.grid();
        let (chan_loc, kind, details) = if loc.y == 0 {
            (GridLoc::new(loc.x, 0), RrKind::Chanx, &self.seg_x)
        } else if loc.y == grid.ny() + 1 {
            (
                GridLoc::new(loc.x, grid.ny()),
                RrKind::Chanx,
                &self.seg_x,
            )
        } else if loc.x == 0 {
            (GridLoc::new(0, loc.y), RrKind::Chany, &self.seg_y)
        } else {
            (
                GridLoc::new(grid.nx(), loc.y),
                RrKind::Chany,
                &self.seg_y,
            )
        };

        let mut edges = Vec::new();
        for (iconn, &track) in self.pads_to_tracks[pad as usize].iter().enumerate() {
            if iconn >= self.fc_pad as usize {
                break;
            }
            let cbox = match kind {
                RrKind::Chanx => details[track as usize].has_cbox(chan_loc.x, chan_loc.y),
                _ => details[track as usize].has_cbox(chan_loc.y, chan_loc.x),
            };
            if cbox {
                edges.push(RrEdge {
                    to: self.id(chan_loc, kind, track)?,
                    switch: details[track as usize].opin_switch,
                });
            }
        }
        Ok(edges)
    }

    /// Emits the horizontal wire segments starting at `loc`.
    fn build_xchan(&mut self, loc: GridLoc) -> Result<(), RrError> {
        let (i, j) = (loc.x, loc.y);
        let (nx, ny) = (self.arch.grid().nx(), self.arch.grid().ny());
        if !(1..=nx).contains(&i) || !(0..=ny).contains(&j) {
            return Ok(());
        }
        for track in 0..self.w {
            let details = &self.seg_x[track as usize];
            let istart = details.closest_start(i, j);
            if istart != i {
                continue;
            }
            let iend = details.end_from(istart, j, nx);
            let mut edges = Vec::new();

            if j == 0 {
                // Between the bottom pad row and the first cluster row.
                self.xtrack_to_clb_ipin(istart, iend, j, track, Side::Top, &mut edges)?;
                self.xtrack_to_pads(istart, iend, j, j, track, &mut edges)?;
                self.xtrack_to_ytracks(istart, iend, j, track, j + 1, &mut edges)?;
            } else if j == ny {
                // Between the top cluster row and the top pad row.
                self.xtrack_to_clb_ipin(istart, iend, j, track, Side::Bottom, &mut edges)?;
                self.xtrack_to_pads(istart, iend, j, j + 1, track, &mut edges)?;
                self.xtrack_to_ytracks(istart, iend, j, track, j, &mut edges)?;
            } else {
                self.xtrack_to_clb_ipin(istart, iend, j, track, Side::Bottom, &mut edges)?;
                self.xtrack_to_clb_ipin(istart, iend, j, track, Side::Top, &mut edges)?;
                self.xtrack_to_ytracks(istart, iend, j, track, j + 1, &mut edges)?;
                self.xtrack_to_ytracks(istart, iend, j, track, j, &mut edges)?;
            }
            if istart != 1 {
                self.xtrack_to_xtrack(istart, j, track, istart - 1, &mut edges)?;
            }
            if iend != nx {
                self.xtrack_to_xtrack(iend, j, track, iend + 1, &mut edges)?;
            }

            let id = self.id(GridLoc::new(i, j), RrKind::Chanx, track)?;
            let length = (iend - istart + 1) as f64;
            let capacity = match self.route_kind {
                RouteKind::Detailed => 1,
                RouteKind::Global => self.chan_capacity,
            };
            let cost = CHANX_COST_INDEX_START + self.seg_x[track as usize].seg_type.as_raw();
            let r = length * self.seg_x[track as usize].r_metal;
            let c = length * self.seg_x[track as usize].c_metal;
            self.commit_node(
                id,
                RrKind::Chanx,
                (istart, j, iend, j),
                track,
                cost,
                capacity,
                r,
                c,
                edges,
            );
        }
        Ok(())
    }

    /// Emits the vertical wire segments starting at `loc`.
    fn build_ychan(&mut self, loc: GridLoc) -> Result<(), RrError> {
        let (i, j) = (loc.x, loc.y);
        let (nx, ny) = (self.arch.grid().nx(), self.arch.grid().ny());
        if !(0..=nx).contains(&i) || !(1..=ny).contains(&j) {
            return Ok(());
        }
        for track in 0..self.w {
            let details = &self.seg_y[track as usize];
            let jstart = details.closest_start(j, i);
            if jstart != j {
                continue;
            }
            let jend = details.end_from(jstart, i, ny);
            let mut edges = Vec::new();

            if i == 0 {
                // Between the left pad column and the first cluster column.
                self.ytrack_to_clb_ipin(jstart, jend, i, track, Side::Right, &mut edges)?;
                self.ytrack_to_pads(jstart, jend, i, i, track, &mut edges)?;
                self.ytrack_to_xtracks(jstart, jend, i, track, i + 1, &mut edges)?;
            } else if i == nx {
                // Between the right cluster column and the right pad column.
                self.ytrack_to_clb_ipin(jstart, jend, i, track, Side::Left, &mut edges)?;
                self.ytrack_to_pads(jstart, jend, i, i + 1, track, &mut edges)?;
                self.ytrack_to_xtracks(jstart, jend, i, track, i, &mut edges)?;
            } else {
                self.ytrack_to_clb_ipin(jstart, jend, i, track, Side::Left, &mut edges)?;
                self.ytrack_to_clb_ipin(jstart, jend, i, track, Side::Right, &mut edges)?;
                self.ytrack_to_xtracks(jstart, jend, i, track, i + 1, &mut edges)?;
                self.ytrack_to_xtracks(jstart, jend, i, track, i, &mut edges)?;
            }
            if jstart != 1 {
                self.ytrack_to_ytrack(i, jstart, track, jstart - 1, &mut edges)?;
            }
            if jend != ny {
                self.ytrack_to_ytrack(i, jend, track, jend + 1, &mut edges)?;
            }

            let id = self.id(GridLoc::new(i, j), RrKind::Chany, track)?;
            let length = (jend - jstart + 1) as f64;
            let capacity = match self.route_kind {
                RouteKind::Detailed => 1,
                RouteKind::Global => self.chan_capacity,
            };
            let cost = CHANX_COST_INDEX_START
                + self.arch.segments().len() as u32
                + self.seg_y[track as usize].seg_type.as_raw();
            let r = length * self.seg_y[track as usize].r_metal;
            let c = length * self.seg_y[track as usize].c_metal;
            self.commit_node(
                id,
                RrKind::Chany,
                (i, jstart, i, jend),
                track,
                cost,
                capacity,
                r,
                c,
                edges,
            );
        }
        Ok(())
    }

    /// Wire-to-cluster-IPIN edges along one side of a horizontal segment.
    ///
    /// `side` is from the track's perspective: `Top` reaches the clusters
    /// above it, `Bottom` those at its own row.
    fn xtrack_to_clb_ipin(
        &self,
        istart: i32,
        iend: i32,
        tr_j: i32,
        track: u32,
        side: Side,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let clb_j = match side {
            Side::Bottom => tr_j,
            _ => tr_j + 1,
        };
        let pins = &self.tracks_to_clb_ipin[track as usize][side.index()];
        for i in istart..=iend {
            if self.seg_x[track as usize].has_cbox(i, tr_j) {
                for &pin in pins {
                    edges.push(RrEdge {
                        to: self.id(GridLoc::new(i, clb_j), RrKind::Ipin, pin)?,
                        switch: self.wire_to_ipin_switch,
                    });
                }
            }
        }
        Ok(())
    }

    /// Wire-to-pad-IPIN edges into the pad row at `pad_j`.
    fn xtrack_to_pads(
        &self,
        istart: i32,
        iend: i32,
        tr_j: i32,
        pad_j: i32,
        track: u32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        for i in istart..=iend {
            if self.seg_x[track as usize].has_cbox(i, tr_j) {
                for &pad in &self.tracks_to_pads[track as usize] {
                    edges.push(RrEdge {
                        to: self.id(GridLoc::new(i, pad_j), RrKind::Ipin, pad)?,
                        switch: self.wire_to_ipin_switch,
                    });
                }
            }
        }
        Ok(())
    }

    /// Wire-to-cluster-IPIN edges along one side of a vertical segment.
    fn ytrack_to_clb_ipin(
        &self,
        jstart: i32,
        jend: i32,
        tr_i: i32,
        track: u32,
        side: Side,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let clb_i = match side {
            Side::Left => tr_i,
            _ => tr_i + 1,
        };
        let pins = &self.tracks_to_clb_ipin[track as usize][side.index()];
        for j in jstart..=jend {
            if self.seg_y[track as usize].has_cbox(j, tr_i) {
                for &pin in pins {
                    edges.push(RrEdge {
                        to: self.id(GridLoc::new(clb_i, j), RrKind::Ipin, pin)?,
                        switch: self.wire_to_ipin_switch,
                    });
                }
            }
        }
        Ok(())
    }

    /// Wire-to-pad-IPIN edges into the pad column at `pad_i`.
    fn ytrack_to_pads(
        &self,
        jstart: i32,
        jend: i32,
        tr_i: i32,
        pad_i: i32,
        track: u32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        for j in jstart..=jend {
            if self.seg_y[track as usize].has_cbox(j, tr_i) {
                for &pad in &self.tracks_to_pads[track as usize] {
                    edges.push(RrEdge {
                        to: self.id(GridLoc::new(pad_i, j), RrKind::Ipin, pad)?,
                        switch: self.wire_to_ipin_switch,
                    });
                }
            }
        }
        Ok(())
    }

    /// Switch-box edges from a horizontal segment to the vertical segments
    /// at row `to_j`.
    ///
    /// Every unit-span connects diagonally to its left and to its right, so
    /// topologies that pair different tracks at the two junctions reach all
    /// of them. Targets are de-duplicated per source node.
    fn xtrack_to_ytracks(
        &mut self,
        istart: i32,
        iend: i32,
        from_j: i32,
        from_track: u32,
        to_j: i32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let yconn_to_above = to_j <= from_j;
        let from_switch = self.seg_x[from_track as usize].wire_switch;
        let to_side = if to_j > from_j { Side::Top } else { Side::Bottom };

        for i in istart..=iend {
            for (above_right, ychan_i) in [(false, i - 1), (true, i)] {
                if ychan_i < 0 || ychan_i > self.arch.grid().nx() {
                    continue;
                }
                let from_side = if above_right { Side::Left } else { Side::Right };
                let Some(to_track) =
                    track_pair(self.switch_block, from_side, to_side, from_track, self.w)
                else {
                    continue;
                };
                let is_x_sbox =
                    self.seg_x[from_track as usize].has_sbox(i, from_j, above_right);
                let is_y_sbox =
                    self.seg_y[to_track as usize].has_sbox(to_j, ychan_i, yconn_to_above);
                let to_switch = self.seg_y[to_track as usize].wire_switch;
                let pair =
                    self.reconcile_switches(is_x_sbox, is_y_sbox, from_switch, to_switch);
                if let Some(first) = pair[0] {
                    let to = self.id(GridLoc::new(ychan_i, to_j), RrKind::Chany, to_track)?;
                    if !self.edge_done[to.index()] {
                        self.edge_done[to.index()] = true;
                        edges.push(RrEdge { to, switch: first });
                        if let Some(second) = pair[1] {
                            edges.push(RrEdge { to, switch: second });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Switch-box edges from a vertical segment to the horizontal segments
    /// at column `to_i`.
    fn ytrack_to_xtracks(
        &mut self,
        jstart: i32,
        jend: i32,
        from_i: i32,
        from_track: u32,
        to_i: i32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let xconn_to_right = to_i <= from_i;
        let from_switch = self.seg_y[from_track as usize].wire_switch;
        let to_side = if to_i > from_i { Side::Right } else { Side::Left };

        for j in jstart..=jend {
            for (above_right, xchan_j) in [(false, j - 1), (true, j)] {
                if xchan_j < 0 || xchan_j > self.arch.grid().ny() {
                    continue;
                }
                let from_side = if above_right { Side::Bottom } else { Side::Top };
                let Some(to_track) =
                    track_pair(self.switch_block, from_side, to_side, from_track, self.w)
                else {
                    continue;
                };
                let is_y_sbox =
                    self.seg_y[from_track as usize].has_sbox(j, from_i, above_right);
                let is_x_sbox =
                    self.seg_x[to_track as usize].has_sbox(to_i, xchan_j, xconn_to_right);
                let to_switch = self.seg_x[to_track as usize].wire_switch;
                let pair =
                    self.reconcile_switches(is_y_sbox, is_x_sbox, from_switch, to_switch);
                if let Some(first) = pair[0] {
                    let to = self.id(GridLoc::new(to_i, xchan_j), RrKind::Chanx, to_track)?;
                    if !self.edge_done[to.index()] {
                        self.edge_done[to.index()] = true;
                        edges.push(RrEdge { to, switch: first });
                        if let Some(second) = pair[1] {
                            edges.push(RrEdge { to, switch: second });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// End-to-end edge from a horizontal segment to its colinear neighbour.
    fn xtrack_to_xtrack(
        &self,
        from_i: i32,
        j: i32,
        from_track: u32,
        to_i: i32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let (from_side, to_side, from_goes_right) = if from_i < to_i {
            (Side::Left, Side::Right, true)
        } else {
            (Side::Right, Side::Left, false)
        };
        let Some(to_track) = track_pair(self.switch_block, from_side, to_side, from_track, self.w)
        else {
            return Ok(());
        };
        let from_switch = self.seg_x[from_track as usize].wire_switch;
        let to_switch = self.seg_x[to_track as usize].wire_switch;
        let is_from_sbox = self.seg_x[from_track as usize].has_sbox(from_i, j, from_goes_right);
        let is_to_sbox = self.seg_x[to_track as usize].has_sbox(to_i, j, !from_goes_right);
        let pair = self.reconcile_switches(is_from_sbox, is_to_sbox, from_switch, to_switch);
        if let Some(first) = pair[0] {
            let to = self.id(GridLoc::new(to_i, j), RrKind::Chanx, to_track)?;
            edges.push(RrEdge { to, switch: first });
            if let Some(second) = pair[1] {
                edges.push(RrEdge { to, switch: second });
            }
        }
        Ok(())
    }

    /// End-to-end edge from a vertical segment to its colinear neighbour.
    fn ytrack_to_ytrack(
        &self,
        i: i32,
        from_j: i32,
        from_track: u32,
        to_j: i32,
        edges: &mut Vec<RrEdge>,
    ) -> Result<(), RrError> {
        let (from_side, to_side, from_goes_up) = if from_j < to_j {
            (Side::Bottom, Side::Top, true)
        } else {
            (Side::Top, Side::Bottom, false)
        };
        let Some(to_track) = track_pair(self.switch_block, from_side, to_side, from_track, self.w)
        else {
            return Ok(());
        };
        let from_switch = self.seg_y[from_track as usize].wire_switch;
        let to_switch = self.seg_y[to_track as usize].wire_switch;
        let is_from_sbox = self.seg_y[from_track as usize].has_sbox(from_j, i, from_goes_up);
        let is_to_sbox = self.seg_y[to_track as usize].has_sbox(to_j, i, !from_goes_up);
        let pair = self.reconcile_switches(is_from_sbox, is_to_sbox, from_switch, to_switch);
        if let Some(first) = pair[0] {
            let to = self.id(GridLoc::new(i, to_j), RrKind::Chany, to_track)?;
            edges.push(RrEdge { to, switch: first });
            if let Some(second) = pair[1] {
                edges.push(RrEdge { to, switch: second });
            }
        }
        Ok(())
    }

    /// Decides which switch (if any) physically implements a junction
    /// crossing, reconciling the wishes of the two segments.
    ///
    /// A crossing is built iff the originating segment wants a switch box
    /// there, or the destination wants one and its switch is an unbuffered
    /// pass transistor (which conducts both ways). When a buffer is wanted
    /// forward and a pass transistor backward, two switches result. When
    /// both directions want pass transistors of different types, the one
    /// with lower resistance wins, ties broken by lower switch index.
    fn reconcile_switches(
        &self,
        is_from_sbox: bool,
        is_to_sbox: bool,
        from_switch: SwitchId,
        to_switch: SwitchId,
    ) -> [Option<SwitchId>; 2] {
        let from_kind = self.arch.switch(from_switch);
        let to_kind = self.arch.switch(to_switch);
        match (is_from_sbox, is_to_sbox) {
            (false, false) => [None, None],
            (true, false) => [Some(to_switch), None],
            (false, true) => {
                if !from_kind.buffered {
                    [Some(from_switch), None]
                } else {
                    [None, None]
                }
            }
            (true, true) => {
                if from_switch == to_switch {
                    [Some(to_switch), None]
                } else if to_kind.buffered {
                    if !from_kind.buffered {
                        // Buffer forward, pass transistor backward.
                        [Some(to_switch), Some(from_switch)]
                    } else {
                        [Some(to_switch), None]
                    }
                } else if from_kind.buffered {
                    [Some(to_switch), None]
                } else if to_kind.r < from_kind.r {
                    [Some(to_switch), None]
                } else if from_kind.r < to_kind.r {
                    [Some(from_switch), None]
                } else if to_switch < from_switch {
                    [Some(to_switch), None]
                } else {
                    [Some(from_switch), None]
                }
            }
        }
    }
}

/// Builds the per-pin, per-side track lists for one pin direction.
///
/// Pins are interleaved across all four sides so that each pin spreads its
/// switches over distinct tracks, and logically-equivalent pins jointly
/// cover the channel. Global pins get no switches.
fn clb_pin_to_tracks(
    arch: &Architecture,
    kind: ClassKind,
    w: u32,
    fc: u32,
    perturb: bool,
    sink: &DiagnosticSink,
) -> PinTracks {
    let pins_per_clb = arch.pins_per_clb() as usize;
    let mut tracks: PinTracks = vec![[None, None, None, None]; pins_per_clb];

    let mut dir_list: [Vec<u16>; 4] = Default::default();
    for pin in 0..arch.pins_per_clb() {
        if arch.pin_kind(pin) != kind || arch.is_global_pin(pin) {
            continue;
        }
        for side in Side::ALL {
            if arch.pin_on_side(pin, side) {
                dir_list[side.index()].push(pin);
            }
        }
    }
    let num_phys_pins: usize = dir_list.iter().map(Vec::len).sum();
    if num_phys_pins == 0 {
        return tracks;
    }

    // Interleave sides: first pin of each side, then second of each, etc.
    let mut ordering: Vec<(u16, Side)> = Vec::with_capacity(num_phys_pins);
    let mut pindex = 0;
    while ordering.len() < num_phys_pins {
        for side in Side::ALL {
            if let Some(&pin) = dir_list[side.index()].get(pindex) {
                ordering.push((pin, side));
            }
        }
        pindex += 1;
    }

    let step = w as f64 / (fc as usize * num_phys_pins) as f64;
    if step > 1.0 {
        let what = match kind {
            ClassKind::Driver => "some tracks are never driven by cluster outputs",
            ClassKind::Receiver => "some tracks cannot reach any inputs",
        };
        sink.emit(Diagnostic::warning(
            DiagnosticCode::new(Category::Routing, 1),
            what,
        ));
    }

    if perturb {
        load_perturbed_pattern(&mut tracks, &ordering, w, fc, step);
    } else {
        load_uniform_pattern(&mut tracks, &ordering, w, fc, step);
    }
    tracks
}

/// Evenly distributes each pin's `fc` switches across the channel,
/// staggering the start track from pin to pin.
fn load_uniform_pattern(
    tracks: &mut PinTracks,
    ordering: &[(u16, Side)],
    w: u32,
    fc: u32,
    step: f64,
) {
    for (i, &(pin, side)) in ordering.iter().enumerate() {
        let mut list = Vec::with_capacity(fc as usize);
        for j in 0..fc {
            let f_track = i as f64 * step + j as f64 * w as f64 / fc as f64;
            list.push((f_track as u32).min(w - 1));
        }
        tracks[pin as usize][side.index()] = Some(list);
    }
}

/// Distributes switches unevenly: `fc/2 + 1` over one half of the channel
/// and the rest over the other, alternating which half is dense from pin to
/// pin. Used for inputs whose Fc would otherwise line up perfectly with the
/// output pattern.
fn load_perturbed_pattern(
    tracks: &mut PinTracks,
    ordering: &[(u16, Side)],
    w: u32,
    fc: u32,
    step: f64,
) {
    let fc_dense = fc / 2 + 1;
    let fc_sparse = fc - fc_dense;
    let spacing_dense = w as f64 / (2 * fc_dense) as f64;
    let spacing_sparse = if fc_sparse > 0 {
        w as f64 / (2 * fc_sparse) as f64
    } else {
        0.0
    };

    for (i, &(pin, side)) in ordering.iter().enumerate() {
        let halves = if i % 2 == 0 {
            [(fc_dense, spacing_dense), (fc_sparse, spacing_sparse)]
        } else {
            [(fc_sparse, spacing_sparse), (fc_dense, spacing_dense)]
        };
        let mut f_track = i as f64 * step;
        let mut list = Vec::with_capacity(fc as usize);
        for (count, spacing) in halves {
            for _ in 0..count {
                list.push((f_track as u32) % w);
                f_track += spacing;
            }
        }
        tracks[pin as usize][side.index()] = Some(list);
    }
}

/// Verifies that every track is reachable from at least one input pin,
/// warning about any that is not.
fn check_all_tracks_reach_pins(
    arch: &Architecture,
    tracks: &PinTracks,
    w: u32,
    fc: u32,
    sink: &DiagnosticSink,
) {
    let mut conns = vec![0u32; w as usize];
    for pin in 0..arch.pins_per_clb() as usize {
        for side in Side::ALL {
            if let Some(list) = &tracks[pin][side.index()] {
                for &track in list.iter().take(fc as usize) {
                    conns[track as usize] += 1;
                }
            }
        }
    }
    for (track, &count) in conns.iter().enumerate() {
        if count == 0 {
            sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Routing, 2),
                format!("track {track} does not connect to any cluster input pin"),
            ));
        }
    }
}

/// Inverts the per-pin track lists into per-track pin lists, converting pin
/// sides to the track's perspective.
fn invert_pin_tracks(
    arch: &Architecture,
    w: u32,
    ipin_to_tracks: &PinTracks,
) -> Vec<[Vec<u32>; 4]> {
    let mut result: Vec<[Vec<u32>; 4]> = vec![Default::default(); w as usize];
    for pin in 0..arch.pins_per_clb() {
        for side in Side::ALL {
            if let Some(list) = &ipin_to_tracks[pin as usize][side.index()] {
                let track_side = side.opposite();
                for &track in list {
                    result[track as usize][track_side.index()].push(pin as u32);
                }
            }
        }
    }
    result
}

/// Track list of each pad: the tracks an input pad drives.
fn load_pads_to_tracks(io_rat: u32, w: u32, fc_pad: u32) -> Vec<Vec<u32>> {
    let step = w as f64 / (fc_pad * io_rat) as f64;
    (0..io_rat)
        .map(|pad| {
            (0..fc_pad)
                .map(|conn| {
                    let track = pad as f64 * step + conn as f64 * w as f64 / fc_pad as f64;
                    (track as u32).min(w - 1)
                })
                .collect()
        })
        .collect()
}

/// Inverts the pad track lists into per-track pad lists.
fn invert_pad_tracks(w: u32, pads_to_tracks: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let mut result: Vec<Vec<u32>> = vec![Vec::new(); w as usize];
    for (pad, list) in pads_to_tracks.iter().enumerate() {
        for &track in list {
            result[track as usize].push(pad as u32);
        }
    }
    result
}

/// Records each net's SOURCE and SINK aggregates.
fn load_net_terminals(
    netlist: &Netlist,
    index: &RrSpatialIndex,
    arch: &Architecture,
) -> Result<Vec<Vec<RrNodeId>>, RrError> {
    let mut terminals = Vec::with_capacity(netlist.num_nets());
    for (net_id, net) in netlist.nets() {
        let mut list = Vec::with_capacity(net.num_pins());
        for (i, terminal) in net.pins.iter().enumerate() {
            let block = netlist.block(terminal.block);
            let kind = if i == 0 { RrKind::Source } else { RrKind::Sink };
            let ptc = match terminal.pin {
                Some(pin) => arch.class_of_pin(pin).as_raw(),
                None => netlist
                    .pad_slot(terminal.block)
                    .ok_or(RrError::MissingNetTerminals { net: net_id })?
                    as u32,
            };
            list.push(index.node_at(block.loc, kind, ptc)?);
        }
        terminals.push(list);
    }
    Ok(terminals)
}

/// Records each cluster's per-class SOURCE/SINK aggregate; pads get `None`.
fn load_clb_sources(
    netlist: &Netlist,
    index: &RrSpatialIndex,
    arch: &Architecture,
) -> Result<Vec<Vec<Option<RrNodeId>>>, RrError> {
    let mut sources = Vec::with_capacity(netlist.num_blocks());
    for (_, block) in netlist.blocks() {
        let mut per_class = Vec::with_capacity(arch.num_classes());
        for (iclass, class) in arch.classes().iter().enumerate() {
            if block.kind != BlockKind::Clb {
                per_class.push(None);
                continue;
            }
            let kind = match class.kind {
                ClassKind::Driver => RrKind::Source,
                ClassKind::Receiver => RrKind::Sink,
            };
            per_class.push(Some(index.node_at(block.loc, kind, iclass as u32)?));
        }
        sources.push(per_class);
    }
    Ok(sources)
}

/// Adds the capacitive loading of switches onto the wires they touch.
///
/// Every edge adds its switch's input capacitance to the wire it leaves and
/// its output capacitance to the wire it drives; wire-to-IPIN edges add one
/// connection-box multiplexer input instead.
fn roll_up_capacitance(arch: &Architecture, nodes: &mut [RrNode], c_ipin_cblock: f64) {
    let mut extra = vec![0.0_f64; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for edge in &node.edges {
            let switch = arch.switch(edge.switch);
            let to_kind = nodes[edge.to.index()].kind;
            if to_kind.is_wire() {
                extra[edge.to.index()] += switch.c_out;
            }
            if node.kind.is_wire() {
                extra[i] += if to_kind == RrKind::Ipin {
                    c_ipin_cblock
                } else {
                    switch.c_in
                };
            }
        }
    }
    for (node, add) in nodes.iter_mut().zip(extra) {
        node.c += add;
    }
}

/// Builds the cost-profile table: four pin profiles plus one profile per
/// segment type per channel direction.
fn build_indexed_data(
    arch: &Architecture,
    base_cost: BaseCostKind,
    max_len: i32,
) -> Vec<RrIndexedData> {
    let num_seg = arch.segments().len() as u32;
    let mut data = Vec::with_capacity(4 + 2 * num_seg as usize);

    for pin_base in [1.0, 0.0, 1.0, 0.95] {
        data.push(RrIndexedData {
            base_cost: pin_base,
            ortho_cost_index: None,
            seg_index: None,
            inv_length: 0.0,
            t_linear: 0.0,
            t_quadratic: 0.0,
            c_load: 0.0,
        });
    }

    let mut wire_entries = Vec::new();
    for (iseg, seg) in arch.segments().iter().enumerate() {
        let length = if seg.longline {
            max_len
        } else {
            (seg.length as i32).min(max_len)
        };
        let r_node = length as f64 * seg.r_metal;
        let c_node = length as f64 * seg.c_metal;
        let switch = arch.switch(seg.wire_switch);
        let (t_linear, t_quadratic, c_load) = if switch.buffered {
            (
                switch.t_del + switch.r * c_node + 0.5 * r_node * c_node,
                0.0,
                0.0,
            )
        } else {
            (
                switch.t_del + 0.5 * (switch.r + r_node) * c_node,
                0.5 * (switch.r + r_node) * c_node,
                c_node,
            )
        };
        wire_entries.push((iseg as u32, 1.0 / length as f64, t_linear, t_quadratic, c_load));
    }

    let min_per_span = wire_entries
        .iter()
        .map(|e| e.2 * e.1)
        .filter(|&d| d > 0.0)
        .fold(f64::INFINITY, f64::min);

    for direction in 0..2u32 {
        for &(iseg, inv_length, t_linear, t_quadratic, c_load) in &wire_entries {
            let ortho = CHANX_COST_INDEX_START + (1 - direction) * num_seg + iseg;
            let base = match base_cost {
                BaseCostKind::DemandOnly => 1.0,
                BaseCostKind::DelayNormalized => {
                    if min_per_span.is_finite() && min_per_span > 0.0 {
                        (t_linear * inv_length) / min_per_span
                    } else {
                        1.0
                    }
                }
            };
            data.push(RrIndexedData {
                base_cost: base,
                ortho_cost_index: Some(ortho),
                seg_index: Some(SegmentId::from_raw(iseg)),
                inv_length,
                t_linear,
                t_quadratic,
                c_load,
            });
        }
    }
    data
}
