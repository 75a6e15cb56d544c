//! The placed netlist model: blocks, nets and cluster subblocks.

use crate::ids::{BlockId, NetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_arch::BlockKind;
use tessera_common::GridLoc;

/// A reference to a signal source inside a cluster.
///
/// Subblock inputs and clocks are fed either by a cluster pin or by the
/// output of a sibling subblock in the same cluster.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinRef {
    /// A cluster pin, by pin index.
    ClusterPin(u16),
    /// The output of the `i`-th subblock of the same cluster.
    SubblockOutput(u16),
}

/// One LUT + optional-FF atom inside a cluster.
///
/// `inputs` has one slot per LUT input; `None` slots are unused. `output`
/// names the cluster pin the subblock drives, if any. A connected `clock`
/// makes the subblock sequential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subblock {
    /// Instance name.
    pub name: String,
    /// LUT input connections, one slot per LUT input.
    pub inputs: Vec<Option<PinRef>>,
    /// Cluster output pin driven by this subblock, if any.
    pub output: Option<u16>,
    /// Clock connection; `Some` makes the subblock sequential.
    pub clock: Option<PinRef>,
}

impl Subblock {
    /// Returns `true` if no LUT input is connected.
    pub fn has_no_inputs(&self) -> bool {
        self.inputs.iter().all(Option::is_none)
    }
}

/// A placed block: a logic cluster or an IO pad.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Unique block name.
    pub name: String,
    /// Cluster, input pad or output pad.
    pub kind: BlockKind,
    /// Grid location the block is placed at.
    pub loc: GridLoc,
    /// Net connected at each pin; pads use a single slot.
    pub nets: Vec<Option<NetId>>,
}

impl Block {
    /// Returns `true` for pad blocks.
    pub fn is_pad(&self) -> bool {
        matches!(self.kind, BlockKind::InPad | BlockKind::OutPad)
    }
}

/// One terminal of a net.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NetPin {
    /// The block the terminal is on.
    pub block: BlockId,
    /// The cluster pin index, or `None` for pads.
    pub pin: Option<u16>,
}

/// A net: one driver terminal followed by its sinks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    /// Net name.
    pub name: String,
    /// Global nets are routed by dedicated resources and skipped by the
    /// detailed router and route checker.
    pub is_global: bool,
    /// Terminals; index 0 drives, 1.. are sinks.
    pub pins: Vec<NetPin>,
}

impl Net {
    /// The driving terminal.
    pub fn driver(&self) -> NetPin {
        self.pins[0]
    }

    /// The sink terminals.
    pub fn sinks(&self) -> &[NetPin] {
        &self.pins[1..]
    }

    /// Number of terminals including the driver.
    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }
}

/// The placed netlist.
///
/// Append-only during construction; the checker validates it afterwards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Netlist {
    blocks: Vec<Block>,
    nets: Vec<Net>,
    /// Subblock contents per block; empty for pads.
    subblocks: Vec<Vec<Subblock>>,
    /// Blocks placed at each grid location, in insertion order.
    #[serde(skip)]
    loc_index: HashMap<GridLoc, Vec<BlockId>>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placed block with `num_pins` pin slots and returns its id.
    pub fn add_block(
        &mut self,
        name: impl Into<String>,
        kind: BlockKind,
        loc: GridLoc,
        num_pins: u16,
    ) -> BlockId {
        let id = BlockId::from_raw(self.blocks.len() as u32);
        self.blocks.push(Block {
            name: name.into(),
            kind,
            loc,
            nets: vec![None; num_pins as usize],
        });
        self.subblocks.push(Vec::new());
        self.loc_index.entry(loc).or_default().push(id);
        id
    }

    /// Adds an empty net and returns its id.
    pub fn add_net(&mut self, name: impl Into<String>, is_global: bool) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(Net {
            name: name.into(),
            is_global,
            pins: Vec::new(),
        });
        id
    }

    /// Connects a block pin as the next terminal of `net`.
    ///
    /// The first connection made to a net is its driver. `pin` is `None` for
    /// pads, which have a single implicit pin.
    pub fn connect(&mut self, net: NetId, block: BlockId, pin: Option<u16>) {
        self.nets[net.index()].pins.push(NetPin { block, pin });
        let slot = pin.unwrap_or(0) as usize;
        self.blocks[block.index()].nets[slot] = Some(net);
    }

    /// Appends a subblock to a cluster.
    pub fn add_subblock(&mut self, block: BlockId, subblock: Subblock) {
        self.subblocks[block.index()].push(subblock);
    }

    /// Rebuilds the location index after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.loc_index.clear();
        for (i, block) in self.blocks.iter().enumerate() {
            self.loc_index
                .entry(block.loc)
                .or_default()
                .push(BlockId::from_raw(i as u32));
        }
    }

    /// One block.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// One net.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// All blocks, in id order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockId::from_raw(i as u32), b))
    }

    /// All nets, in id order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets
            .iter()
            .enumerate()
            .map(|(i, n)| (NetId::from_raw(i as u32), n))
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of nets.
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    /// The subblocks of a cluster (empty for pads).
    pub fn subblocks(&self, block: BlockId) -> &[Subblock] {
        &self.subblocks[block.index()]
    }

    /// Blocks placed at a grid location, in insertion order.
    pub fn blocks_at(&self, loc: GridLoc) -> &[BlockId] {
        self.loc_index.get(&loc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The single cluster at a location, if one is placed there.
    pub fn cluster_at(&self, loc: GridLoc) -> Option<BlockId> {
        self.blocks_at(loc)
            .iter()
            .copied()
            .find(|&b| self.block(b).kind == BlockKind::Clb)
    }

    /// The slot a pad occupies within its IO location.
    ///
    /// Returns `None` for clusters.
    pub fn pad_slot(&self, block: BlockId) -> Option<usize> {
        if !self.block(block).is_pad() {
            return None;
        }
        self.blocks_at(self.block(block).loc)
            .iter()
            .position(|&b| b == block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pad_netlist() -> (Netlist, BlockId, BlockId, NetId) {
        let mut nl = Netlist::new();
        let src = nl.add_block("in0", BlockKind::InPad, GridLoc::new(0, 1), 1);
        let dst = nl.add_block("out0", BlockKind::OutPad, GridLoc::new(3, 1), 1);
        let net = nl.add_net("n0", false);
        nl.connect(net, src, None);
        nl.connect(net, dst, None);
        (nl, src, dst, net)
    }

    #[test]
    fn driver_is_first_terminal() {
        let (nl, src, dst, net) = two_pad_netlist();
        assert_eq!(nl.net(net).driver().block, src);
        assert_eq!(nl.net(net).sinks().len(), 1);
        assert_eq!(nl.net(net).sinks()[0].block, dst);
    }

    #[test]
    fn block_pin_slots_record_net() {
        let (nl, src, _, net) = two_pad_netlist();
        assert_eq!(nl.block(src).nets[0], Some(net));
    }

    #[test]
    fn location_index() {
        let mut nl = Netlist::new();
        let loc = GridLoc::new(0, 1);
        let a = nl.add_block("a", BlockKind::InPad, loc, 1);
        let b = nl.add_block("b", BlockKind::OutPad, loc, 1);
        assert_eq!(nl.blocks_at(loc), &[a, b]);
        assert_eq!(nl.pad_slot(a), Some(0));
        assert_eq!(nl.pad_slot(b), Some(1));
    }

    #[test]
    fn cluster_lookup() {
        let mut nl = Netlist::new();
        let loc = GridLoc::new(1, 1);
        let clb = nl.add_block("clb0", BlockKind::Clb, loc, 6);
        assert_eq!(nl.cluster_at(loc), Some(clb));
        assert_eq!(nl.pad_slot(clb), None);
        assert_eq!(nl.cluster_at(GridLoc::new(2, 2)), None);
    }

    #[test]
    fn subblock_no_inputs() {
        let sub = Subblock {
            name: "s".into(),
            inputs: vec![None, None],
            output: Some(4),
            clock: None,
        };
        assert!(sub.has_no_inputs());
    }

    #[test]
    fn serde_roundtrip_rebuilds_index() {
        let (nl, src, _, _) = two_pad_netlist();
        let json = serde_json::to_string(&nl).unwrap();
        let mut restored: Netlist = serde_json::from_str(&json).unwrap();
        restored.rebuild_indices();
        assert_eq!(restored.num_blocks(), 2);
        assert_eq!(restored.blocks_at(GridLoc::new(0, 1)), &[src]);
    }
}
