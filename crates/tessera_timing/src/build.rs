//! Timing-graph construction over a placed netlist.
//!
//! Every used cluster pin, subblock pin and pad side becomes one timing
//! node. Ids are handed out in a single counting pass so the edge-emission
//! pass can wire nodes directly. The out-edges of a net-driving node are
//! emitted in net-sink order, which is what lets net delays be injected
//! per-edge later without any searching.

use crate::error::TimingError;
use crate::graph::{
    TimingEdge, TimingGraph, TimingNodeKind, Tnode, T_CONSTANT_GENERATOR,
};
use crate::ids::TimingNodeId;
use crate::levels::{check_degree_contracts, levelize};
use tessera_arch::{Architecture, BlockKind, ClassKind, TimingParams};
use tessera_netlist::{BlockId, Netlist, PinRef};

/// Per-net slack storage: one entry per net sink, in net order.
pub type NetSlacks = Vec<Vec<f64>>;

/// Maps every pin of the design to its timing node, if used.
struct PinMaps {
    /// Per block, per pin. Pads use two slots: pad input side, pad output.
    block_pin: Vec<Vec<Option<TimingNodeId>>>,
    /// Per block, per subblock: LUT inputs, then output, then clock.
    sblk_pin: Vec<Vec<Vec<Option<TimingNodeId>>>>,
}

/// Builds the timing graph and allocates the slack storage that
/// [`load_slacks`](crate::sta::load_slacks) later fills.
pub fn build_timing_graph(
    arch: &Architecture,
    netlist: &Netlist,
    params: &TimingParams,
) -> Result<(TimingGraph, NetSlacks), TimingError> {
    let (maps, num_tnodes) = allocate_pin_mappings(arch, netlist);
    let mut tnodes: Vec<Tnode> = (0..num_tnodes)
        .map(|_| Tnode::new(TimingNodeKind::ClbIpin, BlockId::from_raw(0)))
        .collect();
    let mut net_to_driver: Vec<Option<TimingNodeId>> = vec![None; netlist.num_nets()];

    for (block_id, block) in netlist.blocks() {
        match block.kind {
            BlockKind::Clb => {
                build_clb_tnodes(
                    arch,
                    netlist,
                    params,
                    block_id,
                    &maps,
                    &mut tnodes,
                    &mut net_to_driver,
                );
                build_subblock_tnodes(arch, netlist, params, block_id, &maps, &mut tnodes);
            }
            BlockKind::InPad => {
                build_inpad_tnodes(
                    netlist,
                    params,
                    block_id,
                    &maps,
                    &mut tnodes,
                    &mut net_to_driver,
                );
            }
            BlockKind::OutPad => {
                build_outpad_tnodes(params, block_id, &maps, &mut tnodes);
            }
            _ => {}
        }
    }

    let net_to_driver: Vec<TimingNodeId> = net_to_driver
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            d.ok_or(TimingError::NetDriverMissing {
                net: tessera_netlist::NetId::from_raw(i as u32),
            })
        })
        .collect::<Result<_, _>>()?;

    let (levels, num_sinks) = levelize(&tnodes)?;
    let graph = TimingGraph {
        tnodes,
        net_to_driver,
        levels,
        num_sinks,
    };
    check_degree_contracts(&graph)?;

    let slacks = netlist
        .nets()
        .map(|(_, net)| vec![0.0; net.num_pins() - 1])
        .collect();
    Ok((graph, slacks))
}

/// How many points each subblock output feeds: sibling inputs and clocks
/// plus the cluster output pin when that pin carries a net.
fn subblock_opin_uses(netlist: &Netlist, block: BlockId) -> Vec<usize> {
    let subblocks = netlist.subblocks(block);
    let mut uses = vec![0usize; subblocks.len()];
    for sub in subblocks {
        for reference in sub.inputs.iter().chain([&sub.clock]).flatten() {
            if let PinRef::SubblockOutput(other) = *reference {
                uses[other as usize] += 1;
            }
        }
    }
    for (isub, sub) in subblocks.iter().enumerate() {
        if let Some(pin) = sub.output {
            if netlist.block(block).nets[pin as usize].is_some() {
                uses[isub] += 1;
            }
        }
    }
    uses
}

/// Counting pass: assigns a timing-node id to every used pin.
fn allocate_pin_mappings(arch: &Architecture, netlist: &Netlist) -> (PinMaps, usize) {
    let lut_size = arch.subblock().lut_size as usize;
    let out_pin = lut_size;
    let clk_pin = lut_size + 1;

    let mut block_pin = Vec::with_capacity(netlist.num_blocks());
    let mut sblk_pin = Vec::with_capacity(netlist.num_blocks());
    let mut next = 0u32;
    let mut take = |slots: u32| {
        let id = TimingNodeId::from_raw(next);
        next += slots;
        id
    };

    for (block_id, block) in netlist.blocks() {
        if block.kind == BlockKind::Clb {
            let mut pins = Vec::with_capacity(block.nets.len());
            for net in &block.nets {
                pins.push(net.is_some().then(|| take(1)));
            }
            block_pin.push(pins);

            let uses = subblock_opin_uses(netlist, block_id);
            let mut subs = Vec::with_capacity(netlist.subblocks(block_id).len());
            for (isub, sub) in netlist.subblocks(block_id).iter().enumerate() {
                let mut map = vec![None; clk_pin + 1];
                for (ipin, input) in sub.inputs.iter().enumerate() {
                    if input.is_some() {
                        map[ipin] = Some(take(1));
                    }
                }
                if uses[isub] > 0 {
                    // Constant generators get a second slot for the dummy
                    // input node right after the output node.
                    let slots = if sub.has_no_inputs() { 2 } else { 1 };
                    map[out_pin] = Some(take(slots));
                }
                if sub.clock.is_some() {
                    // The clock entry plus the sequential sink.
                    map[clk_pin] = Some(take(2));
                }
                subs.push(map);
            }
            sblk_pin.push(subs);
        } else {
            block_pin.push(vec![Some(take(1)), Some(take(1))]);
            sblk_pin.push(Vec::new());
        }
    }
    (
        PinMaps {
            block_pin,
            sblk_pin,
        },
        next as usize,
    )
}

/// Emits the out-edges of a node that drives a net: one edge per net sink,
/// in net order, delays to be injected later.
fn build_net_driver_edges(
    netlist: &Netlist,
    maps: &PinMaps,
    tnodes: &mut [Tnode],
    inode: TimingNodeId,
    net: tessera_netlist::NetId,
    net_to_driver: &mut [Option<TimingNodeId>],
) {
    net_to_driver[net.index()] = Some(inode);
    let mut edges = Vec::with_capacity(netlist.net(net).num_pins() - 1);
    for terminal in netlist.net(net).sinks() {
        let to_pin = terminal.pin.unwrap_or(0) as usize;
        if let Some(to_node) = maps.block_pin[terminal.block.index()][to_pin] {
            edges.push(TimingEdge {
                to: to_node,
                delay: 0.0,
            });
        }
    }
    tnodes[inode.index()].edges = edges;
}

/// Builds the cluster-pin timing nodes of one cluster and hooks its input
/// pins to the subblock pins they feed.
fn build_clb_tnodes(
    arch: &Architecture,
    netlist: &Netlist,
    params: &TimingParams,
    block_id: BlockId,
    maps: &PinMaps,
    tnodes: &mut [Tnode],
    net_to_driver: &mut [Option<TimingNodeId>],
) {
    let block = netlist.block(block_id);
    let clk_pin = arch.subblock().lut_size as usize + 1;

    for (pin, net) in block.nets.iter().enumerate() {
        let Some(inode) = maps.block_pin[block_id.index()][pin] else {
            continue;
        };
        let kind = if arch.pin_kind(pin as u16) == ClassKind::Driver {
            TimingNodeKind::ClbOpin
        } else {
            TimingNodeKind::ClbIpin
        };
        tnodes[inode.index()] = Tnode::new(kind, block_id);
        tnodes[inode.index()].pin = Some(pin as u16);
        if kind == TimingNodeKind::ClbOpin {
            if let Some(net) = net {
                build_net_driver_edges(netlist, maps, tnodes, inode, *net, net_to_driver);
            }
        }
    }

    // Input pins fan out to the subblock inputs and clocks they drive.
    for (isub, sub) in netlist.subblocks(block_id).iter().enumerate() {
        for (ipin, input) in sub.inputs.iter().enumerate() {
            if let Some(PinRef::ClusterPin(p)) = input {
                if let (Some(from), Some(to)) = (
                    maps.block_pin[block_id.index()][*p as usize],
                    maps.sblk_pin[block_id.index()][isub][ipin],
                ) {
                    tnodes[from.index()].edges.push(TimingEdge {
                        to,
                        delay: params.t_clb_ipin_to_sblk_ipin,
                    });
                }
            }
        }
        if let Some(PinRef::ClusterPin(p)) = sub.clock {
            if let (Some(from), Some(to)) = (
                maps.block_pin[block_id.index()][p as usize],
                maps.sblk_pin[block_id.index()][isub][clk_pin],
            ) {
                // Clocks reach the capture point at T = 0; gated or locally
                // generated clocks accumulate delay upstream of this pin.
                tnodes[from.index()].edges.push(TimingEdge { to, delay: 0.0 });
            }
        }
    }
}

/// Builds the subblock-owned timing nodes of one cluster: outputs, inputs,
/// and the FF or constant-generator extras.
fn build_subblock_tnodes(
    arch: &Architecture,
    netlist: &Netlist,
    params: &TimingParams,
    block_id: BlockId,
    maps: &PinMaps,
    tnodes: &mut [Tnode],
) {
    let template = arch.subblock();
    let lut_size = template.lut_size as usize;
    let out_pin = lut_size;
    let clk_pin = lut_size + 1;
    let block = netlist.block(block_id);
    let subblocks = netlist.subblocks(block_id);
    let sub_map = &maps.sblk_pin[block_id.index()];

    // Output nodes and their fanout.
    for (isub, sub) in subblocks.iter().enumerate() {
        let Some(out_node) = sub_map[isub][out_pin] else {
            continue;
        };
        tnodes[out_node.index()] = Tnode::new(TimingNodeKind::SubblkOpin, block_id);
        tnodes[out_node.index()].subblock = Some(isub as u16);
        if let Some(p) = sub.output {
            if block.nets[p as usize].is_some() {
                if let Some(to) = maps.block_pin[block_id.index()][p as usize] {
                    tnodes[out_node.index()].edges.push(TimingEdge {
                        to,
                        delay: params.t_sblk_opin_to_clb_opin,
                    });
                }
            }
        }
    }
    for (isub, sub) in subblocks.iter().enumerate() {
        for (ipin, input) in sub.inputs.iter().enumerate() {
            if let Some(PinRef::SubblockOutput(k)) = input {
                if let (Some(from), Some(to)) =
                    (sub_map[*k as usize][out_pin], sub_map[isub][ipin])
                {
                    tnodes[from.index()].edges.push(TimingEdge {
                        to,
                        delay: params.t_sblk_opin_to_sblk_ipin,
                    });
                }
            }
        }
        if let Some(PinRef::SubblockOutput(k)) = sub.clock {
            if let (Some(from), Some(to)) = (sub_map[k as usize][out_pin], sub_map[isub][clk_pin])
            {
                tnodes[from.index()].edges.push(TimingEdge {
                    to,
                    delay: params.t_sblk_opin_to_sblk_ipin,
                });
            }
        }
    }

    // Input pins, clock pairs and constant-generator dummies.
    for (isub, sub) in subblocks.iter().enumerate() {
        let Some(out_node) = sub_map[isub][out_pin] else {
            continue;
        };

        let (target, input_delay) = match sub_map[isub][clk_pin] {
            None => (out_node, template.t_comb),
            Some(clk_node) => {
                // The clock entry releases the output; the data sink
                // captures the inputs.
                tnodes[clk_node.index()] = Tnode::new(TimingNodeKind::FfSource, block_id);
                tnodes[clk_node.index()].subblock = Some(isub as u16);
                tnodes[clk_node.index()].edges.push(TimingEdge {
                    to: out_node,
                    delay: template.t_seq_out,
                });
                let ff_sink = TimingNodeId::from_raw(clk_node.as_raw() + 1);
                tnodes[ff_sink.index()] = Tnode::new(TimingNodeKind::FfSink, block_id);
                tnodes[ff_sink.index()].subblock = Some(isub as u16);
                (ff_sink, template.t_seq_in)
            }
        };

        let mut has_inputs = false;
        for (ipin, _) in sub.inputs.iter().enumerate() {
            let Some(inode) = sub_map[isub][ipin] else {
                continue;
            };
            has_inputs = true;
            tnodes[inode.index()] = Tnode::new(TimingNodeKind::SubblkIpin, block_id);
            tnodes[inode.index()].pin = Some(ipin as u16);
            tnodes[inode.index()].subblock = Some(isub as u16);
            tnodes[inode.index()].edges.push(TimingEdge {
                to: target,
                delay: input_delay,
            });
        }

        if !has_inputs {
            // A constant generator: its dummy input fires far in the past
            // so downstream logic always sees the constant ready.
            let dummy = TimingNodeId::from_raw(out_node.as_raw() + 1);
            tnodes[dummy.index()] = Tnode::new(TimingNodeKind::ConstantGenSource, block_id);
            tnodes[dummy.index()].subblock = Some(isub as u16);
            tnodes[dummy.index()].edges.push(TimingEdge {
                to: target,
                delay: T_CONSTANT_GENERATOR,
            });
        }
    }
}

/// Returns `true` if the net driven by this input pad is a global signal
/// used as at least one subblock clock.
fn is_global_clock(netlist: &Netlist, block_id: BlockId) -> bool {
    let Some(net_id) = netlist.block(block_id).nets[0] else {
        return false;
    };
    let net = netlist.net(net_id);
    if !net.is_global {
        return false;
    }
    net.sinks().iter().any(|terminal| {
        let Some(pin) = terminal.pin else {
            return false;
        };
        netlist
            .subblocks(terminal.block)
            .iter()
            .any(|sub| sub.clock == Some(PinRef::ClusterPin(pin)))
    })
}

fn build_inpad_tnodes(
    netlist: &Netlist,
    params: &TimingParams,
    block_id: BlockId,
    maps: &PinMaps,
    tnodes: &mut [Tnode],
    net_to_driver: &mut [Option<TimingNodeId>],
) {
    let source = maps.block_pin[block_id.index()][0].expect("pads always map both slots");
    let opin = maps.block_pin[block_id.index()][1].expect("pads always map both slots");

    // Global clocks arrive on chip at T = 0.
    let delay = if is_global_clock(netlist, block_id) {
        0.0
    } else {
        params.t_ipad
    };
    tnodes[source.index()] = Tnode::new(TimingNodeKind::InpadSource, block_id);
    tnodes[source.index()].edges.push(TimingEdge { to: opin, delay });

    tnodes[opin.index()] = Tnode::new(TimingNodeKind::InpadOpin, block_id);
    tnodes[opin.index()].pin = Some(0);
    if let Some(net) = netlist.block(block_id).nets[0] {
        build_net_driver_edges(netlist, maps, tnodes, opin, net, net_to_driver);
    }
}

fn build_outpad_tnodes(
    params: &TimingParams,
    block_id: BlockId,
    maps: &PinMaps,
    tnodes: &mut [Tnode],
) {
    let ipin = maps.block_pin[block_id.index()][0].expect("pads always map both slots");
    let sink = maps.block_pin[block_id.index()][1].expect("pads always map both slots");

    tnodes[ipin.index()] = Tnode::new(TimingNodeKind::OutpadIpin, block_id);
    tnodes[ipin.index()].pin = Some(0);
    tnodes[ipin.index()].edges.push(TimingEdge {
        to: sink,
        delay: params.t_opad,
    });
    tnodes[sink.index()] = Tnode::new(TimingNodeKind::OutpadSink, block_id);
}
