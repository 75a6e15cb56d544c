//! Netlist validation.
//!
//! Runs after ingestion and before any graph is built. Violations that make
//! the netlist unusable are returned as errors; conditions the flow can
//! proceed through (constant generators, single-pin clusters, global nets on
//! ordinary pins) are reported through the diagnostic sink and counted.

use crate::data::{Netlist, PinRef};
use crate::ids::{BlockId, NetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_arch::{Architecture, BlockKind, ClassKind};
use tessera_common::GridLoc;
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use thiserror::Error;

/// A netlist violation the flow cannot proceed past.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// Two blocks share a name.
    #[error("{count} blocks are named \"{name}\"; block names must be unique")]
    DuplicateBlockName {
        /// The duplicated name.
        name: String,
        /// How many blocks carry it.
        count: usize,
    },
    /// A net has a driver but no sinks, or no terminals at all.
    #[error("net {net} has no fanout")]
    NoFanout {
        /// The offending net.
        net: NetId,
    },
    /// The first terminal of a net cannot drive.
    #[error("net {net} is driven by a terminal that cannot drive (block {block})")]
    InvalidDriver {
        /// The offending net.
        net: NetId,
        /// The terminal's block.
        block: BlockId,
    },
    /// A sink terminal of a net is a driver-class pin.
    #[error("net {net} uses driver-class pin {pin} of block {block} as a sink")]
    SinkIsDriver {
        /// The offending net.
        net: NetId,
        /// The terminal's block.
        block: BlockId,
        /// The driver-class pin used as a sink.
        pin: u16,
    },
    /// A cluster terminal names no pin, or a pad terminal names one.
    #[error("net {net} has a malformed terminal on block {block}")]
    MalformedTerminal {
        /// The offending net.
        net: NetId,
        /// The terminal's block.
        block: BlockId,
    },
    /// A terminal's pin index is outside the cluster's pin range.
    #[error("net {net} connects to pin {pin} of block {block}, outside the cluster pin range")]
    PinOutOfRange {
        /// The offending net.
        net: NetId,
        /// The terminal's block.
        block: BlockId,
        /// The out-of-range pin.
        pin: u16,
    },
    /// A non-global net connects to a global cluster pin.
    #[error("non-global net {net} connects to global pin {pin} of block {block}")]
    NonGlobalNetOnGlobalPin {
        /// The offending net.
        net: NetId,
        /// The terminal's block.
        block: BlockId,
        /// The global pin.
        pin: u16,
    },
    /// A block is placed on a grid location that cannot host it.
    #[error("block {block} ({kind:?}) is placed at {loc}, which cannot host it")]
    PlacementMismatch {
        /// The offending block.
        block: BlockId,
        /// Its kind.
        kind: BlockKind,
        /// The location it was placed at.
        loc: GridLoc,
    },
    /// More pads share an IO location than `io_rat` allows.
    #[error("{count} pads are placed at {loc}, io_rat is {io_rat}")]
    TooManyPadsAt {
        /// The overfull location.
        loc: GridLoc,
        /// Pads placed there.
        count: usize,
        /// The architecture's per-location pad capacity.
        io_rat: u16,
    },
    /// Two clusters are placed on the same location.
    #[error("more than one block is placed at cluster location {loc}")]
    ClusterOverlap {
        /// The contested location.
        loc: GridLoc,
    },
    /// A pad has no connection.
    #[error("pad {block} has no connection")]
    UnconnectedPad {
        /// The offending pad.
        block: BlockId,
    },
    /// A pad carries subblocks.
    #[error("pad {block} contains {count} subblocks")]
    PadHasSubblocks {
        /// The offending pad.
        block: BlockId,
        /// How many subblocks it carries.
        count: usize,
    },
    /// A cluster has no connected pins.
    #[error("cluster {block} has no connected pins")]
    EmptyCluster {
        /// The offending cluster.
        block: BlockId,
    },
    /// A cluster's pin-slot count disagrees with the architecture.
    #[error("cluster {block} has {actual} pin slots, architecture says {expected}")]
    ClusterPinCountMismatch {
        /// The offending cluster.
        block: BlockId,
        /// Slots present in the netlist.
        actual: usize,
        /// Slots the architecture requires.
        expected: usize,
    },
    /// A cluster's subblock count is out of range.
    #[error("cluster {block} contains {count} subblocks, allowed range is 1..={max}")]
    SubblockCountOutOfRange {
        /// The offending cluster.
        block: BlockId,
        /// Subblocks present.
        count: usize,
        /// Architecture maximum.
        max: u16,
    },
    /// A subblock's input list disagrees with the LUT size.
    #[error("subblock {subblock} of cluster {block} has {actual} input slots, LUT size is {expected}")]
    SubblockShapeMismatch {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
        /// Input slots present.
        actual: usize,
        /// Input slots required.
        expected: u16,
    },
    /// A subblock pin reference is out of range.
    #[error("subblock {subblock} of cluster {block} references out-of-range pin {reference:?}")]
    SubblockPinOutOfRange {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
        /// The out-of-range reference.
        reference: PinRef,
    },
    /// A subblock pin reference has the wrong class direction.
    #[error("subblock {subblock} of cluster {block} references pin {pin} of the wrong class")]
    SubblockPinWrongClass {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
        /// The wrongly-classed cluster pin.
        pin: u16,
    },
    /// A subblock input names a cluster pin that no net drives.
    #[error("subblock {subblock} of cluster {block} reads cluster pin {pin}, which no net drives")]
    SubblockInputUndriven {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
        /// The undriven cluster pin.
        pin: u16,
    },
    /// A used subblock has a clock but no inputs.
    #[error("subblock {subblock} of cluster {block} is a clocked constant generator")]
    ClockedConstantGenerator {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
    },
    /// A subblock whose output is unused still has connections.
    #[error("subblock {subblock} of cluster {block} has an unused output but is not empty")]
    UnusedSubblockNotEmpty {
        /// The containing cluster.
        block: BlockId,
        /// The offending subblock index.
        subblock: usize,
    },
    /// A connected cluster output pin is driven by zero or several subblocks.
    #[error("output pin {pin} of cluster {block} is driven by {count} subblocks, expected 1")]
    OpinDriveCount {
        /// The offending cluster.
        block: BlockId,
        /// The cluster output pin.
        pin: u16,
        /// Driving subblocks found.
        count: usize,
    },
    /// A connected cluster input pin feeds no subblock.
    #[error("input pin {pin} of cluster {block} is connected to a net but feeds no subblock")]
    IpinFeedsNothing {
        /// The offending cluster.
        block: BlockId,
        /// The cluster input pin.
        pin: u16,
    },
}

/// Summary counts produced by a successful netlist check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlistStats {
    /// Subblocks with a used output, no inputs and no clock.
    pub const_generators: usize,
    /// Sequential (clocked, used) subblocks.
    pub flip_flops: usize,
    /// Terminals of global nets landing on global cluster pins.
    pub global_pin_connections: usize,
}

/// Validates the netlist against the architecture.
///
/// Fails fast on the first fatal violation; warnings accumulate in `sink`.
pub fn check_netlist(
    netlist: &Netlist,
    arch: &Architecture,
    sink: &DiagnosticSink,
) -> Result<NetlistStats, NetlistError> {
    check_block_names(netlist)?;
    check_placement(netlist, arch)?;

    let mut stats = NetlistStats::default();
    for (net_id, _) in netlist.nets() {
        check_net(netlist, arch, net_id, sink, &mut stats)?;
    }
    for (block_id, block) in netlist.blocks() {
        match block.kind {
            BlockKind::Clb => check_cluster(netlist, arch, block_id, sink, &mut stats)?,
            BlockKind::InPad | BlockKind::OutPad => check_pad(netlist, block_id)?,
            BlockKind::Io | BlockKind::Illegal => {
                return Err(NetlistError::PlacementMismatch {
                    block: block_id,
                    kind: block.kind,
                    loc: block.loc,
                })
            }
        }
    }
    Ok(stats)
}

fn check_block_names(netlist: &Netlist) -> Result<(), NetlistError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, block) in netlist.blocks() {
        *counts.entry(block.name.as_str()).or_default() += 1;
    }
    for (name, count) in counts {
        if count > 1 {
            return Err(NetlistError::DuplicateBlockName {
                name: name.to_string(),
                count,
            });
        }
    }
    Ok(())
}

fn check_placement(netlist: &Netlist, arch: &Architecture) -> Result<(), NetlistError> {
    for (block_id, block) in netlist.blocks() {
        let host = arch.grid().block_kind_at(block.loc);
        let fits = match block.kind {
            BlockKind::Clb => host == BlockKind::Clb,
            BlockKind::InPad | BlockKind::OutPad => host == BlockKind::Io,
            _ => false,
        };
        if !fits {
            return Err(NetlistError::PlacementMismatch {
                block: block_id,
                kind: block.kind,
                loc: block.loc,
            });
        }
        let sharing = netlist.blocks_at(block.loc).len();
        match block.kind {
            BlockKind::Clb if sharing > 1 => {
                return Err(NetlistError::ClusterOverlap { loc: block.loc })
            }
            BlockKind::InPad | BlockKind::OutPad if sharing > arch.io_rat() as usize => {
                return Err(NetlistError::TooManyPadsAt {
                    loc: block.loc,
                    count: sharing,
                    io_rat: arch.io_rat(),
                })
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_net(
    netlist: &Netlist,
    arch: &Architecture,
    net_id: NetId,
    sink: &DiagnosticSink,
    stats: &mut NetlistStats,
) -> Result<(), NetlistError> {
    let net = netlist.net(net_id);
    if net.num_pins() < 2 {
        return Err(NetlistError::NoFanout { net: net_id });
    }

    for (i, terminal) in net.pins.iter().enumerate() {
        let block = netlist.block(terminal.block);
        match (block.is_pad(), terminal.pin) {
            (true, Some(_)) | (false, None) => {
                return Err(NetlistError::MalformedTerminal {
                    net: net_id,
                    block: terminal.block,
                })
            }
            _ => {}
        }

        if let Some(pin) = terminal.pin {
            if pin >= arch.pins_per_clb() {
                return Err(NetlistError::PinOutOfRange {
                    net: net_id,
                    block: terminal.block,
                    pin,
                });
            }
            let info = arch.pin_info(pin);
            if i == 0 && info.kind != ClassKind::Driver {
                return Err(NetlistError::InvalidDriver {
                    net: net_id,
                    block: terminal.block,
                });
            }
            if i > 0 && info.kind != ClassKind::Receiver {
                return Err(NetlistError::SinkIsDriver {
                    net: net_id,
                    block: terminal.block,
                    pin,
                });
            }
            match (net.is_global, info.is_global) {
                (true, true) => stats.global_pin_connections += 1,
                (true, false) => sink.emit(Diagnostic::warning(
                    DiagnosticCode::new(Category::Netlist, 20),
                    format!(
                        "global net {net_id} connects to non-global pin {pin} of block {block}",
                        block = terminal.block,
                    ),
                )),
                (false, true) => {
                    return Err(NetlistError::NonGlobalNetOnGlobalPin {
                        net: net_id,
                        block: terminal.block,
                        pin,
                    })
                }
                (false, false) => {}
            }
        } else if i == 0 && block.kind != BlockKind::InPad {
            return Err(NetlistError::InvalidDriver {
                net: net_id,
                block: terminal.block,
            });
        } else if i > 0 && block.kind == BlockKind::InPad {
            return Err(NetlistError::MalformedTerminal {
                net: net_id,
                block: terminal.block,
            });
        }
    }

    // A block connecting several pins of one receiver class to the same net
    // wastes routing; flag it but carry on.
    let mut sinks_per_class: HashMap<(BlockId, u32), usize> = HashMap::new();
    for terminal in net.sinks() {
        if let Some(pin) = terminal.pin {
            let class = arch.class_of_pin(pin);
            *sinks_per_class
                .entry((terminal.block, class.as_raw()))
                .or_default() += 1;
        }
    }
    for ((block, class), count) in sinks_per_class {
        if count > 1 {
            sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Netlist, 21),
                format!(
                    "block {block} connects {count} pins of class {class} to net {net_id}"
                ),
            ));
        }
    }
    Ok(())
}

fn check_pad(netlist: &Netlist, block_id: BlockId) -> Result<(), NetlistError> {
    let block = netlist.block(block_id);
    if block.nets.iter().all(Option::is_none) {
        return Err(NetlistError::UnconnectedPad { block: block_id });
    }
    let subblocks = netlist.subblocks(block_id).len();
    if subblocks != 0 {
        return Err(NetlistError::PadHasSubblocks {
            block: block_id,
            count: subblocks,
        });
    }
    Ok(())
}

fn check_cluster(
    netlist: &Netlist,
    arch: &Architecture,
    block_id: BlockId,
    sink: &DiagnosticSink,
    stats: &mut NetlistStats,
) -> Result<(), NetlistError> {
    let block = netlist.block(block_id);
    let template = arch.subblock();
    let pins_per_clb = arch.pins_per_clb();

    if block.nets.len() != pins_per_clb as usize {
        return Err(NetlistError::ClusterPinCountMismatch {
            block: block_id,
            actual: block.nets.len(),
            expected: pins_per_clb as usize,
        });
    }

    let num_conn = block.nets.iter().filter(|n| n.is_some()).count();
    if num_conn == 0 {
        return Err(NetlistError::EmptyCluster { block: block_id });
    }
    if num_conn == 1 {
        sink.emit(Diagnostic::warning(
            DiagnosticCode::new(Category::Netlist, 22),
            format!("cluster {block_id} has only one connected pin"),
        ));
    }

    let subblocks = netlist.subblocks(block_id);
    if subblocks.is_empty() || subblocks.len() > template.max_subblocks as usize {
        return Err(NetlistError::SubblockCountOutOfRange {
            block: block_id,
            count: subblocks.len(),
            max: template.max_subblocks,
        });
    }

    // Shape and reference validity.
    for (isub, sub) in subblocks.iter().enumerate() {
        if sub.inputs.len() != template.lut_size as usize {
            return Err(NetlistError::SubblockShapeMismatch {
                block: block_id,
                subblock: isub,
                actual: sub.inputs.len(),
                expected: template.lut_size,
            });
        }
        for reference in sub.inputs.iter().chain([&sub.clock]).flatten() {
            match *reference {
                PinRef::ClusterPin(pin) => {
                    if pin >= pins_per_clb {
                        return Err(NetlistError::SubblockPinOutOfRange {
                            block: block_id,
                            subblock: isub,
                            reference: *reference,
                        });
                    }
                    if arch.pin_kind(pin) != ClassKind::Receiver {
                        return Err(NetlistError::SubblockPinWrongClass {
                            block: block_id,
                            subblock: isub,
                            pin,
                        });
                    }
                    if block.nets[pin as usize].is_none() {
                        return Err(NetlistError::SubblockInputUndriven {
                            block: block_id,
                            subblock: isub,
                            pin,
                        });
                    }
                }
                PinRef::SubblockOutput(other) => {
                    if other as usize >= subblocks.len() {
                        return Err(NetlistError::SubblockPinOutOfRange {
                            block: block_id,
                            subblock: isub,
                            reference: *reference,
                        });
                    }
                }
            }
        }
        if let Some(pin) = sub.output {
            if pin >= pins_per_clb {
                return Err(NetlistError::SubblockPinOutOfRange {
                    block: block_id,
                    subblock: isub,
                    reference: PinRef::ClusterPin(pin),
                });
            }
            if arch.pin_kind(pin) != ClassKind::Driver {
                return Err(NetlistError::SubblockPinWrongClass {
                    block: block_id,
                    subblock: isub,
                    pin,
                });
            }
        }
    }

    // How many points each subblock output feeds: sibling inputs and clocks,
    // plus the cluster output pin when that pin carries a net.
    let mut opin_uses = vec![0usize; subblocks.len()];
    for sub in subblocks {
        for reference in sub.inputs.iter().chain([&sub.clock]).flatten() {
            if let PinRef::SubblockOutput(other) = *reference {
                opin_uses[other as usize] += 1;
            }
        }
    }
    for (isub, sub) in subblocks.iter().enumerate() {
        if let Some(pin) = sub.output {
            if block.nets[pin as usize].is_some() {
                opin_uses[isub] += 1;
            }
        }
    }

    for (isub, sub) in subblocks.iter().enumerate() {
        if opin_uses[isub] == 0 {
            if !sub.has_no_inputs() || sub.clock.is_some() {
                return Err(NetlistError::UnusedSubblockNotEmpty {
                    block: block_id,
                    subblock: isub,
                });
            }
            continue;
        }
        if sub.has_no_inputs() {
            if sub.clock.is_some() {
                return Err(NetlistError::ClockedConstantGenerator {
                    block: block_id,
                    subblock: isub,
                });
            }
            stats.const_generators += 1;
            sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Netlist, 23),
                format!("subblock {isub} of cluster {block_id} is a constant generator"),
            ));
        }
        if sub.clock.is_some() {
            stats.flip_flops += 1;
        }
    }

    // Cluster-pin to subblock coherence.
    for pin in 0..pins_per_clb {
        if block.nets[pin as usize].is_none() {
            continue;
        }
        match arch.pin_kind(pin) {
            ClassKind::Driver => {
                let drivers = subblocks
                    .iter()
                    .filter(|sub| sub.output == Some(pin))
                    .count();
                if drivers != 1 {
                    return Err(NetlistError::OpinDriveCount {
                        block: block_id,
                        pin,
                        count: drivers,
                    });
                }
            }
            ClassKind::Receiver => {
                let fanout = subblocks
                    .iter()
                    .flat_map(|sub| sub.inputs.iter().chain([&sub.clock]))
                    .flatten()
                    .filter(|&&r| r == PinRef::ClusterPin(pin))
                    .count();
                if fanout == 0 {
                    return Err(NetlistError::IpinFeedsNothing {
                        block: block_id,
                        pin,
                    });
                }
            }
        }
    }

    Ok(())
}
