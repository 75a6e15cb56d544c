//! Structural types of the architecture model.
//!
//! These describe the device family independent of any particular netlist:
//! what a logic cluster's pins look like, which routing segment templates
//! and programmable switches the fabric offers, and the timing parameters
//! of the cluster internals and pads.

use crate::ids::{ClassId, SwitchId};
use serde::{Deserialize, Serialize};

/// The kind of block occupying a grid location or named by the netlist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BlockKind {
    /// A logic cluster (CLB) holding user logic.
    Clb,
    /// An input pad.
    InPad,
    /// An output pad.
    OutPad,
    /// An IO grid location (hosts up to `io_rat` pads, each usable as
    /// either an input or an output).
    Io,
    /// A grid location with no programmable resources (the corners).
    Illegal,
}

/// Whether a pin class drives nets or receives them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassKind {
    /// Output pins: the class anchors a net's SOURCE.
    Driver,
    /// Input pins: the class anchors a net's SINK.
    Receiver,
}

/// A set of logically interchangeable cluster pins.
///
/// A net terminating on any pin of a class may legally use any other pin of
/// the same class; the RR-graph's SOURCE/SINK nodes aggregate at this
/// granularity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinClass {
    /// Whether the pins of this class drive or receive.
    pub kind: ClassKind,
    /// The cluster pin indices belonging to this class.
    pub pins: Vec<u16>,
}

impl PinClass {
    /// Returns the number of pins in this class.
    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }
}

/// A routing-track template.
///
/// Tracks in a channel are stamped out from these templates in proportion to
/// `frequency`. `frac_cb` and `frac_sb` give the fraction of a segment's
/// unit-spans (respectively endpoints) populated with connection boxes
/// (respectively switch boxes).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentKind {
    /// Logic-block spans covered by one segment of this type.
    pub length: u32,
    /// A long line runs the full device dimension regardless of `length`.
    pub longline: bool,
    /// Fraction of unit-spans carrying a connection box, in `[0, 1]`.
    pub frac_cb: f64,
    /// Fraction of endpoints carrying a switch box, in `[0, 1]`.
    pub frac_sb: f64,
    /// Fraction of channel tracks built from this template; the table's
    /// frequencies sum to 1.
    pub frequency: f64,
    /// Switch used to drive this segment from another segment.
    pub wire_switch: SwitchId,
    /// Switch used to drive this segment from a cluster or pad output pin.
    pub opin_switch: SwitchId,
    /// Metal resistance per unit-span, in ohms.
    pub r_metal: f64,
    /// Metal capacitance per unit-span, in farads.
    pub c_metal: f64,
}

/// A programmable routing switch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchKind {
    /// `true` for a buffered (unidirectional) switch, `false` for a pass
    /// transistor shared by both directions.
    pub buffered: bool,
    /// On-resistance, in ohms.
    pub r: f64,
    /// Capacitance seen by the wire the switch listens to, in farads.
    pub c_in: f64,
    /// Capacitance added to the wire the switch drives, in farads.
    pub c_out: f64,
    /// Intrinsic delay, in seconds.
    pub t_del: f64,
}

impl SwitchKind {
    /// Delay through the switch driving an unloaded wire.
    pub fn intrinsic_delay(&self) -> f64 {
        self.t_del + self.r * self.c_out
    }
}

/// The LUT + optional-FF atom instantiated inside clusters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubblockTemplate {
    /// Number of LUT inputs.
    pub lut_size: u16,
    /// Maximum subblocks a single cluster may contain.
    pub max_subblocks: u16,
    /// Combinational LUT-input to output delay, in seconds.
    pub t_comb: f64,
    /// LUT-input to FF-input delay for sequential subblocks, in seconds.
    pub t_seq_in: f64,
    /// Clock-arrival to output delay for sequential subblocks, in seconds.
    pub t_seq_out: f64,
}

/// Delays of the fixed (non-routed) structures of the fabric.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingParams {
    /// Off-chip to input-pad-output delay, in seconds.
    pub t_ipad: f64,
    /// Output-pad-input to off-chip delay, in seconds.
    pub t_opad: f64,
    /// Cluster input pin to subblock input pin delay, in seconds.
    pub t_clb_ipin_to_sblk_ipin: f64,
    /// Subblock output to same-cluster subblock input delay, in seconds.
    pub t_sblk_opin_to_sblk_ipin: f64,
    /// Subblock output to cluster output pin delay, in seconds.
    pub t_sblk_opin_to_clb_opin: f64,
    /// Input capacitance of one connection-box multiplexer tap, in farads.
    pub c_ipin_cblock: f64,
}

impl TimingParams {
    /// Timing parameters with every delay zero, for structural tests.
    pub fn zeroed() -> Self {
        Self {
            t_ipad: 0.0,
            t_opad: 0.0,
            t_clb_ipin_to_sblk_ipin: 0.0,
            t_sblk_opin_to_sblk_ipin: 0.0,
            t_sblk_opin_to_clb_opin: 0.0,
            c_ipin_cblock: 0.0,
        }
    }
}

/// A pin-class lookup result used by querying code paths.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PinInfo {
    /// The class the pin belongs to.
    pub class: ClassId,
    /// Whether the pin drives or receives.
    pub kind: ClassKind,
    /// Whether the pin is routed by dedicated global resources.
    pub is_global: bool,
}
