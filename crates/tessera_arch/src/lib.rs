//! Architecture model for the Tessera FPGA back-end.
//!
//! [`Architecture`] is the read-only description of the target device family:
//! cluster pin classes and their sides, routing segment templates, switch
//! types, the subblock (LUT + FF) template, fabric timing parameters and the
//! device grid. It is built once from an [`ArchDescription`] supplied by the
//! external architecture-ingestion layer, validated on construction, and
//! queried by the RR-graph and timing-graph builders.

#![warn(missing_docs)]

pub mod grid;
pub mod ids;
pub mod types;

pub use grid::Grid;
pub use ids::{ClassId, SegmentId, SwitchId};
pub use types::{
    BlockKind, ClassKind, PinClass, PinInfo, SegmentKind, SubblockTemplate, SwitchKind,
    TimingParams,
};

use serde::{Deserialize, Serialize};
use tessera_common::Side;
use thiserror::Error;

/// An inconsistency detected while validating an architecture description.
#[derive(Debug, Error)]
pub enum ArchError {
    /// A cluster pin belongs to no pin class.
    #[error("cluster pin {pin} belongs to no pin class")]
    PinUnclassified {
        /// The offending pin index.
        pin: u16,
    },
    /// A cluster pin appears in more than one pin class.
    #[error("cluster pin {pin} appears in more than one pin class")]
    PinMultiplyClassified {
        /// The offending pin index.
        pin: u16,
    },
    /// A pin class contains no pins.
    #[error("pin class {class} is empty")]
    EmptyClass {
        /// The offending class.
        class: ClassId,
    },
    /// A pin placed on a cluster side is outside the cluster's pin range.
    #[error("pin {pin} placed on side {side} is out of range (pins_per_clb = {pins_per_clb})")]
    PinSideOutOfRange {
        /// The offending pin index.
        pin: u16,
        /// The side it was placed on.
        side: Side,
        /// The cluster's pin count.
        pins_per_clb: u16,
    },
    /// A segment template names a switch outside the switch table.
    #[error("segment {segment} references switch {switch} outside the switch table")]
    SwitchOutOfRange {
        /// The offending segment.
        segment: SegmentId,
        /// The out-of-range switch.
        switch: SwitchId,
    },
    /// A segment template has zero length.
    #[error("segment {segment} has zero length")]
    SegmentLengthZero {
        /// The offending segment.
        segment: SegmentId,
    },
    /// The segment table is empty.
    #[error("the segment table is empty")]
    NoSegments,
    /// The switch table is empty.
    #[error("the switch table is empty")]
    NoSwitches,
    /// Segment frequencies do not sum to 1.
    #[error("segment frequencies sum to {sum}, expected 1")]
    BadFrequencySum {
        /// The actual sum.
        sum: f64,
    },
    /// `io_rat` must be at least 1.
    #[error("io_rat is {io_rat}, expected at least 1")]
    BadIoRat {
        /// The offending value.
        io_rat: u16,
    },
    /// The subblock template is degenerate.
    #[error("subblock template has lut_size {lut_size} and max_subblocks {max_subblocks}")]
    BadSubblockTemplate {
        /// LUT input count from the template.
        lut_size: u16,
        /// Maximum subblocks per cluster from the template.
        max_subblocks: u16,
    },
}

/// The raw description handed over by the architecture-ingestion layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchDescription {
    /// The device grid.
    pub grid: Grid,
    /// The pin-class table; classes jointly cover pins `0..pins_per_clb`.
    pub classes: Vec<PinClass>,
    /// Cluster pins carried by dedicated global routing (clocks and such).
    pub global_pins: Vec<u16>,
    /// Pins physically present on each cluster side, indexed by
    /// [`Side::index`].
    pub pins_on_side: [Vec<u16>; 4],
    /// Pads per IO grid location.
    pub io_rat: u16,
    /// Routing segment templates.
    pub segments: Vec<SegmentKind>,
    /// Programmable switch types.
    pub switches: Vec<SwitchKind>,
    /// The cluster-internal subblock template.
    pub subblock: SubblockTemplate,
}

/// The validated, read-only architecture model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Architecture {
    grid: Grid,
    classes: Vec<PinClass>,
    pin_class: Vec<ClassId>,
    pin_global: Vec<bool>,
    pin_side: [Vec<bool>; 4],
    io_rat: u16,
    segments: Vec<SegmentKind>,
    switches: Vec<SwitchKind>,
    subblock: SubblockTemplate,
}

impl Architecture {
    /// Validates a description and builds the queryable model from it.
    pub fn from_description(desc: ArchDescription) -> Result<Self, ArchError> {
        if desc.segments.is_empty() {
            return Err(ArchError::NoSegments);
        }
        if desc.switches.is_empty() {
            return Err(ArchError::NoSwitches);
        }
        if desc.io_rat == 0 {
            return Err(ArchError::BadIoRat { io_rat: 0 });
        }
        if desc.subblock.lut_size == 0 || desc.subblock.max_subblocks == 0 {
            return Err(ArchError::BadSubblockTemplate {
                lut_size: desc.subblock.lut_size,
                max_subblocks: desc.subblock.max_subblocks,
            });
        }

        let pins_per_clb: usize = desc.classes.iter().map(PinClass::num_pins).sum();
        let mut pin_class: Vec<Option<ClassId>> = vec![None; pins_per_clb];
        for (iclass, class) in desc.classes.iter().enumerate() {
            if class.pins.is_empty() {
                return Err(ArchError::EmptyClass {
                    class: ClassId::from_raw(iclass as u32),
                });
            }
            for &pin in &class.pins {
                let slot = pin_class
                    .get_mut(pin as usize)
                    .ok_or(ArchError::PinUnclassified { pin })?;
                if slot.is_some() {
                    return Err(ArchError::PinMultiplyClassified { pin });
                }
                *slot = Some(ClassId::from_raw(iclass as u32));
            }
        }
        let pin_class: Vec<ClassId> = pin_class
            .into_iter()
            .enumerate()
            .map(|(pin, class)| class.ok_or(ArchError::PinUnclassified { pin: pin as u16 }))
            .collect::<Result<_, _>>()?;

        let mut pin_global = vec![false; pins_per_clb];
        for &pin in &desc.global_pins {
            if (pin as usize) < pins_per_clb {
                pin_global[pin as usize] = true;
            }
        }

        let mut pin_side = [
            vec![false; pins_per_clb],
            vec![false; pins_per_clb],
            vec![false; pins_per_clb],
            vec![false; pins_per_clb],
        ];
        for side in Side::ALL {
            for &pin in &desc.pins_on_side[side.index()] {
                if pin as usize >= pins_per_clb {
                    return Err(ArchError::PinSideOutOfRange {
                        pin,
                        side,
                        pins_per_clb: pins_per_clb as u16,
                    });
                }
                pin_side[side.index()][pin as usize] = true;
            }
        }

        let mut freq_sum = 0.0;
        for (iseg, seg) in desc.segments.iter().enumerate() {
            let segment = SegmentId::from_raw(iseg as u32);
            if seg.length == 0 {
                return Err(ArchError::SegmentLengthZero { segment });
            }
            for switch in [seg.wire_switch, seg.opin_switch] {
                if switch.index() >= desc.switches.len() {
                    return Err(ArchError::SwitchOutOfRange { segment, switch });
                }
            }
            freq_sum += seg.frequency;
        }
        if (freq_sum - 1.0).abs() > 0.01 {
            return Err(ArchError::BadFrequencySum { sum: freq_sum });
        }

        Ok(Self {
            grid: desc.grid,
            classes: desc.classes,
            pin_class,
            pin_global,
            pin_side,
            io_rat: desc.io_rat,
            segments: desc.segments,
            switches: desc.switches,
            subblock: desc.subblock,
        })
    }

    /// The device grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of pins on a logic cluster.
    pub fn pins_per_clb(&self) -> u16 {
        self.pin_class.len() as u16
    }

    /// Number of pin classes.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// The full pin-class table.
    pub fn classes(&self) -> &[PinClass] {
        &self.classes
    }

    /// One pin class.
    pub fn class(&self, class: ClassId) -> &PinClass {
        &self.classes[class.index()]
    }

    /// The class a cluster pin belongs to.
    pub fn class_of_pin(&self, pin: u16) -> ClassId {
        self.pin_class[pin as usize]
    }

    /// Whether a cluster pin drives or receives.
    pub fn pin_kind(&self, pin: u16) -> ClassKind {
        self.class(self.class_of_pin(pin)).kind
    }

    /// Whether a cluster pin is routed by dedicated global resources.
    pub fn is_global_pin(&self, pin: u16) -> bool {
        self.pin_global[pin as usize]
    }

    /// Class, direction and global flag of a cluster pin in one lookup.
    pub fn pin_info(&self, pin: u16) -> PinInfo {
        let class = self.class_of_pin(pin);
        PinInfo {
            class,
            kind: self.class(class).kind,
            is_global: self.is_global_pin(pin),
        }
    }

    /// Whether a cluster pin is physically present on the given side.
    pub fn pin_on_side(&self, pin: u16, side: Side) -> bool {
        self.pin_side[side.index()][pin as usize]
    }

    /// Pads per IO grid location.
    pub fn io_rat(&self) -> u16 {
        self.io_rat
    }

    /// The segment-template table.
    pub fn segments(&self) -> &[SegmentKind] {
        &self.segments
    }

    /// One segment template.
    pub fn segment(&self, segment: SegmentId) -> &SegmentKind {
        &self.segments[segment.index()]
    }

    /// The switch table.
    pub fn switches(&self) -> &[SwitchKind] {
        &self.switches
    }

    /// One switch type.
    pub fn switch(&self, switch: SwitchId) -> &SwitchKind {
        &self.switches[switch.index()]
    }

    /// The subblock template.
    pub fn subblock(&self) -> &SubblockTemplate {
        &self.subblock
    }
}

/// Builds the reference test architecture: a 4-LUT cluster with four input
/// pins (one per side), one output pin present on every side, and one global
/// clock pin, on an `nx` by `ny` grid with two pads per IO location.
///
/// Switch 0 is the delayless switch, switch 1 the buffered wire switch,
/// switch 2 the wire-to-IPIN switch and switch 3 an unbuffered pass
/// transistor. A single unit-length segment template fills the channel.
pub fn uniform_k4(nx: i32, ny: i32) -> Architecture {
    let classes = vec![
        PinClass {
            kind: ClassKind::Receiver,
            pins: vec![0, 1, 2, 3],
        },
        PinClass {
            kind: ClassKind::Driver,
            pins: vec![4],
        },
        PinClass {
            kind: ClassKind::Receiver,
            pins: vec![5],
        },
    ];
    let pins_on_side = [
        vec![0, 4],       // top
        vec![1, 4],       // bottom
        vec![2, 4, 5],    // left
        vec![3, 4],       // right
    ];
    let switches = vec![
        SwitchKind {
            buffered: true,
            r: 0.0,
            c_in: 0.0,
            c_out: 0.0,
            t_del: 0.0,
        },
        SwitchKind {
            buffered: true,
            r: 200.0,
            c_in: 2.0e-15,
            c_out: 3.0e-15,
            t_del: 1.0e-10,
        },
        SwitchKind {
            buffered: true,
            r: 500.0,
            c_in: 1.0e-15,
            c_out: 1.0e-15,
            t_del: 2.0e-10,
        },
        SwitchKind {
            buffered: false,
            r: 800.0,
            c_in: 1.5e-15,
            c_out: 1.5e-15,
            t_del: 0.0,
        },
    ];
    let segments = vec![SegmentKind {
        length: 1,
        longline: false,
        frac_cb: 1.0,
        frac_sb: 1.0,
        frequency: 1.0,
        wire_switch: SwitchId::from_raw(1),
        opin_switch: SwitchId::from_raw(1),
        r_metal: 50.0,
        c_metal: 8.0e-15,
    }];
    let desc = ArchDescription {
        grid: Grid::new(nx, ny),
        classes,
        global_pins: vec![5],
        pins_on_side,
        io_rat: 2,
        segments,
        switches,
        subblock: SubblockTemplate {
            lut_size: 4,
            max_subblocks: 2,
            t_comb: 5.0e-10,
            t_seq_in: 2.0e-10,
            t_seq_out: 3.0e-10,
        },
    };
    Architecture::from_description(desc).expect("reference architecture is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_k4_shape() {
        let arch = uniform_k4(4, 4);
        assert_eq!(arch.pins_per_clb(), 6);
        assert_eq!(arch.num_classes(), 3);
        assert_eq!(arch.io_rat(), 2);
        assert_eq!(arch.grid().nx(), 4);
    }

    #[test]
    fn pin_class_lookup() {
        let arch = uniform_k4(2, 2);
        for pin in 0..4 {
            assert_eq!(arch.pin_kind(pin), ClassKind::Receiver);
            assert_eq!(arch.class_of_pin(pin), ClassId::from_raw(0));
        }
        assert_eq!(arch.pin_kind(4), ClassKind::Driver);
        assert_eq!(arch.class_of_pin(5), ClassId::from_raw(2));
    }

    #[test]
    fn global_pin_flags() {
        let arch = uniform_k4(2, 2);
        assert!(arch.is_global_pin(5));
        for pin in 0..5 {
            assert!(!arch.is_global_pin(pin));
        }
    }

    #[test]
    fn pin_sides() {
        let arch = uniform_k4(2, 2);
        assert!(arch.pin_on_side(0, Side::Top));
        assert!(!arch.pin_on_side(0, Side::Bottom));
        for side in Side::ALL {
            assert!(arch.pin_on_side(4, side), "output pin on every side");
        }
        assert!(arch.pin_on_side(5, Side::Left));
    }

    #[test]
    fn pin_info_combines_lookups() {
        let arch = uniform_k4(2, 2);
        let info = arch.pin_info(5);
        assert_eq!(info.kind, ClassKind::Receiver);
        assert!(info.is_global);
        assert_eq!(info.class, ClassId::from_raw(2));
    }

    #[test]
    fn rejects_unclassified_pin() {
        let mut desc = base_desc();
        desc.classes[0].pins = vec![0, 1, 2]; // pin 3 now unclassified
        desc.pins_on_side = [vec![], vec![], vec![], vec![]];
        match Architecture::from_description(desc) {
            Err(ArchError::PinUnclassified { .. }) => {}
            other => panic!("expected PinUnclassified, got {other:?}"),
        }
    }

    #[test]
    fn rejects_double_classified_pin() {
        let mut desc = base_desc();
        desc.classes[1].pins = vec![0]; // pin 0 also in class 0
        match Architecture::from_description(desc) {
            Err(ArchError::PinMultiplyClassified { pin: 0 }) => {}
            other => panic!("expected PinMultiplyClassified, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_frequency_sum() {
        let mut desc = base_desc();
        desc.segments[0].frequency = 0.5;
        match Architecture::from_description(desc) {
            Err(ArchError::BadFrequencySum { .. }) => {}
            other => panic!("expected BadFrequencySum, got {other:?}"),
        }
    }

    #[test]
    fn rejects_switch_out_of_range() {
        let mut desc = base_desc();
        desc.segments[0].wire_switch = SwitchId::from_raw(99);
        match Architecture::from_description(desc) {
            Err(ArchError::SwitchOutOfRange { .. }) => {}
            other => panic!("expected SwitchOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_io_rat() {
        let mut desc = base_desc();
        desc.io_rat = 0;
        assert!(matches!(
            Architecture::from_description(desc),
            Err(ArchError::BadIoRat { io_rat: 0 })
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let arch = uniform_k4(3, 3);
        let json = serde_json::to_string(&arch).unwrap();
        let restored: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.pins_per_clb(), arch.pins_per_clb());
        assert_eq!(restored.num_classes(), arch.num_classes());
    }

    fn base_desc() -> ArchDescription {
        let arch = uniform_k4(2, 2);
        ArchDescription {
            grid: Grid::new(2, 2),
            classes: arch.classes().to_vec(),
            global_pins: vec![5],
            pins_on_side: [vec![0, 4], vec![1, 4], vec![2, 4, 5], vec![3, 4]],
            io_rat: 2,
            segments: arch.segments().to_vec(),
            switches: arch.switches().to_vec(),
            subblock: arch.subblock().clone(),
        }
    }
}
