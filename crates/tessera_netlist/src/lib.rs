//! Placed netlist model and checker for the Tessera FPGA back-end.
//!
//! The netlist-ingestion layer (external to this core) builds a [`Netlist`]
//! of placed blocks, nets and cluster subblocks, then runs [`check_netlist`]
//! against the architecture before any graph is built over it. Subblock
//! inputs refer to their sources through the [`PinRef`] sum type, so cluster
//! pins and sibling subblock outputs are distinct at the type level.

#![warn(missing_docs)]

pub mod check;
pub mod data;
pub mod ids;

pub use check::{check_netlist, NetlistError, NetlistStats};
pub use data::{Block, Net, NetPin, Netlist, PinRef, Subblock};
pub use ids::{BlockId, NetId};
