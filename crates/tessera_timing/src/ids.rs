//! Opaque ID newtype for timing nodes.

use serde::{Deserialize, Serialize};

/// Index of a node in the timing graph's arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct TimingNodeId(u32);

impl TimingNodeId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the raw index as a `usize`, for arena lookups.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TimingNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        let id = TimingNodeId::from_raw(9);
        assert_eq!(id.as_raw(), 9);
        assert_eq!(id.index(), 9);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", TimingNodeId::from_raw(3)), "3");
    }

    #[test]
    fn serde_roundtrip() {
        let id = TimingNodeId::from_raw(21);
        let json = serde_json::to_string(&id).unwrap();
        let restored: TimingNodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
