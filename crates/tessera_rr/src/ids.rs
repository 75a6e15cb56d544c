//! Opaque ID newtype for routing-resource nodes.

use serde::{Deserialize, Serialize};

/// Index of a node in the routing-resource graph's arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RrNodeId(u32);

impl RrNodeId {
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

impl std::fmt::Display for RrNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        let id = RrNodeId::from_raw(123);
        assert_eq!(id.as_raw(), 123);
        assert_eq!(id.index(), 123);
        assert_eq!(format!("{id}"), "123");
    }

    #[test]
    fn ordering() {
        assert!(RrNodeId::from_raw(1) < RrNodeId::from_raw(2));
    }

    #[test]
    fn serde_roundtrip() {
        let id = RrNodeId::from_raw(77);
        let json = serde_json::to_string(&id).unwrap();
        let restored: RrNodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
