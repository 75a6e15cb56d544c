//! Opaque ID newtypes for NoC entities.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
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

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A hard NoC router tile.
    NocRouterId
);

define_id!(
    /// A directed NoC link between two routers.
    NocLinkId
);

define_id!(
    /// A traffic flow between two routers.
    TrafficFlowId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(NocRouterId::from_raw(4).as_raw(), 4);
        assert_eq!(NocLinkId::from_raw(2).index(), 2);
        assert_eq!(TrafficFlowId::from_raw(0).as_raw(), 0);
    }

    #[test]
    fn ids_are_ordered() {
        assert!(NocLinkId::from_raw(1) < NocLinkId::from_raw(5));
    }

    #[test]
    fn serde_roundtrip() {
        let id = NocRouterId::from_raw(6);
        let json = serde_json::to_string(&id).unwrap();
        let restored: NocRouterId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
