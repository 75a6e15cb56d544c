//! Structured diagnostic codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subsystem a diagnostic originates from.
///
/// Each category maps to a single-character prefix used when displaying the
/// code (e.g. `N102` for a netlist diagnostic).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Netlist-model diagnostics, prefixed with `N`.
    Netlist,
    /// Architecture-model diagnostics, prefixed with `A`.
    Arch,
    /// Routing-resource-graph diagnostics, prefixed with `R`.
    Routing,
    /// Timing-analysis diagnostics, prefixed with `T`.
    Timing,
    /// NoC diagnostics, prefixed with `X`.
    Noc,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Netlist => 'N',
            Category::Arch => 'A',
            Category::Routing => 'R',
            Category::Timing => 'T',
            Category::Noc => 'X',
        }
    }
}

/// A diagnostic code: a category plus a numeric identifier within it.
///
/// Displayed as the prefix followed by a zero-padded 3-digit number,
/// e.g. `R204`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The originating subsystem.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_zero_pads() {
        let code = DiagnosticCode::new(Category::Routing, 4);
        assert_eq!(format!("{code}"), "R004");
    }

    #[test]
    fn prefixes_are_distinct() {
        let categories = [
            Category::Netlist,
            Category::Arch,
            Category::Routing,
            Category::Timing,
            Category::Noc,
        ];
        let mut seen = std::collections::HashSet::new();
        for c in categories {
            assert!(seen.insert(c.prefix()));
        }
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Timing, 17);
        let json = serde_json::to_string(&code).unwrap();
        let restored: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, restored);
    }
}
