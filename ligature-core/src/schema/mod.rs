//! Kinds & Bounds: the atomic lattice and its leaf constraints (§3 of the design).
//!
//! `Kind` is a closed set of tag bits, so union, intersection, and subset tests are cheap
//! bitwise operations rather than allocations — the same trick this codebase's lineage uses
//! for other small, frequently-intersected tag sets (see e.g. `rustc`'s use of `bitflags` for
//! its own closed flag sets).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Kind: u16 {
        const NULL   = 0b0000_0000_0001;
        const BOOL   = 0b0000_0000_0010;
        const INT    = 0b0000_0000_0100;
        const FLOAT  = 0b0000_0000_1000;
        const BYTES  = 0b0000_0001_0000;
        const STRING = 0b0000_0010_0000;
        const LIST   = 0b0000_0100_0000;
        const STRUCT = 0b0000_1000_0000;

        const NUMBER = Self::INT.bits() | Self::FLOAT.bits();

        const TOP = Self::NULL.bits()
            | Self::BOOL.bits()
            | Self::INT.bits()
            | Self::FLOAT.bits()
            | Self::BYTES.bits()
            | Self::STRING.bits()
            | Self::LIST.bits()
            | Self::STRUCT.bits();

        const BOTTOM = 0;
    }
}

impl Kind {
    /// Intersection in the kind lattice: what both constraints agree is possible.
    pub fn meet(self, other: Kind) -> Kind {
        self & other
    }

    /// Union in the kind lattice: used when merging disjunction alternatives' kinds.
    pub fn join(self, other: Kind) -> Kind {
        self | other
    }

    pub fn is_bottom(self) -> bool {
        self.is_empty()
    }

    pub fn is_top(self) -> bool {
        self == Kind::TOP
    }

    /// A kind with exactly one bit set identifies a scalar-or-composite tag unambiguously.
    pub fn is_single(self) -> bool {
        !self.is_empty() && (self.bits() & (self.bits() - 1)) == 0
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::NULL => "null",
            Kind::BOOL => "bool",
            Kind::INT => "int",
            Kind::FLOAT => "float",
            Kind::BYTES => "bytes",
            Kind::STRING => "string",
            Kind::LIST => "list",
            Kind::STRUCT => "struct",
            Kind::NUMBER => "number",
            k if k.is_top() => "_",
            k if k.is_bottom() => "_|_",
            _ => "disjunction of kinds",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A comparison operator usable in a numeric or string bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundOp {
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
}

impl BoundOp {
    /// True if `value` satisfies `self value_being_bounded` i.e. `value_being_bounded OP value`.
    pub fn holds_for_numbers(self, candidate: f64, bound: f64) -> bool {
        match self {
            BoundOp::Ge => candidate >= bound,
            BoundOp::Gt => candidate > bound,
            BoundOp::Le => candidate <= bound,
            BoundOp::Lt => candidate < bound,
            BoundOp::Ne => candidate != bound,
        }
    }
}

impl std::fmt::Display for BoundOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BoundOp::Ge => ">=",
            BoundOp::Gt => ">",
            BoundOp::Le => "<=",
            BoundOp::Lt => "<",
            BoundOp::Ne => "!=",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meet_narrows() {
        assert_eq!(Kind::NUMBER.meet(Kind::INT), Kind::INT);
        assert_eq!(Kind::INT.meet(Kind::STRING), Kind::BOTTOM);
    }

    #[test]
    fn top_is_union_of_all_tags() {
        assert!(Kind::TOP.contains(Kind::STRUCT));
        assert!(Kind::TOP.contains(Kind::NULL));
    }

    #[test]
    fn single_tag_detection() {
        assert!(Kind::INT.is_single());
        assert!(!Kind::NUMBER.is_single());
        assert!(!Kind::BOTTOM.is_single());
    }
}
